//! UCP discovery profile.
//!
//! The profile is the static capability description served at
//! `ucp://discovery/profile`. Agents read it to learn which commerce
//! capabilities this service supports before invoking any tools.

use serde::{Deserialize, Serialize};

/// Top-level discovery profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryProfile {
    /// UCP capability descriptor.
    pub ucp: UcpDescriptor,
}

/// Describes the service and its supported capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UcpDescriptor {
    /// Service display name.
    pub name: String,
    /// UCP profile version.
    pub version: String,
    /// Supported commerce capabilities.
    pub capabilities: Vec<Capability>,
}

/// A single named capability with its version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name.
    pub name: String,
    /// Capability version.
    pub version: String,
}

impl DiscoveryProfile {
    /// Returns the profile for the capabilities this service exposes.
    #[must_use]
    pub fn current() -> Self {
        fn capability(name: &str) -> Capability {
            Capability { name: name.to_owned(), version: "1.0".to_owned() }
        }

        Self {
            ucp: UcpDescriptor {
                name: "UCP Shopping Service".to_owned(),
                version: "1.0".to_owned(),
                capabilities: vec![
                    capability("shopping.catalog"),
                    capability("shopping.checkout"),
                    capability("shopping.orders"),
                ],
            },
        }
    }
}
