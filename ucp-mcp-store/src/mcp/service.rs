//! MCP server handler for the shopping service.
//!
//! [`ShoppingService`] exposes the checkout controller to agents through
//! the Model Context Protocol: the eight tools, the four read-only
//! resources under the `ucp://` scheme, and the shopping-assistance
//! prompt. The handler is transport-agnostic; the host process attaches
//! it to stdio or any other transport supported by `rmcp`.
//!
//! Domain failures become structured tool errors carrying a stable
//! `kind` plus a human-readable message; they are never protocol errors
//! and never crash the server.

use std::fmt;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{
        AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParam, Prompt, PromptMessage, PromptMessageContent, PromptMessageRole,
        ProtocolVersion, RawResource, RawResourceTemplate, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use serde_json::json;

use crate::error::StoreError;
use crate::mcp::controller::{
    AddToCheckoutParams, CheckoutController, CompleteCheckoutParams, GetCheckoutParams,
    RemoveFromCheckoutParams, SearchCatalogParams, StartPaymentParams, UpdateCheckoutParams,
    UpdateCustomerDetailsParams,
};

/// URI of the full-catalog resource.
pub const CATALOG_URI: &str = "ucp://catalog/products";
/// URI of the capability-profile resource.
pub const PROFILE_URI: &str = "ucp://discovery/profile";
/// URI prefix of per-checkout resources.
pub const CHECKOUT_URI_PREFIX: &str = "ucp://checkout/";
/// URI prefix of per-order resources.
pub const ORDERS_URI_PREFIX: &str = "ucp://orders/";

/// Name of the shopping-assistance prompt.
const SHOPPING_PROMPT_NAME: &str = "shopping_assistance";

/// Instructions advertised in the MCP handshake.
const INSTRUCTIONS: &str = "\
This MCP server provides access to UCP (Universal Commerce Protocol) shopping \
capabilities. You can:

1. Browse Products: use search_shopping_catalog to explore the catalog
2. Create Checkout: add_to_checkout automatically creates a checkout if none exists
3. Add Items: use add_to_checkout to add products to the cart
4. Update Address: use update_customer_details to configure delivery
5. Complete Purchase: start_payment, then complete_checkout to finalize the order
6. Track Orders: read the ucp://orders/{order_id} resource for order status

Start by searching for products, then guide the user through checkout.";

/// Text of the shopping-assistance prompt.
const SHOPPING_PROMPT: &str = "\
You are a helpful shopping assistant. Use the UCP Shopping Service to help the \
user find products in the catalog and guide them through the checkout process. \
Start by asking what they are looking for or show them the available products.";

/// MCP handler exposing the shopping tools, resources, and prompt.
#[derive(Clone)]
pub struct ShoppingService {
    controller: Arc<CheckoutController>,
    tool_router: ToolRouter<Self>,
}

impl fmt::Debug for ShoppingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShoppingService").finish_non_exhaustive()
    }
}

impl Default for ShoppingService {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl ShoppingService {
    /// Creates a service over the default demo catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_controller(Arc::new(CheckoutController::with_default_catalog()))
    }

    /// Creates a service over an existing controller.
    #[must_use]
    pub fn with_controller(controller: Arc<CheckoutController>) -> Self {
        Self { controller, tool_router: Self::tool_router() }
    }

    #[tool(
        name = "search_shopping_catalog",
        description = "Searches for products in the catalog based on a query string. \
                       Returns all products if the query is empty."
    )]
    async fn search_shopping_catalog(
        &self,
        Parameters(params): Parameters<SearchCatalogParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.controller.search_shopping_catalog(&params.query))
    }

    #[tool(
        name = "add_to_checkout",
        description = "Adds a product to the checkout. Creates a new checkout if \
                       checkout_id is not provided."
    )]
    async fn add_to_checkout(
        &self,
        Parameters(params): Parameters<AddToCheckoutParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.add_to_checkout(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "remove_from_checkout",
        description = "Removes a product from the checkout. Removing a product that \
                       is not in the checkout succeeds without changes."
    )]
    async fn remove_from_checkout(
        &self,
        Parameters(params): Parameters<RemoveFromCheckoutParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.remove_from_checkout(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "update_checkout",
        description = "Updates the quantity of a product in the checkout. A quantity \
                       of zero or less removes the product."
    )]
    async fn update_checkout(
        &self,
        Parameters(params): Parameters<UpdateCheckoutParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.update_checkout(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "get_checkout",
        description = "Retrieves the current state of a checkout."
    )]
    async fn get_checkout(
        &self,
        Parameters(params): Parameters<GetCheckoutParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.get_checkout(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "start_payment",
        description = "Initiates the payment process for a checkout. Requires customer \
                       details and at least one line item; safe to retry."
    )]
    async fn start_payment(
        &self,
        Parameters(params): Parameters<StartPaymentParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.start_payment(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "update_customer_details",
        description = "Updates the customer (shipping) details for a checkout. The \
                       address must include street, city, postal_code, and country."
    )]
    async fn update_customer_details(
        &self,
        Parameters(params): Parameters<UpdateCustomerDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.update_customer_details(params).await {
            Ok(view) => json_result(&view),
            Err(error) => Ok(store_error(&error)),
        }
    }

    #[tool(
        name = "complete_checkout",
        description = "Finalizes the checkout and places the order. Safe to retry: a \
                       completed checkout returns the same order identifier again."
    )]
    async fn complete_checkout(
        &self,
        Parameters(params): Parameters<CompleteCheckoutParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.controller.complete_checkout(params).await {
            Ok(confirmation) => json_result(&confirmation),
            Err(error) => Ok(store_error(&error)),
        }
    }
}

#[tool_handler]
impl ServerHandler for ShoppingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_owned()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new(CATALOG_URI, "catalog-products".to_owned()).no_annotation(),
                RawResource::new(PROFILE_URI, "discovery-profile".to_owned()).no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            resource_templates: vec![
                RawResourceTemplate {
                    uri_template: "ucp://checkout/{checkout_id}".to_owned(),
                    name: "checkout".to_owned(),
                    description: Some("Current state of a checkout session".to_owned()),
                    mime_type: Some("application/json".to_owned()),
                }
                .no_annotation(),
                RawResourceTemplate {
                    uri_template: "ucp://orders/{order_id}".to_owned(),
                    name: "order".to_owned(),
                    description: Some("Confirmation details of a placed order".to_owned()),
                    mime_type: Some("application/json".to_owned()),
                }
                .no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            CATALOG_URI => resource_json(&self.controller.catalog_products(), &uri),
            PROFILE_URI => resource_json(self.controller.discovery_profile(), &uri),
            other => {
                if let Some(checkout_id) = other.strip_prefix(CHECKOUT_URI_PREFIX) {
                    let view = self
                        .controller
                        .checkout_resource(checkout_id)
                        .await
                        .map_err(|error| resource_error(&error, &uri))?;
                    resource_json(&view, &uri)
                } else if let Some(order_id) = other.strip_prefix(ORDERS_URI_PREFIX) {
                    let document = self
                        .controller
                        .order_resource(order_id)
                        .await
                        .map_err(|error| resource_error(&error, &uri))?;
                    resource_json(&document, &uri)
                } else {
                    Err(McpError::resource_not_found(
                        "unknown resource URI",
                        Some(json!({ "uri": uri })),
                    ))
                }
            }
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: vec![Prompt::new(
                SHOPPING_PROMPT_NAME,
                Some("A prompt to help users find and buy products."),
                None,
            )],
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        GetPromptRequestParam { name, arguments: _ }: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        match name.as_str() {
            SHOPPING_PROMPT_NAME => Ok(GetPromptResult {
                description: Some("A prompt to help users find and buy products.".to_owned()),
                messages: vec![PromptMessage {
                    role: PromptMessageRole::User,
                    content: PromptMessageContent::text(SHOPPING_PROMPT),
                }],
            }),
            _ => Err(McpError::invalid_params(
                "prompt not found",
                Some(json!({ "name": name })),
            )),
        }
    }
}

/// Renders a successful tool result as pretty-printed JSON text.
fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("response serialization failed: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Renders a domain failure as a structured tool error.
fn store_error(error: &StoreError) -> CallToolResult {
    let payload = json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        }
    });
    CallToolResult::error(vec![Content::text(payload.to_string())])
}

/// Renders a resource JSON document.
fn resource_json<T: Serialize>(value: &T, uri: &str) -> Result<ReadResourceResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("resource serialization failed: {e}"), None)
    })?;
    Ok(ReadResourceResult { contents: vec![ResourceContents::text(text, uri)] })
}

/// Maps a domain lookup failure onto the MCP resource-not-found error.
fn resource_error(error: &StoreError, uri: &str) -> McpError {
    McpError::resource_not_found(
        error.to_string(),
        Some(json!({ "uri": uri, "kind": error.kind() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_payload_is_structured() {
        let result = store_error(&StoreError::ProductNotFound("BISC-999".to_owned()));
        assert_eq!(result.is_error, Some(true));

        let text = result.content[0].as_text().unwrap();
        let payload: serde_json::Value = serde_json::from_str(&text.text).unwrap();
        assert_eq!(payload["error"]["kind"], "product_not_found");
        assert!(
            payload["error"]["message"]
                .as_str()
                .unwrap()
                .contains("BISC-999")
        );
    }

    #[test]
    fn test_json_result_round_trip() {
        let result = json_result(&serde_json::json!({ "ok": true })).unwrap();
        assert_ne!(result.is_error, Some(true));

        let text = result.content[0].as_text().unwrap();
        let payload: serde_json::Value = serde_json::from_str(&text.text).unwrap();
        assert_eq!(payload["ok"], true);
    }

    #[tokio::test]
    async fn test_tool_router_registers_all_tools() {
        let service = ShoppingService::new();
        let tools = service.tool_router.list_all();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_ref()).collect();

        for expected in [
            "search_shopping_catalog",
            "add_to_checkout",
            "remove_from_checkout",
            "update_checkout",
            "get_checkout",
            "start_payment",
            "update_customer_details",
            "complete_checkout",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
    }
}
