use std::sync::Arc;

use axum::http::request::Parts;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use crate::{
    auth::CallerIdentity,
    context::AppContext,
    pipeline::GenerateProfilePictureRequest,
    tools::ListGeneratedImagesRequest,
};

#[derive(Clone)]
pub struct ProfilePictureServer {
    tool_router: ToolRouter<Self>,
    ctx: Arc<AppContext>,
}

impl ProfilePictureServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            ctx,
        }
    }

    /// Identity from the bearer token on the HTTP request that carried the
    /// MCP message. Transports without HTTP parts have no identity.
    fn caller(&self, context: &RequestContext<RoleServer>) -> Option<CallerIdentity> {
        context
            .extensions
            .get::<Parts>()
            .and_then(|parts| self.ctx.verifier.identity_from_headers(&parts.headers))
    }
}

#[tool_router]
impl ProfilePictureServer {
    #[tool(
        description = "Edit a photo into a realistic smartphone-style profile picture. Takes an HTTP(S) imageUrl and an optional prompt, returns a signed imageUrl valid for 7 days and a resultId. Generation can take a while."
    )]
    async fn generate_profile_picture(
        &self,
        Parameters(request): Parameters<GenerateProfilePictureRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let caller = self.caller(&context);
        crate::tools::generate_profile_picture(&self.ctx, caller.as_ref(), Parameters(request))
            .await
    }

    #[tool(description = "List the caller's generated profile pictures, newest first")]
    async fn list_generated_images(
        &self,
        Parameters(request): Parameters<ListGeneratedImagesRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let caller = self.caller(&context);
        crate::tools::list_generated_images(&self.ctx, caller.as_ref(), Parameters(request)).await
    }
}

#[tool_handler]
impl ServerHandler for ProfilePictureServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
