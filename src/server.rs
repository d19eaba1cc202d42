use anyhow::Result;
use rmcp::{
    ErrorData as McpError,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_router,
};
use std::sync::Arc;

use crate::{service::BusService, upstream::BusApi};

mod args;
pub mod http;
mod server_handle;

use args::{ArrivalsRequest, RoutePositionRequest, SearchStopRequest};

/// MCP front end of the bus tools.
#[derive(Clone)]
pub struct BusServer {
    service: Arc<BusService<BusApi>>,
    tool_router: ToolRouter<BusServer>,
}

impl BusServer {
    pub fn new(service: Arc<BusService<BusApi>>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    pub fn list_tools(&self) {
        for tool in self.tool_router.list_all() {
            println!("{}", tool.name);
            if let Some(description) = tool.description.as_deref() {
                println!("    {}", description.trim());
            }
        }
    }
}

fn success_text<S: Into<String>>(text: S) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

#[tool_router]
impl BusServer {
    #[tool(
        description = "Search bus stops by (partial) name. Returns every matching stop with its ARS code and stop ID."
    )]
    async fn search_stop(
        &self,
        Parameters(SearchStopRequest { keyword }): Parameters<SearchStopRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(%keyword, "search_stop");
        Ok(success_text(self.service.search_stop(&keyword)))
    }

    #[tool(description = "
        Get real-time bus arrivals for a stop, given its ARS code, stop ID or name.
        Each line lists the route, the countdown message and, when known, the direction of travel.")]
    async fn get_arrivals(
        &self,
        Parameters(ArrivalsRequest { stop_identifier }): Parameters<ArrivalsRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(%stop_identifier, "get_arrivals");
        Ok(success_text(self.service.get_arrivals(&stop_identifier).await))
    }

    #[tool(description = "
        Estimate where the buses of a route currently are.
        Lists each bus in service with the stop it is near and the stop it is heading to.")]
    async fn get_route_position(
        &self,
        Parameters(RoutePositionRequest { route_name }): Parameters<RoutePositionRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(%route_name, "get_route_position");
        Ok(success_text(
            self.service.get_route_position(&route_name).await,
        ))
    }
}
