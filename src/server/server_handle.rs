use rmcp::{ServerHandler, model::*, tool_handler};

use crate::server::BusServer;

#[tool_handler]
impl ServerHandler for BusServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Real-time bus information: stop search, arrival predictions and vehicle positions.\n\n\
                 **RECOMMENDED WORKFLOW**:\n\
                 1. Use search_stop to find the stop the user means; several stops often share a name \
                 (one per side of the road), each with its own ARS code.\n\
                 2. Call get_arrivals with the ARS code for one stop, or with the name to see all of them.\n\
                 3. Call get_route_position with a route number to see where its buses are right now.\n\n\
                 All tools answer with plain text. Lookup problems are reported inside that text \
                 (\"no data\", \"lookup failed\"), so relay them instead of retrying."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
