//! Argument types for MCP tools

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchStopRequest {
    /// Part of the stop name to search for (e.g. "강남역")
    pub keyword: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ArrivalsRequest {
    /// ARS code, stop ID, or (partial) stop name. Can be found via `search_stop`.
    #[serde(alias = "keyword", alias = "stop_id")]
    pub stop_identifier: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RoutePositionRequest {
    /// Route number as printed on the bus (e.g. "146")
    #[serde(alias = "route")]
    pub route_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::serde_json;

    #[test]
    fn test_arrivals_request_accepts_aliases() {
        let request: ArrivalsRequest =
            serde_json::from_value(serde_json::json!({ "keyword": "강남역" })).unwrap();
        assert_eq!(request.stop_identifier, "강남역");

        let request: RoutePositionRequest =
            serde_json::from_value(serde_json::json!({ "route_name": "146" })).unwrap();
        assert_eq!(request.route_name, "146");
    }
}
