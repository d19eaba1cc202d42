use std::time::Duration;

use serde::Deserialize;

use super::{
    ArrivalRecord, StopSnapshot, UpstreamError,
    envelope::{lenient_string, parse_items},
    portal::PortalClient,
};
use crate::lookup::Stop;

pub const DEFAULT_BASE_URL: &str = "http://ws.bus.go.kr/api/rest";

const STATION_ARRIVALS: &str = "stationinfo/getStationByUid";
const ROUTE_ARRIVALS: &str = "arrive/getArrInfoByRouteAll";

/// Client for the Seoul bus information API.
///
/// Stops are addressed by their ARS code and routes by the upstream route id.
/// Only Seoul stops are served.
#[derive(Clone)]
pub struct SeoulBusClient {
    portal: PortalClient,
}

impl SeoulBusClient {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            portal: PortalClient::new(base_url, service_key, timeout)?,
        })
    }

    pub async fn arrivals_at_stop(&self, stop: &Stop) -> Result<Vec<ArrivalRecord>, UpstreamError> {
        if stop.ars_code.is_empty() {
            return Err(UpstreamError::NotCovered(stop.name.clone()));
        }

        let body = self
            .portal
            .get(
                STATION_ARRIVALS,
                &[("arsId", stop.ars_code.as_str()), ("resultType", "json")],
            )
            .await?;
        let items: Vec<StationArrivalItem> = parse_items(&body)?;
        Ok(items.into_iter().map(ArrivalRecord::from).collect())
    }

    pub async fn route_snapshot(&self, route_id: &str) -> Result<Vec<StopSnapshot>, UpstreamError> {
        let body = self
            .portal
            .get(ROUTE_ARRIVALS, &[("busRouteId", route_id), ("resultType", "json")])
            .await?;
        let items: Vec<RouteArrivalItem> = parse_items(&body)?;
        Ok(snapshot_from_items(items))
    }
}

#[derive(Debug, Deserialize)]
struct StationArrivalItem {
    #[serde(rename = "rtNm", default, deserialize_with = "lenient_string")]
    route_name: Option<String>,
    #[serde(rename = "arrmsg1", default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(rename = "arrmsg2", default, deserialize_with = "lenient_string")]
    second_message: Option<String>,
    #[serde(rename = "adirection", default, deserialize_with = "lenient_string")]
    direction: Option<String>,
    #[serde(rename = "nxtStn", default, deserialize_with = "lenient_string")]
    next_stop: Option<String>,
    #[serde(rename = "plainNo1", default, deserialize_with = "lenient_string")]
    plate: Option<String>,
    #[serde(rename = "vehId1", default, deserialize_with = "lenient_string")]
    vehicle_id: Option<String>,
}

impl From<StationArrivalItem> for ArrivalRecord {
    fn from(item: StationArrivalItem) -> Self {
        ArrivalRecord {
            route_name: item.route_name.unwrap_or_else(|| "?".to_string()),
            message: item.message.unwrap_or_default(),
            second_message: item.second_message,
            direction: item.direction,
            next_stop: item.next_stop,
            vehicle_id: vehicle_key(item.plate, item.vehicle_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteArrivalItem {
    #[serde(rename = "staOrd", default, deserialize_with = "lenient_string")]
    sequence: Option<String>,
    #[serde(rename = "stNm", default, deserialize_with = "lenient_string")]
    stop_name: Option<String>,
    #[serde(rename = "arsId", default, deserialize_with = "lenient_string")]
    ars_code: Option<String>,
    #[serde(rename = "arrmsg1", default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(rename = "plainNo1", default, deserialize_with = "lenient_string")]
    plate: Option<String>,
    #[serde(rename = "vehId1", default, deserialize_with = "lenient_string")]
    vehicle_id: Option<String>,
}

fn snapshot_from_items(items: Vec<RouteArrivalItem>) -> Vec<StopSnapshot> {
    let mut snapshot: Vec<StopSnapshot> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| StopSnapshot {
            // rows without a usable order keep their response position
            sequence: item
                .sequence
                .and_then(|s| s.parse().ok())
                .unwrap_or(i as u32 + 1),
            stop_name: item.stop_name.unwrap_or_default(),
            ars_code: item.ars_code,
            message: item.message.unwrap_or_default(),
            vehicle_id: vehicle_key(item.plate, item.vehicle_id),
        })
        .collect();
    snapshot.sort_by_key(|stop| stop.sequence);
    snapshot
}

/// The plate number when known, else the internal vehicle id; `"0"` means none.
fn vehicle_key(plate: Option<String>, vehicle_id: Option<String>) -> Option<String> {
    plate
        .into_iter()
        .chain(vehicle_id)
        .find(|id| id != "0")
}
