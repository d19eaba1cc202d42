use std::{fmt::Write, time::Duration};

use serde::Deserialize;

use super::{
    ArrivalRecord, UpstreamError,
    envelope::{lenient_string, parse_portal_items},
    portal::PortalClient,
};
use crate::lookup::Stop;

pub const DEFAULT_NATIONAL_BASE_URL: &str = "https://apis.data.go.kr/1613000/ArvlInfoInqireService";

const STOP_ARRIVALS: &str = "getSttnAcctoArvlPrearngeInfoList";

/// Arrivals the national API lists per stop.
const ROWS_PER_STOP: &str = "20";

/// Client for the nationwide arrival API, which covers every city except Seoul.
///
/// Stops are addressed by city code plus node id, both taken from the
/// national stop table.
#[derive(Clone)]
pub struct NationalBusClient {
    portal: PortalClient,
}

impl NationalBusClient {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            portal: PortalClient::new(base_url, service_key, timeout)?,
        })
    }

    pub async fn arrivals_at_stop(&self, stop: &Stop) -> Result<Vec<ArrivalRecord>, UpstreamError> {
        let Some(city_code) = stop.city_code.as_deref() else {
            return Err(UpstreamError::NotCovered(stop.name.clone()));
        };
        if stop.node_id.is_empty() {
            return Err(UpstreamError::NotCovered(stop.name.clone()));
        }

        let body = self
            .portal
            .get(
                STOP_ARRIVALS,
                &[
                    ("cityCode", city_code),
                    ("nodeId", stop.node_id.as_str()),
                    ("numOfRows", ROWS_PER_STOP),
                    ("_type", "json"),
                ],
            )
            .await?;
        let items: Vec<StopArrivalItem> = parse_portal_items(&body)?;
        Ok(items.into_iter().map(ArrivalRecord::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct StopArrivalItem {
    #[serde(rename = "routeno", default, deserialize_with = "lenient_string")]
    route_name: Option<String>,
    /// Seconds until arrival.
    #[serde(rename = "arrtime", default, deserialize_with = "lenient_string")]
    seconds: Option<String>,
    #[serde(rename = "arrprevstationcnt", default, deserialize_with = "lenient_string")]
    stops_away: Option<String>,
    #[serde(rename = "arrmsg1", default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(rename = "vehicleno", default, deserialize_with = "lenient_string")]
    vehicle_no: Option<String>,
}

impl From<StopArrivalItem> for ArrivalRecord {
    fn from(item: StopArrivalItem) -> Self {
        let seconds = item.seconds.and_then(|s| s.parse::<u32>().ok());
        let stops_away = item.stops_away.and_then(|s| s.parse::<u32>().ok());
        ArrivalRecord {
            route_name: item.route_name.unwrap_or_else(|| "?".to_string()),
            message: item
                .message
                .unwrap_or_else(|| countdown_message(seconds, stops_away)),
            vehicle_id: item.vehicle_no,
            ..Default::default()
        }
    }
}

/// The national API reports numbers only; render them the way the Seoul API
/// words its countdowns so both read and classify alike.
fn countdown_message(seconds: Option<u32>, stops_away: Option<u32>) -> String {
    let mut message = match seconds {
        Some(0) | None if stops_away == Some(0) => return "곧 도착".to_string(),
        Some(s) if s >= 60 && s % 60 == 0 => format!("{}분후", s / 60),
        Some(s) if s >= 60 => format!("{}분{}초후", s / 60, s % 60),
        Some(s) => format!("{s}초후"),
        None => String::new(),
    };
    if let Some(count) = stops_away {
        let _ = write!(message, "[{count}번째 전]");
    }
    message
}
