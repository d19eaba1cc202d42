//! Real-time data from the bus information APIs.
//!
//! [`TransitSource`] is the seam between the tools and the network; the
//! production implementation is [`BusApi`], which sends each stop to the API
//! that covers its city.

use std::time::Duration;

use thiserror::Error;

use crate::lookup::Stop;

mod envelope;
mod national;
mod portal;
mod seoul;

pub use national::{DEFAULT_NATIONAL_BASE_URL, NationalBusClient};
pub use seoul::{DEFAULT_BASE_URL, SeoulBusClient};

/// City code of Seoul in the national stop table.
pub const SEOUL_CITY_CODE: &str = "11";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    Malformed(String),
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },
    #[error("no live arrival service covers stop {0}")]
    NotCovered(String),
}

impl UpstreamError {
    /// The service answered, but with nothing usable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            UpstreamError::Parse(_) | UpstreamError::Malformed(_) | UpstreamError::Api { .. }
        )
    }
}

/// One line of a stop's arrival board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrivalRecord {
    pub route_name: String,
    /// Countdown text for the first approaching bus.
    pub message: String,
    /// Countdown text for the bus after that.
    pub second_message: Option<String>,
    /// Direction text supplied by the API itself.
    pub direction: Option<String>,
    /// Next stop after this one, either as a stop id or as a display name.
    pub next_stop: Option<String>,
    pub vehicle_id: Option<String>,
}

/// One stop of a route-wide arrival snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopSnapshot {
    pub sequence: u32,
    pub stop_name: String,
    pub ars_code: Option<String>,
    pub message: String,
    pub vehicle_id: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait TransitSource {
    /// Arrival board of a single stop.
    async fn arrivals_at_stop(&self, stop: &Stop) -> Result<Vec<ArrivalRecord>, UpstreamError>;

    /// Arrival messages for every stop of a route, ordered along the route.
    async fn route_snapshot(&self, route_id: &str) -> Result<Vec<StopSnapshot>, UpstreamError>;
}

/// Both arrival APIs behind one [`TransitSource`].
///
/// Stops from the national table carry a city code and go to the national
/// API, unless the code is Seoul's. Everything else is looked up by ARS code
/// in the Seoul API, which also serves every route snapshot.
#[derive(Clone)]
pub struct BusApi {
    seoul: SeoulBusClient,
    national: NationalBusClient,
}

impl BusApi {
    pub fn new(
        seoul_base_url: &str,
        national_base_url: &str,
        service_key: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            seoul: SeoulBusClient::new(seoul_base_url, service_key, timeout)?,
            national: NationalBusClient::new(national_base_url, service_key, timeout)?,
        })
    }
}

/// Which API answers for a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Seoul,
    National,
    Uncovered,
}

impl Coverage {
    pub fn of(stop: &Stop) -> Self {
        match stop.city_code.as_deref() {
            Some(code) if code != SEOUL_CITY_CODE => {
                if stop.node_id.is_empty() {
                    Coverage::Uncovered
                } else {
                    Coverage::National
                }
            }
            _ if !stop.ars_code.is_empty() => Coverage::Seoul,
            _ => Coverage::Uncovered,
        }
    }
}

impl TransitSource for BusApi {
    async fn arrivals_at_stop(&self, stop: &Stop) -> Result<Vec<ArrivalRecord>, UpstreamError> {
        match Coverage::of(stop) {
            Coverage::Seoul => self.seoul.arrivals_at_stop(stop).await,
            Coverage::National => self.national.arrivals_at_stop(stop).await,
            Coverage::Uncovered => Err(UpstreamError::NotCovered(stop.name.clone())),
        }
    }

    async fn route_snapshot(&self, route_id: &str) -> Result<Vec<StopSnapshot>, UpstreamError> {
        self.seoul.route_snapshot(route_id).await
    }
}
