//! The three bus tools, rendered as plain text.
//!
//! Every failure is reported inline in the returned text; nothing here
//! returns an error to the caller.

use std::{fmt::Write, sync::Arc};

use futures::future::join_all;

use crate::{
    config::Config,
    lookup::{LookupIndex, RoutePath, Stop},
    osm_links::OsmCoords,
    resolver::{
        ArrivalSignal, DirectionResolver, VehiclePosition, classify, estimate_positions,
        minutes_left,
    },
    upstream::{ArrivalRecord, BusApi, StopSnapshot, TransitSource, UpstreamError},
};

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Stops queried per `get_arrivals` call when a name matches several.
    pub max_stops_per_query: usize,
    /// Matches listed by `search_stop` before the rest is summarized.
    pub search_limit: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_stops_per_query: 3,
            search_limit: 20,
        }
    }
}

pub struct BusService<S> {
    index: Arc<LookupIndex>,
    source: S,
    directions: DirectionResolver,
    settings: ServiceSettings,
}

impl BusService<BusApi> {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.service_key.trim().is_empty() {
            tracing::warn!("no service key configured, upstream requests will be rejected");
        }
        let index = LookupIndex::load(config.stops_csv.as_deref(), config.routes_csv.as_deref());
        let api = BusApi::new(
            &config.base_url,
            &config.national_base_url,
            &config.service_key,
            config.timeout(),
        )?;
        Ok(Self::new(Arc::new(index), api, config.settings()))
    }
}

impl<S: TransitSource> BusService<S> {
    pub fn new(index: Arc<LookupIndex>, source: S, settings: ServiceSettings) -> Self {
        Self {
            index,
            source,
            directions: DirectionResolver::default(),
            settings,
        }
    }

    pub fn search_stop(&self, keyword: &str) -> String {
        let keyword = keyword.trim();
        if self.index.stop_count() == 0 {
            return format!("Stop data is not loaded, cannot search for '{keyword}'.");
        }

        let found = self.index.search_stops(keyword);
        if found.is_empty() {
            return format!("No stops found matching '{keyword}'.");
        }

        let mut out = format!("Stops matching '{keyword}' ({}):\n", found.len());
        for stop in found.iter().take(self.settings.search_limit) {
            let _ = writeln!(out, "- {}", describe_stop(stop));
            if let Ok(coords) = OsmCoords::try_from(*stop) {
                let _ = writeln!(out, "  map: {}", coords.url());
            }
        }
        if found.len() > self.settings.search_limit {
            let _ = writeln!(
                out,
                "... and {} more, refine the keyword to narrow the list",
                found.len() - self.settings.search_limit
            );
        }
        out
    }

    pub async fn get_arrivals(&self, stop_identifier: &str) -> String {
        let identifier = stop_identifier.trim();
        if self.index.stop_count() == 0 {
            return format!("Stop data is not loaded, cannot look up '{identifier}'.");
        }

        let (stops, total) = self.resolve_stops(identifier);
        if stops.is_empty() {
            return format!("No stop found for '{identifier}'.");
        }
        tracing::debug!(identifier, stops = stops.len(), total, "fetching arrivals");

        let boards = join_all(stops.iter().map(|stop| self.source.arrivals_at_stop(stop))).await;

        let now = chrono::Local::now().format("%H:%M");
        let mut out = format!("Arrivals for '{identifier}' (as of {now}):\n");
        for (stop, board) in stops.iter().zip(boards) {
            let _ = writeln!(out, "\n{}", describe_stop(stop));
            self.render_board(&mut out, stop, board);
        }
        if total > stops.len() {
            let _ = writeln!(
                out,
                "\nShowing {} of {total} matching stops, use an ARS code for a specific one.",
                stops.len()
            );
        }
        out
    }

    pub async fn get_route_position(&self, route_name: &str) -> String {
        let route_name = route_name.trim();
        if self.index.route_count() == 0 {
            return format!("Route data is not loaded, cannot locate buses of route '{route_name}'.");
        }

        let Some(path) = self.index.route_path(route_name) else {
            return format!("Route '{route_name}' not found.");
        };
        let Some(route_id) = self.index.route_id(route_name) else {
            return format!("Route '{route_name}' has no upstream route id, cannot locate its buses.");
        };

        let mut snapshot = match self.source.route_snapshot(route_id).await {
            Ok(snapshot) => snapshot,
            Err(error) => return format!("Route {route_name}: {}", failure_text(&error)),
        };
        if snapshot.is_empty() {
            return format!("Route {route_name}: no data");
        }
        self.fill_missing_names(&mut snapshot, path);

        let positions = estimate_positions(&snapshot);
        if positions.is_empty() {
            return format!("No vehicles currently in service on route {route_name}.");
        }

        let mut out = format!(
            "Route {route_name}: {} vehicle(s) in service\n",
            positions.len()
        );
        for (n, position) in positions.iter().enumerate() {
            let _ = writeln!(out, "- vehicle {}: {}", n + 1, describe_position(position));
        }
        out
    }

    /// An ARS code or stop id names one stop; anything else is matched against
    /// stop names, exact matches first. Returns the stops to query and the
    /// total number of matches.
    fn resolve_stops(&self, identifier: &str) -> (Vec<&Stop>, usize) {
        if let Some(stop) = self.index.stop_by_code(identifier) {
            return (vec![stop], 1);
        }

        let mut found = self.index.stops_named(identifier);
        if found.is_empty() {
            found = self.index.search_stops(identifier);
        }
        let total = found.len();
        found.truncate(self.settings.max_stops_per_query);
        (found, total)
    }

    /// Snapshot rows without a stop name borrow it from the reference data,
    /// by ARS code when the row has one, else by position on the route.
    fn fill_missing_names(&self, snapshot: &mut [StopSnapshot], path: &RoutePath) {
        for (position, stop) in snapshot.iter_mut().enumerate() {
            if !stop.stop_name.is_empty() {
                continue;
            }
            let name = stop
                .ars_code
                .as_deref()
                .and_then(|code| self.index.stop_by_code(code))
                .map(|known| known.name.as_str())
                .or_else(|| path.get(position).map(|entry| entry.stop_name.as_str()));
            if let Some(name) = name {
                stop.stop_name = name.to_string();
            }
        }
    }

    fn render_board(
        &self,
        out: &mut String,
        stop: &Stop,
        board: Result<Vec<ArrivalRecord>, UpstreamError>,
    ) {
        let mut arrivals = match board {
            Ok(arrivals) => arrivals,
            Err(error) => {
                tracing::warn!(stop = %stop.name, %error, "arrival lookup failed");
                let _ = writeln!(out, "  - {}", failure_text(&error));
                return;
            }
        };

        if arrivals.is_empty() {
            let _ = writeln!(out, "  - no buses expected at the moment");
            return;
        }
        arrivals.sort_by_key(|arrival| arrival_rank(&arrival.message));

        for arrival in &arrivals {
            let route = &arrival.route_name;
            if arrival.message.trim().is_empty() {
                let _ = writeln!(out, "  - {route}: no data");
                continue;
            }
            if classify(&arrival.message) == ArrivalSignal::ServiceEnded {
                let _ = writeln!(out, "  - {route}: service ended");
                continue;
            }

            let mut line = format!("  - {route}: {}", arrival.message.trim());
            if let Some(second) = arrival.second_message.as_deref().map(str::trim) {
                if !second.is_empty() && classify(second) != ArrivalSignal::ServiceEnded {
                    let _ = write!(line, ", then {second}");
                }
            }
            let direction = self.directions.annotate(&self.index, &stop.short_code, arrival);
            if !direction.is_empty() {
                let _ = write!(line, " ({direction})");
            }
            if let Some(vehicle) = &arrival.vehicle_id {
                let _ = write!(line, " [{vehicle}]");
            }
            let _ = writeln!(out, "{line}");
        }
    }
}

fn describe_stop(stop: &Stop) -> String {
    let mut text = stop.name.clone();
    match (stop.ars_code.is_empty(), stop.node_id.is_empty()) {
        (false, false) => {
            let _ = write!(text, " (ARS {}, ID {})", stop.ars_code, stop.node_id);
        }
        (false, true) => {
            let _ = write!(text, " (ARS {})", stop.ars_code);
        }
        (true, false) => {
            let _ = write!(text, " (ID {})", stop.node_id);
        }
        (true, true) => {}
    }
    text
}

fn describe_position(position: &VehiclePosition) -> String {
    let mut text = match (&position.heading_name, position.heading_to) {
        (Some(next), Some(next_at)) => format!(
            "currently near {} (#{}), heading to {next} (#{})",
            position.at_name,
            position.at + 1,
            next_at + 1
        ),
        _ => format!(
            "currently at the terminus {} (#{})",
            position.at_name,
            position.at + 1
        ),
    };
    if let Some(id) = &position.vehicle_id {
        let _ = write!(text, " [{id}]");
    }
    text
}

fn failure_text(error: &UpstreamError) -> String {
    match error {
        UpstreamError::NotCovered(_) => "no live arrival service covers this stop".to_string(),
        error if error.is_malformed() => "no data".to_string(),
        error => format!("lookup failed: {error}"),
    }
}

/// Soonest first, finished services last.
fn arrival_rank(message: &str) -> u32 {
    match classify(message) {
        ArrivalSignal::ArrivingNow => 0,
        ArrivalSignal::ServiceEnded => u32::MAX,
        _ => minutes_left(message).map_or(u32::MAX - 1, |minutes| minutes.saturating_add(1)),
    }
}
