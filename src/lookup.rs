//! Read-only lookup tables over the reference stop and route data.
//!
//! The index is built once at startup and shared between requests without
//! locking. A missing or unreadable table yields an empty index; every lookup
//! then answers "not found".

use std::{collections::HashMap, path::Path};

mod load;

use load::{load_route_entries, load_stops};

/// A bus stop from the reference stop table.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    /// Public-facing code printed on the stop sign, as found in the source.
    pub ars_code: String,
    /// Internal id used by the upstream APIs.
    pub node_id: String,
    /// City code from the national stop table, needed by the national API.
    pub city_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `ars_code` run through [`normalize_short_code`].
    pub short_code: String,
}

/// One stop on one route, as listed in the route table.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStopEntry {
    pub route_name: String,
    pub route_id: Option<String>,
    pub sequence: u32,
    /// Normalized short code of the stop, empty when the row had none.
    pub short_code: String,
    pub stop_name: String,
}

/// The ordered stops of a single route.
#[derive(Debug, Clone, Default)]
pub struct RoutePath {
    entries: Vec<RouteStopEntry>,
    positions: HashMap<String, usize>,
}

impl RoutePath {
    pub fn new(mut entries: Vec<RouteStopEntry>) -> Self {
        entries.sort_by_key(|entry| entry.sequence);

        // loop routes visit their first stop twice, keep the earliest position
        let mut positions = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            if !entry.short_code.is_empty() {
                positions.entry(entry.short_code.clone()).or_insert(position);
            }
        }

        Self { entries, positions }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, position: usize) -> Option<&RouteStopEntry> {
        self.entries.get(position)
    }

    /// Position of a stop within this path, by (raw or normalized) short code.
    pub fn position_of(&self, short_code: &str) -> Option<usize> {
        self.positions.get(&normalize_short_code(short_code)).copied()
    }

    pub fn terminus(&self) -> Option<&RouteStopEntry> {
        self.entries.last()
    }

    /// Upstream route id, taken from the first row that carried one.
    pub fn route_id(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| entry.route_id.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct LookupIndex {
    stops: Vec<Stop>,
    stops_by_name: HashMap<String, Vec<usize>>,
    stops_by_short_code: HashMap<String, usize>,
    stops_by_node_id: HashMap<String, usize>,
    routes: HashMap<String, RoutePath>,
}

impl LookupIndex {
    pub fn new(stops: Vec<Stop>, entries: Vec<RouteStopEntry>) -> Self {
        let mut stops_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut stops_by_short_code = HashMap::new();
        let mut stops_by_node_id = HashMap::new();

        for (i, stop) in stops.iter().enumerate() {
            stops_by_name.entry(stop.name.clone()).or_default().push(i);
            if !stop.short_code.is_empty() {
                stops_by_short_code.entry(stop.short_code.clone()).or_insert(i);
            }
            if !stop.node_id.is_empty() {
                stops_by_node_id.entry(stop.node_id.clone()).or_insert(i);
            }
        }

        let mut grouped: HashMap<String, Vec<RouteStopEntry>> = HashMap::new();
        for entry in entries {
            grouped.entry(entry.route_name.clone()).or_default().push(entry);
        }
        let routes = grouped
            .into_iter()
            .map(|(name, entries)| (name, RoutePath::new(entries)))
            .collect();

        Self {
            stops,
            stops_by_name,
            stops_by_short_code,
            stops_by_node_id,
            routes,
        }
    }

    /// Load both reference tables, degrading to empty tables on any failure.
    pub fn load(stops_csv: Option<&Path>, routes_csv: Option<&Path>) -> Self {
        let stops = match stops_csv {
            Some(path) => load_stops(path).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), %error, "failed to load stop table");
                Vec::new()
            }),
            None => {
                tracing::warn!("no stop table configured");
                Vec::new()
            }
        };

        let entries = match routes_csv {
            Some(path) => load_route_entries(path).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), %error, "failed to load route table");
                Vec::new()
            }),
            None => {
                tracing::info!("no route table configured, direction lookups use upstream fields only");
                Vec::new()
            }
        };

        let index = Self::new(stops, entries);
        tracing::info!(
            stops = index.stop_count(),
            routes = index.route_count(),
            "reference data loaded"
        );
        index
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// All stops whose name contains `keyword`, in source order.
    pub fn search_stops(&self, keyword: &str) -> Vec<&Stop> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }
        self.stops
            .iter()
            .filter(|stop| stop.name.contains(keyword))
            .collect()
    }

    /// Stops whose name is exactly `name`, in source order.
    pub fn stops_named(&self, name: &str) -> Vec<&Stop> {
        self.stops_by_name
            .get(name.trim())
            .map(|indices| indices.iter().map(|&i| &self.stops[i]).collect())
            .unwrap_or_default()
    }

    /// Look a stop up by its node id, or by its ARS code when `code` looks like one.
    pub fn stop_by_code(&self, code: &str) -> Option<&Stop> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        if let Some(&i) = self.stops_by_node_id.get(code) {
            return Some(&self.stops[i]);
        }
        if !looks_like_short_code(code) {
            return None;
        }
        self.stops_by_short_code
            .get(&normalize_short_code(code))
            .map(|&i| &self.stops[i])
    }

    pub fn route_path(&self, route_name: &str) -> Option<&RoutePath> {
        self.routes.get(route_name.trim())
    }

    pub fn stop_index_in_route(&self, route_name: &str, short_code: &str) -> Option<usize> {
        self.route_path(route_name)?.position_of(short_code)
    }

    pub fn route_id(&self, route_name: &str) -> Option<&str> {
        self.route_path(route_name)?.route_id()
    }
}

/// Reduce a stop code to its digits without leading zeros.
///
/// Reference tables, user input and upstream records disagree on dashes and
/// zero padding (`"02-123"`, `"02123"`, `2123`), so every comparison goes
/// through this.
pub fn normalize_short_code(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() && !digits.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn looks_like_short_code(code: &str) -> bool {
    code.chars().any(|c| c.is_ascii_digit())
        && code.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn stop(name: &str, ars: &str, node_id: &str) -> Stop {
        Stop {
            name: name.into(),
            ars_code: ars.into(),
            node_id: node_id.into(),
            city_code: None,
            latitude: None,
            longitude: None,
            short_code: normalize_short_code(ars),
        }
    }

    pub(crate) fn entry(route: &str, sequence: u32, ars: &str, name: &str) -> RouteStopEntry {
        RouteStopEntry {
            route_name: route.into(),
            route_id: Some(format!("{route}-id")),
            sequence,
            short_code: normalize_short_code(ars),
            stop_name: name.into(),
        }
    }

    /// Route 100 runs A → B → C → D, listed out of order on purpose.
    pub(crate) fn sample_index() -> LookupIndex {
        LookupIndex::new(
            vec![
                stop("서울역", "02-001", "100000001"),
                stop("강남역", "22001", "121000001"),
                stop("역삼역", "22002", "121000002"),
                stop("강남역", "22101", "121000101"),
                stop("시청앞", "", "100000009"),
            ],
            vec![
                entry("100", 3, "00003", "C"),
                entry("100", 1, "1", "A"),
                entry("100", 4, "4", "D"),
                entry("100", 2, "2", "B"),
            ],
        )
    }

    #[test]
    fn test_normalize_short_code() {
        assert_eq!(normalize_short_code("02-123"), "2123");
        assert_eq!(normalize_short_code("01001"), "1001");
        assert_eq!(normalize_short_code(" 22001 "), "22001");
        assert_eq!(normalize_short_code("000"), "0");
        assert_eq!(normalize_short_code("강남"), "");
    }

    #[test]
    fn test_search_preserves_source_order() {
        let index = sample_index();
        let names: Vec<_> = index
            .search_stops("역")
            .into_iter()
            .map(|stop| stop.ars_code.as_str())
            .collect();
        assert_eq!(names, ["02-001", "22001", "22002", "22101"]);
        assert!(index.search_stops("  ").is_empty());
        assert!(index.search_stops("부산").is_empty());
    }

    #[test]
    fn test_stops_named_returns_every_platform() {
        let index = sample_index();
        let found = index.stops_named("강남역");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].node_id, "121000001");
        assert_eq!(found[1].node_id, "121000101");
    }

    #[test]
    fn test_stop_by_code() {
        let index = sample_index();
        assert_eq!(index.stop_by_code("2001").unwrap().name, "서울역");
        assert_eq!(index.stop_by_code("02-001").unwrap().name, "서울역");
        assert_eq!(index.stop_by_code("121000002").unwrap().name, "역삼역");
        assert_eq!(index.stop_by_code("100000009").unwrap().name, "시청앞");
        assert!(index.stop_by_code("99999").is_none());
        assert!(index.stop_by_code("강남역").is_none());
    }

    #[test]
    fn test_route_path_is_sorted() {
        let index = sample_index();
        let path = index.route_path("100").unwrap();
        let names: Vec<_> = (0..path.len())
            .filter_map(|i| path.get(i))
            .map(|e| e.stop_name.as_str())
            .collect();
        assert_eq!(names, ["A", "B", "C", "D"]);
        assert_eq!(path.terminus().unwrap().stop_name, "D");
        assert_eq!(path.route_id(), Some("100-id"));
    }

    #[test]
    fn test_stop_index_in_route() {
        let index = sample_index();
        assert_eq!(index.stop_index_in_route("100", "3"), Some(2));
        assert_eq!(index.stop_index_in_route("100", "00003"), Some(2));
        assert_eq!(index.stop_index_in_route("100", "9"), None);
        assert_eq!(index.stop_index_in_route("200", "3"), None);
    }

    #[test]
    fn test_loop_route_keeps_first_position() {
        let path = RoutePath::new(vec![
            entry("7", 1, "10", "Depot"),
            entry("7", 2, "11", "Market"),
            entry("7", 3, "10", "Depot"),
        ]);
        assert_eq!(path.position_of("10"), Some(0));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_empty_index_answers_not_found() {
        let index = LookupIndex::load(None, None);
        assert_eq!(index.stop_count(), 0);
        assert!(index.search_stops("역").is_empty());
        assert!(index.stop_by_code("22001").is_none());
        assert!(index.route_path("100").is_none());
        assert!(index.route_id("100").is_none());
    }

    #[test]
    fn test_missing_files_degrade_to_empty_index() {
        let index = LookupIndex::load(
            Some(Path::new("/nonexistent/stops.csv")),
            Some(Path::new("/nonexistent/routes.csv")),
        );
        assert_eq!(index.stop_count(), 0);
        assert_eq!(index.route_count(), 0);
    }
}
