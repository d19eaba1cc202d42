//! "Heading toward" annotations for arrival board lines.
//!
//! Direction information comes from several places of varying reliability.
//! [`DirectionResolver`] tries an ordered list of [`DirectionStrategy`]s and
//! keeps the first answer; when none answers the annotation is left out.

use std::fmt;

use crate::{lookup::LookupIndex, upstream::ArrivalRecord};

/// Values the upstream API uses for "no direction".
const SENTINELS: &[&str] = &["-", "null", "none", "없음", "0"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDirection {
    /// The next stop, plus the end of the line when that is further away.
    Toward {
        next: String,
        terminus: Option<String>,
    },
    /// The stop is the last one on the route.
    Terminal,
    /// Direction text passed through from the API.
    Explicit(String),
}

impl fmt::Display for ResolvedDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedDirection::Toward {
                next,
                terminus: Some(terminus),
            } => write!(f, "next stop {next}, final stop {terminus}"),
            ResolvedDirection::Toward {
                next,
                terminus: None,
            } => write!(f, "next stop {next}"),
            ResolvedDirection::Terminal => f.write_str("approaching terminus"),
            ResolvedDirection::Explicit(text) => write!(f, "bound for {text}"),
        }
    }
}

/// The direction for `route_name` at `stop_code`, from the local route table alone.
///
/// Returns `None` when the route is unknown or does not serve the stop.
pub fn resolve_from_route_table(
    index: &LookupIndex,
    route_name: &str,
    stop_code: &str,
) -> Option<ResolvedDirection> {
    let position = index.stop_index_in_route(route_name, stop_code)?;
    let path = index.route_path(route_name)?;

    match path.get(position + 1) {
        Some(next) => {
            let is_last = position + 2 == path.len();
            Some(ResolvedDirection::Toward {
                next: next.stop_name.clone(),
                terminus: path
                    .terminus()
                    .filter(|_| !is_last)
                    .map(|terminus| terminus.stop_name.clone()),
            })
        }
        None => Some(ResolvedDirection::Terminal),
    }
}

pub trait DirectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        index: &LookupIndex,
        stop_code: &str,
        arrival: &ArrivalRecord,
    ) -> Option<ResolvedDirection>;
}

/// Direction text the API reports for the route.
pub struct ExplicitDirection;

impl DirectionStrategy for ExplicitDirection {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn resolve(
        &self,
        _index: &LookupIndex,
        _stop_code: &str,
        arrival: &ArrivalRecord,
    ) -> Option<ResolvedDirection> {
        meaningful(arrival.direction.as_deref())
            .map(|direction| ResolvedDirection::Explicit(direction.to_string()))
    }
}

/// The API's next-stop field, which holds either a stop id or a stop name.
pub struct NextStopField;

impl DirectionStrategy for NextStopField {
    fn name(&self) -> &'static str {
        "next-stop"
    }

    fn resolve(
        &self,
        index: &LookupIndex,
        _stop_code: &str,
        arrival: &ArrivalRecord,
    ) -> Option<ResolvedDirection> {
        let value = meaningful(arrival.next_stop.as_deref())?;

        let next = match index.stop_by_code(value) {
            Some(stop) => stop.name.clone(),
            None if value.chars().all(|c| c.is_ascii_digit()) => return None,
            None => value.to_string(),
        };

        let terminus = index
            .route_path(&arrival.route_name)
            .and_then(|path| path.terminus())
            .map(|terminus| terminus.stop_name.clone())
            .filter(|terminus| *terminus != next);

        Some(ResolvedDirection::Toward { next, terminus })
    }
}

/// Adjacency in the local route table.
pub struct RouteTable;

impl DirectionStrategy for RouteTable {
    fn name(&self) -> &'static str {
        "route-table"
    }

    fn resolve(
        &self,
        index: &LookupIndex,
        stop_code: &str,
        arrival: &ArrivalRecord,
    ) -> Option<ResolvedDirection> {
        resolve_from_route_table(index, &arrival.route_name, stop_code)
    }
}

pub struct DirectionResolver {
    strategies: Vec<Box<dyn DirectionStrategy>>,
}

impl Default for DirectionResolver {
    /// API direction text first, then the API's next stop, then the route table.
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExplicitDirection),
            Box::new(NextStopField),
            Box::new(RouteTable),
        ])
    }
}

impl DirectionResolver {
    pub fn new(strategies: Vec<Box<dyn DirectionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(
        &self,
        index: &LookupIndex,
        stop_code: &str,
        arrival: &ArrivalRecord,
    ) -> Option<ResolvedDirection> {
        self.strategies.iter().find_map(|strategy| {
            let resolved = strategy.resolve(index, stop_code, arrival);
            if resolved.is_some() {
                tracing::trace!(
                    strategy = strategy.name(),
                    route = %arrival.route_name,
                    stop_code,
                    "direction resolved"
                );
            }
            resolved
        })
    }

    /// The rendered annotation, empty when no strategy knows the direction.
    pub fn annotate(&self, index: &LookupIndex, stop_code: &str, arrival: &ArrivalRecord) -> String {
        self.resolve(index, stop_code, arrival)
            .map(|direction| direction.to_string())
            .unwrap_or_default()
    }
}

fn meaningful(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    let is_sentinel = value.is_empty()
        || SENTINELS
            .iter()
            .any(|sentinel| value.eq_ignore_ascii_case(sentinel));
    (!is_sentinel).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::tests::sample_index;

    fn arrival(route: &str) -> ArrivalRecord {
        ArrivalRecord {
            route_name: route.into(),
            message: "곧 도착".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_route_table_next_and_final_stop() {
        let index = sample_index();
        assert_eq!(
            resolve_from_route_table(&index, "100", "2"),
            Some(ResolvedDirection::Toward {
                next: "C".into(),
                terminus: Some("D".into()),
            })
        );
    }

    #[test]
    fn test_route_table_second_to_last_stop_omits_final_stop() {
        let index = sample_index();
        assert_eq!(
            resolve_from_route_table(&index, "100", "3"),
            Some(ResolvedDirection::Toward {
                next: "D".into(),
                terminus: None,
            })
        );
    }

    #[test]
    fn test_route_table_terminus() {
        let index = sample_index();
        assert_eq!(
            resolve_from_route_table(&index, "100", "4"),
            Some(ResolvedDirection::Terminal)
        );
        assert_eq!(
            ResolvedDirection::Terminal.to_string(),
            "approaching terminus"
        );
    }

    #[test]
    fn test_route_table_unknown_stop_or_route() {
        let index = sample_index();
        assert_eq!(resolve_from_route_table(&index, "100", "99"), None);
        assert_eq!(resolve_from_route_table(&index, "200", "2"), None);
    }

    #[test]
    fn test_explicit_direction_wins() {
        let index = sample_index();
        let resolver = DirectionResolver::default();
        let record = ArrivalRecord {
            direction: Some("상계주공".into()),
            next_stop: Some("역삼역".into()),
            ..arrival("100")
        };
        assert_eq!(
            resolver.annotate(&index, "2", &record),
            "bound for 상계주공"
        );
    }

    #[test]
    fn test_sentinel_direction_falls_through_to_route_table() {
        let index = sample_index();
        let resolver = DirectionResolver::default();
        let record = ArrivalRecord {
            direction: Some(" 없음 ".into()),
            next_stop: Some("null".into()),
            ..arrival("100")
        };
        assert_eq!(
            resolver.annotate(&index, "2", &record),
            "next stop C, final stop D"
        );
    }

    #[test]
    fn test_next_stop_field_by_id_and_by_name() {
        let index = sample_index();
        let resolver = DirectionResolver::default();

        let by_id = ArrivalRecord {
            next_stop: Some("121000002".into()),
            ..arrival("100")
        };
        assert_eq!(
            resolver.resolve(&index, "2", &by_id),
            Some(ResolvedDirection::Toward {
                next: "역삼역".into(),
                terminus: Some("D".into()),
            })
        );

        let by_name = ArrivalRecord {
            next_stop: Some("D".into()),
            ..arrival("100")
        };
        assert_eq!(resolver.annotate(&index, "3", &by_name), "next stop D");
    }

    #[test]
    fn test_unknown_numeric_next_stop_is_ignored() {
        let index = sample_index();
        let resolver = DirectionResolver::default();
        let record = ArrivalRecord {
            next_stop: Some("555555".into()),
            ..arrival("100")
        };
        assert_eq!(resolver.annotate(&index, "4", &record), "approaching terminus");
    }

    #[test]
    fn test_no_information_gives_empty_annotation() {
        let index = sample_index();
        let resolver = DirectionResolver::default();
        assert_eq!(resolver.annotate(&index, "99", &arrival("100")), "");
        assert_eq!(resolver.annotate(&index, "2", &arrival("9000")), "");
    }

    #[test]
    fn test_custom_strategy_order() {
        let index = sample_index();
        let resolver = DirectionResolver::new(vec![Box::new(RouteTable), Box::new(ExplicitDirection)]);
        let record = ArrivalRecord {
            direction: Some("상계주공".into()),
            ..arrival("100")
        };
        assert_eq!(resolver.annotate(&index, "4", &record), "approaching terminus");
    }
}
