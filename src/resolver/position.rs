//! Vehicle positions estimated from a route-wide arrival snapshot.
//!
//! Each stop of the snapshot reports the countdown of the nearest approaching
//! bus. "Arriving now" at stop `i` puts a bus at `i`, heading to `i + 1`;
//! "1 stop away" at stop `i` puts a bus at `i - 1`, heading to `i`. Everything
//! else carries no usable position.
//!
//! One bus usually shows up twice, once as "arriving" and once as a
//! "1 stop away" echo on a neighbouring stop. A vehicle id, when the snapshot
//! has one, identifies the bus. Without it every position is claimed at most
//! once and a "1 stop away" directly before an "arriving now" is taken to be
//! the same bus.

use std::collections::HashSet;

use super::message::{ArrivalSignal, classify};
use crate::upstream::StopSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehiclePosition {
    /// Index into the snapshot of the stop the vehicle is at or just past.
    pub at: usize,
    pub at_name: String,
    /// `None` when the vehicle is at the last stop of the route.
    pub heading_to: Option<usize>,
    pub heading_name: Option<String>,
    pub vehicle_id: Option<String>,
}

struct Candidate<'a> {
    at: usize,
    vehicle_id: Option<&'a str>,
}

pub fn estimate_positions(snapshot: &[StopSnapshot]) -> Vec<VehiclePosition> {
    let signals: Vec<ArrivalSignal> = snapshot.iter().map(|stop| classify(&stop.message)).collect();

    // arriving signals first, so that they win over their echoes
    let arriving = signals
        .iter()
        .enumerate()
        .filter(|(_, signal)| **signal == ArrivalSignal::ArrivingNow)
        .map(|(i, _)| Candidate {
            at: i,
            vehicle_id: snapshot[i].vehicle_id.as_deref(),
        });

    let one_stop_away = signals
        .iter()
        .enumerate()
        .filter(|(i, signal)| **signal == ArrivalSignal::StopsAway(1) && *i > 0)
        .filter(|(i, _)| {
            snapshot[*i].vehicle_id.is_some()
                || signals.get(i + 1) != Some(&ArrivalSignal::ArrivingNow)
        })
        .map(|(i, _)| Candidate {
            at: i - 1,
            vehicle_id: snapshot[i].vehicle_id.as_deref(),
        });

    let mut claimed_ids = HashSet::new();
    let mut claimed_positions = HashSet::new();
    let mut positions = Vec::new();

    for candidate in arriving.chain(one_stop_away) {
        let fresh = match candidate.vehicle_id {
            Some(id) => {
                claimed_positions.insert(candidate.at);
                claimed_ids.insert(id)
            }
            None => claimed_positions.insert(candidate.at),
        };
        if fresh {
            positions.push(position_at(snapshot, candidate));
        }
    }

    positions.sort_by_key(|position| position.at);
    positions
}

fn position_at(snapshot: &[StopSnapshot], candidate: Candidate<'_>) -> VehiclePosition {
    let heading_to = Some(candidate.at + 1).filter(|&next| next < snapshot.len());
    VehiclePosition {
        at: candidate.at,
        at_name: snapshot[candidate.at].stop_name.clone(),
        heading_to,
        heading_name: heading_to.map(|next| snapshot[next].stop_name.clone()),
        vehicle_id: candidate.vehicle_id.map(str::to_string),
    }
}
