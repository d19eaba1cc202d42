//! Classification of free-text arrival messages.
//!
//! The upstream countdown text mixes a time estimate with a stop count, e.g.
//! `"3분12초후[2번째 전]"`, `"곧 도착"` or `"운행종료"`. Only the stop count and
//! a few fixed phrases carry position information.

use std::sync::LazyLock;

use regex::Regex;

static STOPS_AWAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*번째\s*전|(\d+)\s*stops?\s+away").expect("valid stops-away pattern")
});

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:분|min)").expect("valid minutes pattern"));

static SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:초|sec)").expect("valid seconds pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalSignal {
    /// The bus is at or pulling into the stop.
    ArrivingNow,
    StopsAway(u32),
    ServiceEnded,
    Other,
}

pub fn classify(message: &str) -> ArrivalSignal {
    let message = message.trim();
    let lower = message.to_lowercase();

    if message.contains("운행종료") || lower.contains("ended") {
        return ArrivalSignal::ServiceEnded;
    }

    if let Some(captures) = STOPS_AWAY.captures(message) {
        let count = captures
            .get(1)
            .or_else(|| captures.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        match count {
            Some(0) => return ArrivalSignal::ArrivingNow,
            Some(n) => return ArrivalSignal::StopsAway(n),
            None => {}
        }
    }

    // "5분 후 도착" is a countdown, not an arrival
    let arriving_phrase = message.contains("곧 도착")
        || (message.contains("도착") && !message.contains('없'))
        || lower.contains("arriving");
    if arriving_phrase && !has_countdown(message) {
        return ArrivalSignal::ArrivingNow;
    }

    if message.contains("전 정류장") || message.contains("전정류장") {
        return ArrivalSignal::StopsAway(1);
    }

    ArrivalSignal::Other
}

/// Whole minutes mentioned in the message; a seconds-only countdown is `0`.
pub fn minutes_left(message: &str) -> Option<u32> {
    first_number(&MINUTES, message).or_else(|| first_number(&SECONDS, message).map(|_| 0))
}

fn has_countdown(message: &str) -> bool {
    first_number(&MINUTES, message)
        .into_iter()
        .chain(first_number(&SECONDS, message))
        .any(|n| n > 0)
}

fn first_number(pattern: &Regex, message: &str) -> Option<u32> {
    pattern
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
