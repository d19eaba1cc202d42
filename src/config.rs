use std::{path::PathBuf, time::Duration};

use clap::Args;

use crate::{
    service::ServiceSettings,
    upstream::{DEFAULT_BASE_URL, DEFAULT_NATIONAL_BASE_URL},
};

/// Settings shared by every subcommand, read from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// API service key, either as issued or already URL-encoded
    #[arg(long, env = "BUS_SERVICE_KEY", default_value = "", hide_env_values = true)]
    pub service_key: String,

    /// Base URL of the Seoul bus information API
    #[arg(long, env = "BUS_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Base URL of the national arrival API, used for stops outside Seoul
    #[arg(long, env = "BUS_NATIONAL_API_BASE_URL", default_value = DEFAULT_NATIONAL_BASE_URL)]
    pub national_base_url: String,

    /// CSV table of bus stops (name, ARS code, stop id, coordinates)
    #[arg(long, env = "BUS_STOPS_CSV")]
    pub stops_csv: Option<PathBuf>,

    /// CSV table of route stop sequences
    #[arg(long, env = "BUS_ROUTES_CSV")]
    pub routes_csv: Option<PathBuf>,

    /// Timeout for a single upstream request, in seconds
    #[arg(long, env = "BUS_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout_secs: u64,

    /// Stops queried at most when a stop name matches several
    #[arg(long, env = "BUS_MAX_STOPS", default_value_t = 3)]
    pub max_stops: usize,

    /// Matches listed by a stop search
    #[arg(long, env = "BUS_SEARCH_LIMIT", default_value_t = 20)]
    pub search_limit: usize,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn settings(&self) -> ServiceSettings {
        ServiceSettings {
            max_stops_per_query: self.max_stops.max(1),
            search_limit: self.search_limit.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "test",
            "--stops-csv",
            "stops.csv",
            "--timeout-secs",
            "0",
            "--max-stops",
            "5",
        ]);
        assert_eq!(cli.config.stops_csv, Some(PathBuf::from("stops.csv")));
        assert_eq!(cli.config.timeout(), Duration::from_secs(1));
        assert_eq!(cli.config.settings().max_stops_per_query, 5);
        assert_eq!(cli.config.settings().search_limit, 20);
        assert_eq!(cli.config.national_base_url, DEFAULT_NATIONAL_BASE_URL);
    }
}
