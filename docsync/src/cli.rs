use std::{fmt, path::PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_API_URL: &str = "https://reqres.in/api";
pub const DEFAULT_DATABASE: &str = "gfg";
pub const DEFAULT_USER_COLLECTION: &str = "userdata";
pub const DEFAULT_POST_COLLECTION: &str = "postinfo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", default_value = DEFAULT_MONGODB_URI)]
    pub mongodb_uri: String,

    /// Base URL of the REST API receiving the records
    #[arg(long, env = "DOCSYNC_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Database holding both collections
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Collection for user records
    #[arg(long, default_value = DEFAULT_USER_COLLECTION)]
    pub user_collection: String,

    /// Collection for post records
    #[arg(long, default_value = DEFAULT_POST_COLLECTION)]
    pub post_collection: String,

    /// Timeout in seconds for each store call and HTTP request
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Timeout in seconds for establishing the store connection
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub connect_timeout_secs: u64,

    /// Extra attempts for failures that may succeed when repeated
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// JSON file with {"user": {...}, "post": {...}} to sync instead of the demo records
    #[arg(long, value_name = "FILE")]
    pub seed: Option<PathBuf>,

    /// Id to fetch from /users and /posts (defaults to each record's own id)
    #[arg(long, value_name = "ID")]
    pub fetch_id: Option<String>,

    /// Config file (defaults to $XDG_CONFIG_HOME/docsync/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not touch the store
    #[arg(long)]
    pub skip_store: bool,

    /// Do not call the REST API
    #[arg(long)]
    pub skip_sync: bool,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default();
        f.write_str(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_setup() {
        let args = Args::try_parse_from(["docsync"]).unwrap();
        assert_eq!(args.database, "gfg");
        assert_eq!(args.user_collection, "userdata");
        assert_eq!(args.post_collection, "postinfo");
        assert_eq!(args.timeout_secs, 30);
        assert_eq!(args.retries, 0);
        assert!(!args.skip_store);
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        assert!(Args::try_parse_from(["docsync", "--timeout-secs", "0"]).is_err());
        assert!(Args::try_parse_from(["docsync", "--connect-timeout-secs", "0"]).is_err());

        let args = Args::try_parse_from(["docsync", "--timeout-secs", "1"]).unwrap();
        assert_eq!(args.timeout_secs, 1);
    }

    #[test]
    fn log_level_round_trips_through_display() {
        let args = Args::try_parse_from(["docsync", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level.to_string(), "debug");
        assert_eq!(LevelFilter::from(args.log_level), LevelFilter::Debug);
    }
}
