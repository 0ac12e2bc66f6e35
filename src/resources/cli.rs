use bevy::prelude::*;
use std::path::PathBuf;

/// Number of ticks simulated when `--ticks` is not given.
pub const DEFAULT_TICKS: u64 = 300;
/// Number of workers spawned when `--workers` is not given.
pub const DEFAULT_WORKERS: usize = 12;

/// Command-line arguments parsed at startup.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Ticks to simulate before exiting.
    /// Usage: `colony --ticks 1000`
    pub ticks: u64,

    /// JSON file with `PathCacheConfig` overrides.
    /// Usage: `colony --config cache.json`
    pub config: Option<PathBuf>,

    /// Directory for cache snapshots instead of the platform data dir.
    pub state_dir: Option<PathBuf>,

    /// Overrides the configured cache capacity.
    pub capacity: Option<usize>,

    /// Number of workers commuting between spawn and sites.
    pub workers: usize,

    /// World generation seed.
    pub seed: u32,

    /// Keep snapshots in memory only.
    pub no_persist: bool,

    /// Log filter in `RUST_LOG` syntax, overriding the default.
    /// Usage: `colony --log-level colony_paths=debug`
    pub log_level: Option<String>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            ticks: DEFAULT_TICKS,
            config: None,
            state_dir: None,
            capacity: None,
            workers: DEFAULT_WORKERS,
            seed: 42,
            no_persist: false,
            log_level: None,
        }
    }
}

impl CliArgs {
    /// Parse the process's command-line arguments.
    pub fn parse() -> Self {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parse arguments, program name excluded.
    /// Supports:
    /// - `--ticks <n>`: Ticks to simulate
    /// - `--config <path>`: Cache config file
    /// - `--state-dir <path>`: Snapshot directory
    /// - `--capacity <n>`: Cache capacity override
    /// - `--workers <n>`: Worker count
    /// - `--seed <n>`: World seed
    /// - `--no-persist`: Don't write snapshots to disk
    /// - `--log-level <filter>`: Log filter, e.g. `debug` or `colony_paths=trace`
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut cli = CliArgs::default();

        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1).map(String::as_str);
            let consumed = match args[i].as_str() {
                "--ticks" => parse_number(&args[i], value).map(|n| cli.ticks = n),
                "--capacity" => parse_number(&args[i], value).map(|n| cli.capacity = Some(n)),
                "--workers" => parse_number(&args[i], value).map(|n| cli.workers = n),
                "--seed" => parse_number(&args[i], value).map(|n| cli.seed = n),
                "--config" => parse_path(&args[i], value).map(|p| cli.config = Some(p)),
                "--state-dir" => parse_path(&args[i], value).map(|p| cli.state_dir = Some(p)),
                "--log-level" => parse_text(&args[i], value).map(|f| cli.log_level = Some(f)),
                "--no-persist" => {
                    cli.no_persist = true;
                    i += 1;
                    continue;
                }
                arg => {
                    if arg.starts_with('-') {
                        warn!("CLI: Unknown argument '{}'", arg);
                    }
                    i += 1;
                    continue;
                }
            };
            i += if consumed.is_some() { 2 } else { 1 };
        }

        cli
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&str>) -> Option<T> {
    let Some(value) = value else {
        warn!("CLI: {} requires a numeric argument", flag);
        return None;
    };
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("CLI: {} expects a number, got '{}'", flag, value);
            None
        }
    }
}

fn parse_path(flag: &str, value: Option<&str>) -> Option<PathBuf> {
    match value {
        Some(v) if !v.starts_with("--") => Some(PathBuf::from(v)),
        _ => {
            warn!("CLI: {} requires a path argument", flag);
            None
        }
    }
}

fn parse_text(flag: &str, value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() && !v.starts_with("--") => Some(v.to_string()),
        _ => {
            warn!("CLI: {} requires a value", flag);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = CliArgs::parse_from(Vec::<String>::new());
        assert_eq!(cli, CliArgs::default());
    }

    #[test]
    fn test_all_flags() {
        let cli = CliArgs::parse_from([
            "--ticks", "50", "--config", "cache.json", "--state-dir", "/tmp/state",
            "--capacity", "64", "--workers", "3", "--seed", "7", "--no-persist",
        ]);
        assert_eq!(cli.ticks, 50);
        assert_eq!(cli.config, Some(PathBuf::from("cache.json")));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/state")));
        assert_eq!(cli.capacity, Some(64));
        assert_eq!(cli.workers, 3);
        assert_eq!(cli.seed, 7);
        assert!(cli.no_persist);
    }

    #[test]
    fn test_log_level() {
        let cli = CliArgs::parse_from(["--log-level", "debug", "--ticks", "5"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.ticks, 5);

        let missing = CliArgs::parse_from(["--log-level", "--no-persist"]);
        assert_eq!(missing.log_level, None);
        assert!(missing.no_persist);
    }

    #[test]
    fn test_bad_values_are_skipped() {
        let cli = CliArgs::parse_from(["--ticks", "lots", "--workers", "--config"]);
        assert_eq!(cli.ticks, DEFAULT_TICKS);
        assert_eq!(cli.workers, DEFAULT_WORKERS);
        assert_eq!(cli.config, None);
    }
}
