use anyhow::Context;
use std::time::Duration;

const PREFIX: &str = "TIMETABLE";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub body_limit: usize,
    /// Applied to jobs that carry no `timeLimitSec` of their own.
    pub solver_time_limit: Option<Duration>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            body_limit: 2 * 1024 * 1024,
            solver_time_limit: None,
            log_json: true,
        }
    }
}

fn key(section: &str, name: &str) -> String {
    format!("{PREFIX}__{section}__{name}")
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    section: &str,
    name: &str,
) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let k = key(section, name);
    match lookup(&k) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {k}={raw:?}")),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        if let Some(port) = parsed(&lookup, "SERVER", "PORT")? {
            cfg.port = port;
        }
        if let Some(limit) = parsed(&lookup, "SERVER", "BODY_LIMIT")? {
            cfg.body_limit = limit;
        }
        cfg.solver_time_limit =
            parsed::<u64>(&lookup, "SOLVER", "TIME_LIMIT_SEC")?.map(Duration::from_secs);
        if let Some(json) = parsed(&lookup, "LOG", "JSON")? {
            cfg.log_json = json;
        }
        Ok(cfg)
    }
}
