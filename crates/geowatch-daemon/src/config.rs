use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://geowatch.db?mode=rwc";
pub const DEFAULT_API_URL: &str = "http://ip-api.com/json/{ip}?fields=status,message,country,countryCode,regionName,city,lat,lon,isp,org,as,query";
pub const DEFAULT_SEED_IP: &str = "8.8.8.8";

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PACING_SECS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    /// Lookup URL with an `{ip}` placeholder.
    pub api_url: String,
    pub log_file: Option<PathBuf>,
    pub check_interval: Duration,
    pub lookup_timeout: Duration,
    pub pacing_delay: Duration,
    /// `None` disables seeding of the empty node table.
    pub seed_ip: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            log_file: None,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            pacing_delay: Duration::from_secs(DEFAULT_PACING_SECS),
            seed_ip: Some(DEFAULT_SEED_IP.to_string()),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url =
            non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let api_url = non_empty("GEOWATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.contains("{ip}") {
            anyhow::bail!("GEOWATCH_API_URL must contain an {{ip}} placeholder: {api_url}");
        }

        let seconds = |key: &str, default: u64| -> anyhow::Result<Duration> {
            match non_empty(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("parse {key}={raw} as whole seconds")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        // A zero wait would spin the poll loop or hammer the provider.
        let positive_seconds = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let value = seconds(key, default)?;
            if value.is_zero() {
                anyhow::bail!("{key} must be greater than zero");
            }
            Ok(value)
        };

        let check_interval =
            positive_seconds("GEOWATCH_CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL_SECS)?;
        let lookup_timeout =
            positive_seconds("GEOWATCH_LOOKUP_TIMEOUT_SECS", DEFAULT_LOOKUP_TIMEOUT_SECS)?;
        let pacing_delay = positive_seconds("GEOWATCH_PACING_SECS", DEFAULT_PACING_SECS)?;

        // An explicitly empty seed ip switches seeding off.
        let seed_ip = match var("GEOWATCH_SEED_IP") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => Some(DEFAULT_SEED_IP.to_string()),
        };

        Ok(Self {
            database_url,
            api_url,
            log_file: non_empty("GEOWATCH_LOG_FILE").map(PathBuf::from),
            check_interval,
            lookup_timeout,
            pacing_delay,
            seed_ip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_vars(|_| None).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.check_interval, Duration::from_secs(60));
        assert_eq!(cfg.lookup_timeout, Duration::from_secs(10));
        assert_eq!(cfg.pacing_delay, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let env = vars(&[
            ("DATABASE_URL", "postgres://geo@localhost/geo"),
            ("GEOWATCH_API_URL", "http://127.0.0.1:9000/json/{ip}"),
            ("GEOWATCH_LOG_FILE", "/var/log/geowatch.log"),
            ("GEOWATCH_CHECK_INTERVAL_SECS", "300"),
            ("GEOWATCH_LOOKUP_TIMEOUT_SECS", "3"),
            ("GEOWATCH_PACING_SECS", "2"),
            ("GEOWATCH_SEED_IP", "1.1.1.1"),
        ]);
        let cfg = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.database_url, "postgres://geo@localhost/geo");
        assert_eq!(cfg.api_url, "http://127.0.0.1:9000/json/{ip}");
        assert_eq!(cfg.log_file, Some(PathBuf::from("/var/log/geowatch.log")));
        assert_eq!(cfg.check_interval, Duration::from_secs(300));
        assert_eq!(cfg.lookup_timeout, Duration::from_secs(3));
        assert_eq!(cfg.pacing_delay, Duration::from_secs(2));
        assert_eq!(cfg.seed_ip.as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn empty_seed_ip_disables_seeding() {
        let env = vars(&[("GEOWATCH_SEED_IP", "")]);
        let cfg = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(cfg.seed_ip, None);
    }

    #[test]
    fn rejects_bad_numbers_and_templates() {
        let env = vars(&[("GEOWATCH_CHECK_INTERVAL_SECS", "soon")]);
        assert!(Config::from_vars(|k| env.get(k).cloned()).is_err());

        let env = vars(&[("GEOWATCH_API_URL", "http://ip-api.com/json/")]);
        assert!(Config::from_vars(|k| env.get(k).cloned()).is_err());

        let env = vars(&[("GEOWATCH_LOOKUP_TIMEOUT_SECS", "0")]);
        assert!(Config::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn rejects_zero_waits() {
        for key in ["GEOWATCH_CHECK_INTERVAL_SECS", "GEOWATCH_PACING_SECS"] {
            let env = vars(&[(key, "0")]);
            let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
            assert!(err.to_string().contains(key), "{key}: {err}");
        }
    }
}
