use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_WFS_URL: &str = "https://mapy.geoportal.gov.pl/wss/service/rcn";
pub const DEFAULT_USER_AGENT: &str = "RealTools-AI/2.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RECORDS: u32 = 500;
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Upstream WFS service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub wfs_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_records: u32,
    pub radius_km: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wfs_url: DEFAULT_WFS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_records: DEFAULT_MAX_RECORDS,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl Settings {
    /// Reads settings from `RCN_*` environment variables, falling back to
    /// the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = parse_var(&lookup, "RCN_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            anyhow::bail!("RCN_TIMEOUT_SECS must be at least 1");
        }
        let radius_km: f64 = parse_var(&lookup, "RCN_RADIUS_KM", DEFAULT_RADIUS_KM)?;
        if !(radius_km.is_finite() && radius_km > 0.0) {
            anyhow::bail!("RCN_RADIUS_KM must be a positive number, got {radius_km}");
        }

        Ok(Self {
            wfs_url: lookup("RCN_WFS_URL").unwrap_or_else(|| DEFAULT_WFS_URL.to_string()),
            user_agent: lookup("RCN_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_records: parse_var(&lookup, "RCN_MAX_RECORDS", DEFAULT_MAX_RECORDS)?,
            radius_km,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
