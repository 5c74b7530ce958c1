use crate::limits::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}")]
    Unparseable { var: &'static str, value: String },
    #[error("{var}: {value} out of range (max {max})")]
    OutOfRange {
        var: &'static str,
        value: u32,
        max: u32,
    },
}

/// Runtime settings, read from `STAYBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub horizon_months: u32,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon_months: DEFAULT_HORIZON_MONTHS,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(raw) = lookup("STAYBOOK_HORIZON_MONTHS") {
            let months: u32 = parse("STAYBOOK_HORIZON_MONTHS", &raw)?;
            if months == 0 || months > MAX_HORIZON_MONTHS {
                return Err(ConfigError::OutOfRange {
                    var: "STAYBOOK_HORIZON_MONTHS",
                    value: months,
                    max: MAX_HORIZON_MONTHS,
                });
            }
            config.horizon_months = months;
        }
        if let Some(raw) = lookup("STAYBOOK_METRICS_PORT") {
            config.metrics_port = Some(parse("STAYBOOK_METRICS_PORT", &raw)?);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Unparseable {
        var,
        value: raw.to_string(),
    })
}
