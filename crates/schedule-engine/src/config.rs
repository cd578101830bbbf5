//! Engine configuration.
//!
//! Read from a TOML file such as:
//!
//! ```toml
//! horizon_years = 10
//! min_year = 1900
//! max_year = 2100
//! max_years_ahead = 100
//! timezone = "Asia/Seoul"
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calendar::parse_timezone;
use crate::error::{Result, ScheduleError};

pub const DEFAULT_HORIZON_YEARS: u32 = 10;
pub const DEFAULT_MIN_YEAR: i32 = 1900;
pub const DEFAULT_MAX_YEAR: i32 = 2100;
pub const DEFAULT_MAX_YEARS_AHEAD: u32 = 100;
pub const DEFAULT_TIMEZONE: &str = "UTC";

fn default_horizon_years() -> u32 {
    DEFAULT_HORIZON_YEARS
}

fn default_min_year() -> i32 {
    DEFAULT_MIN_YEAR
}

fn default_max_year() -> i32 {
    DEFAULT_MAX_YEAR
}

fn default_max_years_ahead() -> u32 {
    DEFAULT_MAX_YEARS_AHEAD
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// How far a series with no end date is expanded, in years from its base date.
    #[serde(default = "default_horizon_years")]
    pub horizon_years: u32,

    /// Smallest year accepted by the end-date validator.
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    /// Largest year accepted by the end-date validator.
    #[serde(default = "default_max_year")]
    pub max_year: i32,

    /// End dates further than this many years after today are rejected.
    #[serde(default = "default_max_years_ahead")]
    pub max_years_ahead: u32,

    /// IANA timezone used to decide which calendar day "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            horizon_years: DEFAULT_HORIZON_YEARS,
            min_year: DEFAULT_MIN_YEAR,
            max_year: DEFAULT_MAX_YEAR,
            max_years_ahead: DEFAULT_MAX_YEARS_AHEAD,
            timezone: default_timezone(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| ScheduleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ScheduleError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon_years == 0 {
            return Err(ScheduleError::Config(
                "horizon_years must be at least 1".to_string(),
            ));
        }
        if self.min_year < 1000 || self.max_year > 9999 {
            return Err(ScheduleError::Config(format!(
                "year range {}..={} must stay within four-digit years 1000..=9999",
                self.min_year, self.max_year
            )));
        }
        if self.min_year > self.max_year {
            return Err(ScheduleError::Config(format!(
                "min_year {} is greater than max_year {}",
                self.min_year, self.max_year
            )));
        }
        if self.max_years_ahead == 0 {
            return Err(ScheduleError::Config(
                "max_years_ahead must be at least 1".to_string(),
            ));
        }
        parse_timezone(&self.timezone)
            .map_err(|_| ScheduleError::Config(format!("unknown timezone '{}'", self.timezone)))?;
        Ok(())
    }
}
