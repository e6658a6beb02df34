use std::env;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::error::DashError;

pub const DATA_DIR_ENV: &str = "MEDALBOARD_DATA_DIR";
pub const GAMES_YEAR_ENV: &str = "MEDALBOARD_GAMES_YEAR";

/// Session configuration: where the CSVs live and how big the rankings are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    /// Rows in the country ranking on the overview page.
    pub top_countries: usize,
    /// Rows in the per-medal country breakdown.
    pub extended_countries: usize,
    pub top_athletes: usize,
    /// Reference year for ages derived from birth dates.
    pub games_year: i32,
    /// Length given to schedule entries that have no end time.
    pub default_slot: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            top_countries: 10,
            extended_countries: 20,
            top_athletes: 10,
            games_year: 2024,
            default_slot: Duration::hours(2),
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `MEDALBOARD_DATA_DIR` and `MEDALBOARD_GAMES_YEAR`.
    pub fn from_env() -> Result<Self, DashError> {
        let mut config = Self::default();
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(year) = env::var(GAMES_YEAR_ENV) {
            config.games_year = year.trim().parse().map_err(|_| {
                DashError::InvalidData(format!("{GAMES_YEAR_ENV} must be a year, got '{year}'"))
            })?;
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_top_countries(mut self, n: usize) -> Self {
        self.top_countries = n;
        self
    }

    pub fn with_extended_countries(mut self, n: usize) -> Self {
        self.extended_countries = n;
        self
    }

    pub fn with_top_athletes(mut self, n: usize) -> Self {
        self.top_athletes = n;
        self
    }

    pub fn with_games_year(mut self, year: i32) -> Self {
        self.games_year = year;
        self
    }

    pub fn with_default_slot(mut self, slot: Duration) -> Self {
        self.default_slot = slot;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_layout() {
        let config = DashboardConfig::default();
        assert_eq!(config.top_countries, 10);
        assert_eq!(config.extended_countries, 20);
        assert_eq!(config.top_athletes, 10);
        assert_eq!(config.default_slot, Duration::hours(2));
    }

    #[test]
    fn builders_override_fields() {
        let config = DashboardConfig::default()
            .with_data_dir("/srv/olympics")
            .with_games_year(2028)
            .with_top_countries(5);
        assert_eq!(config.data_dir, PathBuf::from("/srv/olympics"));
        assert_eq!(config.games_year, 2028);
        assert_eq!(config.top_countries, 5);
    }
}
