use crate::domain::defaults;
use crate::domain::types::{TimeGrid, UnitOfTime, VirtualTime};
use crate::error::{Error, Result};
use crate::scope::ScopeOptions;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub unit_of_time_ticks: u64,
    pub time_grid_ticks: u64,
    pub expectation_padding_ticks: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        Self::builder()?
            // Add configuration file if it exists
            .add_source(File::with_name("marbletest").required(false))
            .add_source(Environment::with_prefix("MARBLETEST").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default(
                "scheduler.unit_of_time_ticks",
                defaults::scheduler::UNIT_OF_TIME_TICKS,
            )?
            .set_default(
                "scheduler.time_grid_ticks",
                defaults::scheduler::TIME_GRID_TICKS,
            )?
            .set_default(
                "scheduler.expectation_padding_ticks",
                defaults::scheduler::EXPECTATION_PADDING_TICKS,
            )?
            .set_default("logging.level", defaults::logging::DEFAULT_FILTER)
    }

    /// Validate the scheduler settings into options for a new scope
    pub fn scope_options(&self) -> Result<ScopeOptions> {
        let unit_of_time = UnitOfTime::try_new(self.scheduler.unit_of_time_ticks)
            .map_err(|e| Error::invalid_setting("scheduler.unit_of_time_ticks", e))?;
        let time_grid = TimeGrid::try_new(self.scheduler.time_grid_ticks)
            .map_err(|e| Error::invalid_setting("scheduler.time_grid_ticks", e))?;

        Ok(ScopeOptions {
            unit_of_time,
            time_grid,
            expectation_padding: VirtualTime::new(self.scheduler.expectation_padding_ticks),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings {
                unit_of_time_ticks: defaults::scheduler::UNIT_OF_TIME_TICKS,
                time_grid_ticks: defaults::scheduler::TIME_GRID_TICKS,
                expectation_padding_ticks: defaults::scheduler::EXPECTATION_PADDING_TICKS,
            },
            logging: LoggingSettings {
                level: defaults::logging::DEFAULT_FILTER.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_can_be_loaded() {
        let settings = Settings::new();
        assert!(settings.is_ok());
    }

    #[test]
    fn test_built_in_defaults_match_default_impl() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_default_scope_options() {
        let options = Settings::default().scope_options().unwrap();
        assert_eq!(options, ScopeOptions::default());
        assert_eq!(options.unit_of_time.ticks(), 10);
        assert_eq!(options.expectation_padding, VirtualTime::new(1000));
    }

    #[test]
    fn test_zero_unit_of_time_is_rejected() {
        let mut settings = Settings::default();
        settings.scheduler.unit_of_time_ticks = 0;

        match settings.scope_options() {
            Err(Error::InvalidSetting(message)) => {
                assert!(message.starts_with("scheduler.unit_of_time_ticks"));
            }
            other => panic!("expected an invalid setting, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_time_grid_is_rejected() {
        let mut settings = Settings::default();
        settings.scheduler.time_grid_ticks = 0;
        assert!(matches!(
            settings.scope_options(),
            Err(Error::InvalidSetting(_))
        ));
    }
}
