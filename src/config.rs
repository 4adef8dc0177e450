// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use envconfig::Envconfig;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use crate::entity::{MeasurementKind, UnknownMeasurement};

///
///Configuration error. Env when a variable is missing or
///does not parse, InvalidAddress for an I2C address that is
///neither decimal nor 0x-prefixed hex in 7 bit range,
///UnknownCondition for a monitored condition other than
///eco2 or tvoc.
///
#[derive(Debug)]
pub enum ConfigError {
    Env(envconfig::Error),
    InvalidAddress(String),
    UnknownCondition(UnknownMeasurement),
}

impl From<envconfig::Error> for ConfigError {
    fn from(e: envconfig::Error) -> Self {
        ConfigError::Env(e)
    }
}

impl From<UnknownMeasurement> for ConfigError {
    fn from(e: UnknownMeasurement) -> Self {
        ConfigError::UnknownCondition(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Env(ref e) => fmt::Display::fmt(e, f),
            ConfigError::InvalidAddress(ref a) => write!(f, "invalid I2C address '{}'", a),
            ConfigError::UnknownCondition(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Env(e) => Some(e),
            ConfigError::InvalidAddress(_) => None,
            ConfigError::UnknownCondition(e) => Some(e),
        }
    }
}

/// Sensor setup, read from `CCS811_*` environment variables
#[derive(Envconfig, Debug, Clone)]
pub struct Ccs811Config {
    /// Prefix of every entity name
    #[envconfig(from = "CCS811_NAME", default = "CCS811 Sensor")]
    pub name: String,

    #[envconfig(from = "CCS811_I2C_BUS", default = "/dev/i2c-1")]
    pub i2c_bus: String,

    /// Decimal or 0x-prefixed hex
    #[envconfig(from = "CCS811_I2C_ADDRESS", default = "0x5A")]
    pub i2c_address: String,

    /// Comma separated subset of eco2,tvoc
    #[envconfig(from = "CCS811_MONITORED_CONDITIONS", default = "eco2,tvoc")]
    pub monitored_conditions: String,

    /// Id of the external temperature source
    #[envconfig(from = "CCS811_TEMPERATURE_SENSOR")]
    pub temperature_sensor: Option<String>,

    /// Id of the external humidity source
    #[envconfig(from = "CCS811_HUMIDITY_SENSOR")]
    pub humidity_sensor: Option<String>,

    #[envconfig(from = "CCS811_READ_TIMEOUT_MS", default = "2000")]
    pub read_timeout_ms: u64,
}

impl Ccs811Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Ccs811Config::init_from_env()?)
    }

    pub fn address(&self) -> Result<u16, ConfigError> {
        let raw = self.i2c_address.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => raw.parse(),
        };
        match parsed {
            Ok(address) if address <= 0x7F => Ok(address),
            _ => Err(ConfigError::InvalidAddress(self.i2c_address.clone())),
        }
    }

    /// Monitored measurements in configured order, empty entries skipped
    pub fn monitored(&self) -> Result<Vec<MeasurementKind>, ConfigError> {
        self.monitored_conditions
            .split(',')
            .filter(|key| !key.trim().is_empty())
            .map(|key| key.parse::<MeasurementKind>().map_err(ConfigError::from))
            .collect()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Ccs811Config, envconfig::Error> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ccs811Config::init_from_hashmap(&map)
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.name, "CCS811 Sensor");
        assert_eq!(config.i2c_bus, "/dev/i2c-1");
        assert_eq!(config.address().unwrap(), 0x5A);
        assert_eq!(
            config.monitored().unwrap(),
            vec![MeasurementKind::Eco2, MeasurementKind::Tvoc]
        );
        assert_eq!(config.temperature_sensor, None);
        assert_eq!(config.humidity_sensor, None);
        assert_eq!(config.read_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("CCS811_NAME", "Bedroom"),
            ("CCS811_I2C_ADDRESS", "91"),
            ("CCS811_MONITORED_CONDITIONS", "tvoc"),
            ("CCS811_TEMPERATURE_SENSOR", "sensor.bedroom_temperature"),
            ("CCS811_HUMIDITY_SENSOR", "sensor.bedroom_humidity"),
        ])
        .unwrap();
        assert_eq!(config.name, "Bedroom");
        assert_eq!(config.address().unwrap(), 0x5B);
        assert_eq!(config.monitored().unwrap(), vec![MeasurementKind::Tvoc]);
        assert_eq!(
            config.temperature_sensor.as_deref(),
            Some("sensor.bedroom_temperature")
        );
        assert_eq!(config.humidity_sensor.as_deref(), Some("sensor.bedroom_humidity"));
    }

    #[test]
    fn rejects_bad_address() {
        for address in ["0xZZ", "0x80", "-1", ""] {
            let config = config(&[("CCS811_I2C_ADDRESS", address)]).unwrap();
            assert!(matches!(config.address(), Err(ConfigError::InvalidAddress(_))));
        }
    }

    #[test]
    fn rejects_unknown_condition() {
        let config = config(&[("CCS811_MONITORED_CONDITIONS", "eco2,humidity")]).unwrap();
        assert!(matches!(
            config.monitored(),
            Err(ConfigError::UnknownCondition(_))
        ));
    }

    #[test]
    fn empty_conditions_monitor_nothing() {
        let config = config(&[("CCS811_MONITORED_CONDITIONS", " , ")]).unwrap();
        assert!(config.monitored().unwrap().is_empty());
    }

    #[test]
    fn bad_timeout_is_env_error() {
        assert!(config(&[("CCS811_READ_TIMEOUT_MS", "soon")]).is_err());
    }
}
