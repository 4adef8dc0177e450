// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::info;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::ccs811::{Ccs811, Ccs811Error};
use crate::compensation::CompensationFeed;
use crate::config::{Ccs811Config, ConfigError};
use crate::entity::{MeasurementKind, SensorEntity};
use crate::handler::{AirQualitySensor, HandlerError, SensorHandler, SharedHandler};

/// Error type of a station running on a Linux I2C bus
pub type LinuxSensorError = HandlerError<Ccs811Error<LinuxI2CError>>;

#[derive(Debug)]
pub enum SetupError {
    Config(ConfigError),
    Open(LinuxI2CError),
    Sensor(LinuxSensorError),
}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}

impl From<LinuxI2CError> for SetupError {
    fn from(e: LinuxI2CError) -> Self {
        SetupError::Open(e)
    }
}

impl From<Ccs811Error<LinuxI2CError>> for SetupError {
    fn from(e: Ccs811Error<LinuxI2CError>) -> Self {
        SetupError::Sensor(HandlerError::Driver(e))
    }
}

impl From<LinuxSensorError> for SetupError {
    fn from(e: LinuxSensorError) -> Self {
        SetupError::Sensor(e)
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SetupError::Config(ref e) => write!(f, "configuration: {}", e),
            SetupError::Open(ref e) => write!(f, "cannot open I2C device: {}", e),
            SetupError::Sensor(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl Error for SetupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SetupError::Config(e) => Some(e),
            SetupError::Open(e) => Some(e),
            SetupError::Sensor(e) => Some(e),
        }
    }
}

/// One physical sensor: its handler, one entity per monitored
/// measurement and the compensation feed, all sharing the handler.
pub struct Ccs811Station<D> {
    handler: SharedHandler<D>,
    entities: Vec<SensorEntity<D>>,
    feed: CompensationFeed<D>,
}

impl<D: AirQualitySensor> Ccs811Station<D> {
    pub fn new(
        driver: D,
        name: &str,
        kinds: &[MeasurementKind],
        temperature_source: Option<String>,
        humidity_source: Option<String>,
    ) -> Self {
        let handler = SensorHandler::new(driver).into_shared();
        let entities = kinds
            .iter()
            .map(|&kind| SensorEntity::new(Arc::clone(&handler), kind, name))
            .collect();
        let feed = CompensationFeed::new(Arc::clone(&handler), temperature_source, humidity_source);
        Ccs811Station {
            handler,
            entities,
            feed,
        }
    }

    /// Host update tick: refreshes every entity in turn
    pub fn refresh_all(&mut self) -> Result<(), HandlerError<D::Error>> {
        for entity in self.entities.iter_mut() {
            entity.refresh()?;
        }
        Ok(())
    }

    pub fn entities(&self) -> &[SensorEntity<D>] {
        &self.entities
    }

    pub fn feed(&self) -> &CompensationFeed<D> {
        &self.feed
    }

    pub fn handler(&self) -> &SharedHandler<D> {
        &self.handler
    }
}

impl Ccs811Station<Ccs811<LinuxI2CDevice>> {
    /// Opens and starts the sensor described by `config`, then
    /// refreshes every entity once.
    pub fn from_config(config: &Ccs811Config) -> Result<Self, SetupError> {
        let address = config.address()?;
        let kinds = config.monitored()?;

        let mut sensor =
            Ccs811::new(&config.i2c_bus, address)?.with_read_timeout(config.read_timeout());
        sensor.begin()?;
        info!(
            "CCS811 started on {} at {:#04x}, monitoring {:?}",
            config.i2c_bus, address, kinds
        );

        let mut station = Ccs811Station::new(
            sensor,
            &config.name,
            &kinds,
            config.temperature_sensor.clone(),
            config.humidity_sensor.clone(),
        );
        station.refresh_all()?;
        Ok(station)
    }
}
