// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::debug;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::handler::{self, AirQualitySensor, HandlerError, SharedHandler};

/// The two measurements a CCS811 produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    /// Equivalent CO2, ppm
    Eco2,
    /// Total volatile organic compounds, ppb
    Tvoc,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 2] = [MeasurementKind::Eco2, MeasurementKind::Tvoc];

    /// Configuration key
    pub const fn key(&self) -> &'static str {
        match self {
            MeasurementKind::Eco2 => "eco2",
            MeasurementKind::Tvoc => "tvoc",
        }
    }

    /// Display label
    pub const fn label(&self) -> &'static str {
        match self {
            MeasurementKind::Eco2 => "eCO2",
            MeasurementKind::Tvoc => "tVOC",
        }
    }

    pub const fn unit(&self) -> &'static str {
        match self {
            MeasurementKind::Eco2 => "ppm",
            MeasurementKind::Tvoc => "ppb",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.label(), f)
    }
}

/// Key that names no known measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMeasurement(pub String);

impl fmt::Display for UnknownMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown measurement '{}', expected eco2 or tvoc", self.0)
    }
}

impl Error for UnknownMeasurement {}

impl FromStr for MeasurementKind {
    type Err = UnknownMeasurement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        MeasurementKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownMeasurement(key.to_string()))
    }
}

/// One published measurement of a sensor. Every entity of the same
/// sensor shares its handler, so they share throttle and compensation.
pub struct SensorEntity<D> {
    handler: SharedHandler<D>,
    kind: MeasurementKind,
    name: String,
    last_value: Option<u16>,
}

impl<D: AirQualitySensor> SensorEntity<D> {
    pub fn new(handler: SharedHandler<D>, kind: MeasurementKind, prefix: &str) -> Self {
        SensorEntity {
            handler,
            kind,
            name: format!("{} {}", prefix, kind.label()),
            last_value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    /// Value from the last `refresh`, `None` before the first one
    pub fn current_value(&self) -> Option<u16> {
        self.last_value
    }

    /// Reads through the handler (possibly throttled) and takes
    /// this entity's value from the handler's cache.
    pub fn refresh(&mut self) -> Result<(), HandlerError<D::Error>> {
        let mut sensor = handler::lock(&self.handler)?;
        sensor.read()?;
        self.last_value = sensor.value(self.kind);
        debug!("{}: {:?} {}", self.name, self.last_value, self.unit());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::SensorHandler;
    use crate::testing::MockSensor;
    use std::sync::Arc;

    #[test]
    fn name_and_unit_per_kind() {
        let handler = SensorHandler::new(MockSensor::new(&[])).into_shared();
        let eco2 = SensorEntity::new(Arc::clone(&handler), MeasurementKind::Eco2, "Office");
        let tvoc = SensorEntity::new(handler, MeasurementKind::Tvoc, "Office");

        assert_eq!(eco2.name(), "Office eCO2");
        assert_eq!(eco2.unit(), "ppm");
        assert_eq!(tvoc.name(), "Office tVOC");
        assert_eq!(tvoc.unit(), "ppb");
        assert_eq!(eco2.current_value(), None);
    }

    #[test]
    fn refresh_takes_value_for_kind() {
        let handler = SensorHandler::new(MockSensor::new(&[(800, 35)])).into_shared();
        let mut entity = SensorEntity::new(handler, MeasurementKind::Eco2, "CCS811 Sensor");

        entity.refresh().unwrap();
        assert_eq!(entity.current_value(), Some(800));
        assert_eq!(entity.unit(), "ppm");
    }

    #[test]
    fn entities_share_one_throttled_read() {
        let handler = SensorHandler::new(MockSensor::new(&[(800, 35), (900, 40)])).into_shared();
        let mut eco2 = SensorEntity::new(Arc::clone(&handler), MeasurementKind::Eco2, "Lab");
        let mut tvoc = SensorEntity::new(Arc::clone(&handler), MeasurementKind::Tvoc, "Lab");

        eco2.refresh().unwrap();
        tvoc.refresh().unwrap();

        assert_eq!(eco2.current_value(), Some(800));
        assert_eq!(tvoc.current_value(), Some(35));
        assert_eq!(handler.lock().unwrap().driver().reads(), 1);
    }

    #[test]
    fn refresh_propagates_driver_failure() {
        let handler = SensorHandler::new(MockSensor::failing()).into_shared();
        let mut entity = SensorEntity::new(handler, MeasurementKind::Tvoc, "Lab");

        assert!(matches!(entity.refresh(), Err(HandlerError::Driver(_))));
        assert_eq!(entity.current_value(), None);
    }

    #[test]
    fn kind_from_config_key() {
        assert_eq!("eco2".parse::<MeasurementKind>(), Ok(MeasurementKind::Eco2));
        assert_eq!(" TVOC ".parse::<MeasurementKind>(), Ok(MeasurementKind::Tvoc));
        assert_eq!(
            "co2".parse::<MeasurementKind>(),
            Err(UnknownMeasurement("co2".to_string()))
        );
        assert_eq!(MeasurementKind::Tvoc.to_string(), "tVOC");
    }
}
