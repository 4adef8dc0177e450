// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use log::trace;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::entity::MeasurementKind;

/// Minimum time between two reads that actually reach the sensor
pub const MIN_TIME_BETWEEN_UPDATES: Duration = Duration::from_secs(3);

/// Raw eCO2 value the driver reports while no valid sample exists
pub const INVALID_ECO2: u16 = 65535;

/// Hardware side of the handler: anything that can take compensation
/// data and report raw eCO2 and tVOC values.
pub trait AirQualitySensor {
    type Error: Error;

    /// Humidity in %RH and temperature in Celsius, always written together
    fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), Self::Error>;

    /// Raw equivalent CO2 in ppm
    fn eco2(&mut self) -> Result<u16, Self::Error>;

    /// Raw total VOC in ppb
    fn tvoc(&mut self) -> Result<u16, Self::Error>;
}

/// Handler shared by every entity of one physical sensor
pub type SharedHandler<D> = Arc<Mutex<SensorHandler<D>>>;

///
///Error raised when going through a SharedHandler. Driver wraps
///the hardware error of a read, Poisoned when another thread
///panicked while holding the handler.
///
#[derive(Debug)]
pub enum HandlerError<E> {
    Driver(E),
    Poisoned,
}

impl<E> From<E> for HandlerError<E>
where
    E: Error,
{
    fn from(e: E) -> Self {
        HandlerError::Driver(e)
    }
}

impl<E: fmt::Display> fmt::Display for HandlerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HandlerError::Driver(ref e) => write!(f, "sensor read failed: {}", e),
            HandlerError::Poisoned => fmt::Display::fmt("Sensor handler lock poisoned", f),
        }
    }
}

impl<E: Error + 'static> Error for HandlerError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Driver(e) => Some(e),
            HandlerError::Poisoned => None,
        }
    }
}

/// Locks a shared handler, turning a poisoned lock into an error
pub fn lock<D: AirQualitySensor>(
    handler: &SharedHandler<D>,
) -> Result<MutexGuard<'_, SensorHandler<D>>, HandlerError<D::Error>> {
    handler.lock().map_err(|_| HandlerError::Poisoned)
}

/// Owns the sensor driver, stages compensation values and keeps
/// the last sanitized readings.
///
/// Reads are throttled to one per `MIN_TIME_BETWEEN_UPDATES`; a
/// throttled read leaves every cached value untouched.
pub struct SensorHandler<D> {
    driver: D,
    temperature: Option<f32>,
    humidity: Option<f32>,
    eco2: Option<u16>,
    tvoc: Option<u16>,
    last_read: Option<Instant>,
}

impl<D: AirQualitySensor> SensorHandler<D> {
    /// Takes ownership of the driver. No hardware access happens
    /// here, the first `read` always executes.
    pub fn new(driver: D) -> Self {
        SensorHandler {
            driver,
            temperature: None,
            humidity: None,
            eco2: None,
            tvoc: None,
            last_read: None,
        }
    }

    pub fn into_shared(self) -> SharedHandler<D> {
        Arc::new(Mutex::new(self))
    }

    /// Stages a temperature in Celsius for the next executed read
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = Some(temperature);
    }

    /// Stages a relative humidity in % for the next executed read
    pub fn set_humidity(&mut self, humidity: f32) {
        self.humidity = Some(humidity);
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn humidity(&self) -> Option<f32> {
        self.humidity
    }

    /// Last valid eCO2 in ppm, `None` until one was read
    pub fn eco2(&self) -> Option<u16> {
        self.eco2
    }

    /// Last tVOC in ppb, as reported by the driver
    pub fn tvoc(&self) -> Option<u16> {
        self.tvoc
    }

    pub fn value(&self, kind: MeasurementKind) -> Option<u16> {
        match kind {
            MeasurementKind::Eco2 => self.eco2,
            MeasurementKind::Tvoc => self.tvoc,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Reads the sensor unless the last executed read is less than
    /// `MIN_TIME_BETWEEN_UPDATES` ago.
    ///
    /// Returns `Ok(true)` when the sensor was contacted, `Ok(false)`
    /// when the call was throttled.
    pub fn read(&mut self) -> Result<bool, D::Error> {
        self.read_at(Instant::now())
    }

    /// `read` against an explicit clock
    pub fn read_at(&mut self, now: Instant) -> Result<bool, D::Error> {
        if let Some(last) = self.last_read {
            if now.saturating_duration_since(last) < MIN_TIME_BETWEEN_UPDATES {
                trace!("read throttled");
                return Ok(false);
            }
        }
        if let (Some(temperature), Some(humidity)) = (self.temperature, self.humidity) {
            trace!(
                "compensating with {} %RH, {} C",
                humidity,
                temperature
            );
            self.driver.set_environmental_data(humidity, temperature)?;
        }

        let eco2 = self.driver.eco2()?;
        if eco2 != INVALID_ECO2 {
            self.eco2 = Some(eco2);
        }
        // tVOC is taken as reported, including 65535.
        self.tvoc = Some(self.driver.tvoc()?);
        // Only a completed read starts a new interval.
        self.last_read = Some(now);
        Ok(true)
    }
}
