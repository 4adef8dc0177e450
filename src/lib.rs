// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Throttled, environmentally compensated polling of a CCS811 air quality sensor
//!
//! The CCS811 reports equivalent CO2 (eCO2, ppm) and total volatile organic
//! compounds (tVOC, ppb). This crate wraps it in a [`handler::SensorHandler`] that
//!
//! - contacts the sensor at most once every 3 seconds, however often it is asked,
//! - stages externally supplied temperature and humidity and writes both to the
//!   sensor right before a read,
//! - drops the 65535 "not yet valid" eCO2 value, keeping the last good one.
//!
//! One [`entity::SensorEntity`] per monitored measurement shares the handler, and a
//! [`compensation::CompensationFeed`] forwards temperature and humidity updates from
//! external sources. [`station::Ccs811Station`] wires it all together from a
//! [`config::Ccs811Config`].
//!
//! Logging goes through the `log` facade; install any logger to see it.
//!
//! ## Basic Example
//!
//! Polling eCO2 and tVOC with fixed compensation values
//!
//!```no_run
//!use ccs811_i2c::config::Ccs811Config;
//!use ccs811_i2c::station::Ccs811Station;
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    // CCS811_* environment variables, defaults to 0x5A on /dev/i2c-1
//!    let config = Ccs811Config::from_env()?;
//!    let mut station = Ccs811Station::from_config(&config)?;
//!
//!    station.feed().temperature_changed(Some("21.5"));
//!    station.feed().humidity_changed(Some("45"));
//!
//!    loop {
//!        match station.refresh_all() {
//!            Ok(()) => {
//!                for entity in station.entities() {
//!                    println!(
//!                        "{}: {:?} {}",
//!                        entity.name(),
//!                        entity.current_value(),
//!                        entity.unit()
//!                    );
//!                }
//!            }
//!            Err(e) => {
//!                println!("Error reading CCS811: {}. Waiting 10 seconds", e);
//!                thread::sleep(Duration::from_secs(10));
//!            }
//!        }
//!        thread::sleep(Duration::from_secs(3));
//!    }
//!}
//!```
//!

/// Linux I2C adapter for the CCS811 registers
pub mod ccs811;
pub mod compensation;
pub mod config;
pub mod entity;
/// Throttled, compensated reads and sanitized values
pub mod handler;
pub mod station;

#[cfg(test)]
pub(crate) mod testing;
