// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use i2cdev::core::*;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::{debug, trace};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use std::thread;

use crate::handler::AirQualitySensor;

/// Default I2C address of the CCS811 (ADDR pin low)
pub const DEFAULT_ADDRESS: u16 = 0x5A;
/// Default Linux I2C bus device
pub const DEFAULT_BUS: &str = "/dev/i2c-1";
/// Default bound on the wait for the first algorithm result
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

const REG_STATUS: u8 = 0x00;
const REG_MEAS_MODE: u8 = 0x01;
const REG_ALG_RESULT_DATA: u8 = 0x02;
const REG_ENV_DATA: u8 = 0x05;
const REG_HW_ID: u8 = 0x20;
const REG_ERROR_ID: u8 = 0xE0;
const REG_APP_START: u8 = 0xF4;
const REG_SW_RESET: u8 = 0xFF;

const HW_ID: u8 = 0x81;
const SW_RESET_SEQUENCE: [u8; 4] = [0x11, 0xE5, 0x72, 0x8A];
// Drive mode 1: constant power, one measurement every second
const DRIVE_MODE_1SEC: u8 = 0x01;

const BUS_SETTLE: Duration = Duration::from_millis(30);
const RESET_SETTLE: Duration = Duration::from_millis(100);
const DATA_READY_POLL: Duration = Duration::from_millis(50);

///
///CCS811 error enum, wrapping the bus error of the
///underlying I2C device. HardwareId when the chip does
///not identify as a CCS811, InvalidApplication when no
///valid firmware application is loaded, Device when the
///sensor raises its error flag and Timeout when no sample
///shows up in time.
///
#[derive(Debug)]
pub enum Ccs811Error<E> {
    /// Read or write on the I2C bus failed
    Bus(E),
    /// HW_ID register does not hold 0x81
    HardwareId(u8),
    /// STATUS reports no valid application firmware
    InvalidApplication,
    /// STATUS error bit set, carries the ERROR_ID register
    Device(u8),
    /// No algorithm result became ready before the read timeout
    Timeout,
}

///Implementation of display for Ccs811Error
impl<E: fmt::Display> fmt::Display for Ccs811Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Ccs811Error::Bus(ref e) => write!(f, "I2C bus error: {}", e),
            Ccs811Error::HardwareId(id) => write!(f, "unexpected hardware id {:#04x}", id),
            Ccs811Error::InvalidApplication => {
                fmt::Display::fmt("No valid application firmware on device", f)
            }
            Ccs811Error::Device(code) => write!(f, "device reported error {:#04x}", code),
            Ccs811Error::Timeout => fmt::Display::fmt("Timed out waiting for sensor data", f),
        }
    }
}

///Implementation for Error to Ccs811Error
impl<E: Error + 'static> Error for Ccs811Error<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Ccs811Error::Bus(e) => Some(e),
            _ => None,
        }
    }
}

/// Decoded STATUS register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    pub fn error(&self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn data_ready(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn app_valid(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// True once the device left boot mode and runs the application
    pub fn fw_mode(&self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// Encodes humidity (%RH) and temperature (Celsius) for the ENV_DATA register.
///
/// Both values are fixed point with 1/512 resolution, temperature
/// offset by 25 degrees. Out of range inputs saturate.
pub fn encode_environmental_data(humidity: f32, temperature: f32) -> [u8; 4] {
    let humidity = (humidity * 512.0) as u16;
    let temperature = ((temperature + 25.0) * 512.0) as u16;
    let [h_hi, h_lo] = humidity.to_be_bytes();
    let [t_hi, t_lo] = temperature.to_be_bytes();
    [h_hi, h_lo, t_hi, t_lo]
}

/// Splits the first four ALG_RESULT_DATA bytes into raw (eCO2, tVOC)
pub fn decode_algorithm_result(data: &[u8; 4]) -> (u16, u16) {
    (
        u16::from_be_bytes([data[0], data[1]]),
        u16::from_be_bytes([data[2], data[3]]),
    )
}

/// CCS811 Struct, wraps an I2CDevice (LinuxI2CDevice by default)
/// and caches the last algorithm result read from it
///
pub struct Ccs811<T: I2CDevice = LinuxI2CDevice> {
    pub i2cdev: T,
    read_timeout: Duration,
    last_result: Option<(u16, u16)>,
}

impl Ccs811<LinuxI2CDevice> {
    /// Opens the CCS811 on the given bus device and address.
    ///
    /// The device is not touched until `begin` is called.
    pub fn new<P: AsRef<Path>>(bus: P, address: u16) -> Result<Self, LinuxI2CError> {
        let device = LinuxI2CDevice::new(bus, address)?;
        Ok(Ccs811::from_device(device))
    }
}

impl<T> Ccs811<T>
where
    T: I2CDevice,
    T::Error: 'static,
{
    pub fn from_device(i2cdev: T) -> Self {
        Ccs811 {
            i2cdev,
            read_timeout: DEFAULT_READ_TIMEOUT,
            last_result: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Resets the sensor, checks it is a CCS811 with valid firmware,
    /// starts the application and selects one measurement per second.
    pub fn begin(&mut self) -> Result<(), Ccs811Error<T::Error>> {
        self.soft_reset()?;
        self.start()
    }

    /// Post-reset bring up: identity and firmware checks, APP_START
    /// and drive mode selection.
    pub fn start(&mut self) -> Result<(), Ccs811Error<T::Error>> {
        let hw_id = self.read_register::<1>(REG_HW_ID)?[0];
        if hw_id != HW_ID {
            return Err(Ccs811Error::HardwareId(hw_id));
        }

        if !self.status()?.app_valid() {
            return Err(Ccs811Error::InvalidApplication);
        }

        self.write(&[REG_APP_START])?;
        thread::sleep(BUS_SETTLE);
        self.check_error()?;

        self.write(&[REG_MEAS_MODE, DRIVE_MODE_1SEC << 4])?;
        debug!("CCS811 started in 1s drive mode");
        Ok(())
    }

    /// Soft reset the sensor device back to boot mode.
    pub fn soft_reset(&mut self) -> Result<(), Ccs811Error<T::Error>> {
        let mut buffer = [REG_SW_RESET; 5];
        buffer[1..].copy_from_slice(&SW_RESET_SEQUENCE);
        self.write(&buffer)?;
        thread::sleep(RESET_SETTLE);
        self.last_result = None;
        Ok(())
    }

    pub fn status(&mut self) -> Result<Status, Ccs811Error<T::Error>> {
        Ok(Status(self.read_register::<1>(REG_STATUS)?[0]))
    }

    pub fn error_id(&mut self) -> Result<u8, Ccs811Error<T::Error>> {
        Ok(self.read_register::<1>(REG_ERROR_ID)?[0])
    }

    pub fn data_ready(&mut self) -> Result<bool, Ccs811Error<T::Error>> {
        Ok(self.status()?.data_ready())
    }

    /// Writes humidity (%RH) and temperature (Celsius) used by the
    /// sensor to compensate its gas readings.
    pub fn set_environmental_data(
        &mut self,
        humidity: f32,
        temperature: f32,
    ) -> Result<(), Ccs811Error<T::Error>> {
        let mut buffer = [REG_ENV_DATA; 5];
        buffer[1..].copy_from_slice(&encode_environmental_data(humidity, temperature));
        self.write(&buffer)
    }

    /// Raw equivalent CO2 in ppm from the most recent algorithm result
    pub fn eco2(&mut self) -> Result<u16, Ccs811Error<T::Error>> {
        Ok(self.algorithm_result()?.0)
    }

    /// Raw total VOC in ppb from the most recent algorithm result
    pub fn tvoc(&mut self) -> Result<u16, Ccs811Error<T::Error>> {
        Ok(self.algorithm_result()?.1)
    }

    /// Fetches ALG_RESULT_DATA when a new sample is ready. Until the
    /// first sample exists, waits for it up to the read timeout.
    fn algorithm_result(&mut self) -> Result<(u16, u16), Ccs811Error<T::Error>> {
        let started = Instant::now();
        loop {
            let status = self.status()?;
            if status.error() {
                return Err(Ccs811Error::Device(self.error_id()?));
            }
            if status.data_ready() {
                let data = self.read_register::<4>(REG_ALG_RESULT_DATA)?;
                let result = decode_algorithm_result(&data);
                trace!("CCS811 algorithm result {:?}", result);
                self.last_result = Some(result);
                return Ok(result);
            }
            if let Some(result) = self.last_result {
                return Ok(result);
            }
            if started.elapsed() >= self.read_timeout {
                return Err(Ccs811Error::Timeout);
            }
            thread::sleep(DATA_READY_POLL);
        }
    }

    fn check_error(&mut self) -> Result<(), Ccs811Error<T::Error>> {
        if self.status()?.error() {
            return Err(Ccs811Error::Device(self.error_id()?));
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[u8]) -> Result<(), Ccs811Error<T::Error>> {
        self.i2cdev.write(buffer).map_err(Ccs811Error::Bus)
    }

    fn read_register<const N: usize>(
        &mut self,
        register: u8,
    ) -> Result<[u8; N], Ccs811Error<T::Error>> {
        self.write(&[register])?;
        let mut data_buffer = [0u8; N];
        self.i2cdev
            .read(&mut data_buffer)
            .map_err(Ccs811Error::Bus)?;
        Ok(data_buffer)
    }
}

impl<T> AirQualitySensor for Ccs811<T>
where
    T: I2CDevice,
    T::Error: Error + 'static,
{
    type Error = Ccs811Error<T::Error>;

    fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), Self::Error> {
        Ccs811::set_environmental_data(self, humidity, temperature)
    }

    fn eco2(&mut self) -> Result<u16, Self::Error> {
        Ccs811::eco2(self)
    }

    /// Served from the sample fetched by `eco2` so both values of one
    /// read come from the same algorithm result.
    fn tvoc(&mut self) -> Result<u16, Self::Error> {
        match self.last_result {
            Some((_, tvoc)) => Ok(tvoc),
            None => Ccs811::tvoc(self),
        }
    }
}
