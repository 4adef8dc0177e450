// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Recording sensor used by the unit tests

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use crate::handler::AirQualitySensor;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Environment { humidity: f32, temperature: f32 },
    Eco2,
    Tvoc,
}

#[derive(Debug)]
pub struct MockError;

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt("mock sensor has no sample", f)
    }
}

impl Error for MockError {}

/// Hands out queued (eCO2, tVOC) samples, one per eCO2 fetch,
/// and records every call it receives.
pub struct MockSensor {
    samples: VecDeque<(u16, u16)>,
    current: Option<(u16, u16)>,
    calls: Vec<Call>,
    fail_next: bool,
}

impl MockSensor {
    pub fn new(samples: &[(u16, u16)]) -> Self {
        MockSensor {
            samples: samples.iter().copied().collect(),
            current: None,
            calls: Vec::new(),
            fail_next: false,
        }
    }

    /// Makes the next eCO2 fetch fail without consuming a sample
    pub fn fail_once(mut self) -> Self {
        self.fail_next = true;
        self
    }

    pub fn failing() -> Self {
        MockSensor::new(&[])
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn reads(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Eco2).count()
    }

    pub fn environment_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Environment { .. }))
            .count()
    }
}

impl AirQualitySensor for MockSensor {
    type Error = MockError;

    fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), MockError> {
        self.calls.push(Call::Environment {
            humidity,
            temperature,
        });
        Ok(())
    }

    fn eco2(&mut self) -> Result<u16, MockError> {
        self.calls.push(Call::Eco2);
        if self.fail_next {
            self.fail_next = false;
            return Err(MockError);
        }
        self.current = self.samples.pop_front();
        self.current.map(|(eco2, _)| eco2).ok_or(MockError)
    }

    fn tvoc(&mut self) -> Result<u16, MockError> {
        self.calls.push(Call::Tvoc);
        self.current.map(|(_, tvoc)| tvoc).ok_or(MockError)
    }
}
