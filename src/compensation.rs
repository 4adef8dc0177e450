// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Forwards external temperature and humidity readings to a handler
//!
//! The host delivers state changes of two external value sources;
//! each new state is parsed and staged on the shared handler, which
//! applies both together before its next executed read. Values that
//! do not parse are logged and dropped, leaving the previous value
//! staged.

use log::{debug, error};
use std::error::Error;
use std::fmt;
use std::num::ParseFloatError;
use std::sync::mpsc::Receiver;

use crate::handler::{self, AirQualitySensor, SharedHandler};

/// State the host reports for a source without a known value
pub const STATE_UNKNOWN: &str = "unknown";

/// Lookup of the current state of an external value source
pub trait StateSource {
    fn current_state(&self, source_id: &str) -> Option<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompensationInput {
    Temperature,
    Humidity,
}

impl fmt::Display for CompensationInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompensationInput::Temperature => fmt::Display::fmt("temperature", f),
            CompensationInput::Humidity => fmt::Display::fmt("humidity", f),
        }
    }
}

/// A state change of one source, `None` when the source went away
#[derive(Clone, Debug, PartialEq)]
pub struct CompensationUpdate {
    pub input: CompensationInput,
    pub state: Option<String>,
}

impl CompensationUpdate {
    pub fn temperature<S: Into<String>>(state: S) -> Self {
        CompensationUpdate {
            input: CompensationInput::Temperature,
            state: Some(state.into()),
        }
    }

    pub fn humidity<S: Into<String>>(state: S) -> Self {
        CompensationUpdate {
            input: CompensationInput::Humidity,
            state: Some(state.into()),
        }
    }
}

#[derive(Debug)]
pub enum CompensationError {
    /// State is not a number
    Parse {
        input: CompensationInput,
        value: String,
        source: ParseFloatError,
    },
    /// Handler lock poisoned
    Poisoned,
}

impl fmt::Display for CompensationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompensationError::Parse {
                input,
                value,
                source,
            } => write!(f, "invalid {} '{}': {}", input, value, source),
            CompensationError::Poisoned => fmt::Display::fmt("Sensor handler lock poisoned", f),
        }
    }
}

impl Error for CompensationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompensationError::Parse { source, .. } => Some(source),
            CompensationError::Poisoned => None,
        }
    }
}

pub struct CompensationFeed<D> {
    handler: SharedHandler<D>,
    temperature_source: Option<String>,
    humidity_source: Option<String>,
}

impl<D: AirQualitySensor> CompensationFeed<D> {
    pub fn new(
        handler: SharedHandler<D>,
        temperature_source: Option<String>,
        humidity_source: Option<String>,
    ) -> Self {
        CompensationFeed {
            handler,
            temperature_source,
            humidity_source,
        }
    }

    pub fn temperature_source(&self) -> Option<&str> {
        self.temperature_source.as_deref()
    }

    pub fn humidity_source(&self) -> Option<&str> {
        self.humidity_source.as_deref()
    }

    /// Catches up with the current state of both sources so the
    /// handler does not wait for their next change.
    pub fn start<S: StateSource>(&self, states: &S) {
        let sources = [
            (CompensationInput::Temperature, self.temperature_source.as_deref()),
            (CompensationInput::Humidity, self.humidity_source.as_deref()),
        ];
        for (input, source) in sources {
            let Some(source) = source else { continue };
            match states.current_state(source) {
                Some(state) if state != STATE_UNKNOWN => self.changed(input, Some(state.as_str())),
                _ => debug!("no {} yet from {}", input, source),
            }
        }
    }

    pub fn temperature_changed(&self, new_state: Option<&str>) {
        self.changed(CompensationInput::Temperature, new_state);
    }

    pub fn humidity_changed(&self, new_state: Option<&str>) {
        self.changed(CompensationInput::Humidity, new_state);
    }

    pub fn apply(&self, update: &CompensationUpdate) {
        self.changed(update.input, update.state.as_deref());
    }

    /// Applies updates one at a time until every sender is dropped
    pub fn run(&self, updates: Receiver<CompensationUpdate>) {
        for update in updates {
            self.apply(&update);
        }
        debug!("compensation feed closed");
    }

    fn changed(&self, input: CompensationInput, new_state: Option<&str>) {
        let Some(state) = new_state else { return };
        if let Err(e) = self.forward(input, state) {
            error!("Unable to update from sensor: {}", e);
        }
    }

    /// Parses a raw state and stages it on the handler
    pub fn forward(&self, input: CompensationInput, state: &str) -> Result<(), CompensationError> {
        let value: f32 = state
            .trim()
            .parse()
            .map_err(|source| CompensationError::Parse {
                input,
                value: state.to_string(),
                source,
            })?;
        let mut sensor = handler::lock(&self.handler).map_err(|_| CompensationError::Poisoned)?;
        match input {
            CompensationInput::Temperature => sensor.set_temperature(value),
            CompensationInput::Humidity => sensor.set_humidity(value),
        }
        Ok(())
    }
}
