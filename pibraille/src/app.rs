//! The module for the main loop: sample, decode, emit, sleep.

use crate::config::DeviceConfig;
use crate::decode::{Action, Decoder};
use crate::emit::OutputEmitter;
use crate::hid::HidError;
use crate::sampler::{InputSampler, InputState};
use log::{debug, info, trace, warn};
use pibraille_gpio::GpioError;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Why a tick was abandoned. Neither kind stops the loop.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum TickError {
    #[error("input sampling failed: {0}")]
    Input(#[from] GpioError),
    #[error("keyboard output failed: {0}")]
    Output(#[from] HidError),
}

/// The main app state struct.
pub struct App<'a> {
    /// Which symbol groups are decoded.
    config: DeviceConfig,
    /// Reads the switches.
    sampler: InputSampler<'a>,
    decoder: Decoder,
    /// Sends key taps to the host.
    emitter: OutputEmitter<'a>,
    /// Sleep between ticks.
    idle_interval: Duration,

    last_state: InputState,
}

impl<'a> App<'a> {
    /// Creates a new instance of the App.
    pub fn new(
        config: DeviceConfig,
        sampler: InputSampler<'a>,
        decoder: Decoder,
        emitter: OutputEmitter<'a>,
        idle_interval: Duration,
    ) -> App<'a> {
        App {
            config,
            sampler,
            decoder,
            emitter,
            idle_interval,
            last_state: InputState::default(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Replaces the decode flags; takes effect from the next tick.
    ///
    /// Turning capitalization off also drops a capital sign that is still pending.
    pub fn set_config(&mut self, config: DeviceConfig) {
        info!("Device config changed to {:?}", config);
        if !config.capitalization_enabled {
            self.emitter.clear_capital();
        }
        self.config = config;
    }

    /// Runs one tick: takes a snapshot, decodes it and sends the result.
    ///
    /// Any held keys are released before an output error is returned.
    pub fn tick(&mut self) -> Result<Action, TickError> {
        let state = self.sampler.sample()?;
        if state != self.last_state {
            trace!("Input changed: {}", state);
            self.last_state = state;
        }

        let action = self.decoder.decode(state.shortcut, state.pattern, &self.config);
        if action != Action::NoAction {
            debug!("{} -> {:?}", state, action);
        }

        self.emitter.emit(action)?;
        Ok(action)
    }

    /// Ticks forever. A failed tick is logged and skipped.
    pub fn run(&mut self) -> ! {
        info!("Starting main loop...");
        loop {
            if let Err(err) = self.tick() {
                warn!("Tick aborted: {}", err);
            }

            thread::sleep(self.idle_interval);
        }
    }
}
