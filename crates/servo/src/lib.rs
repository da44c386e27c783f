//! Servos: the hardware boundary, and the calibration that turns an angle
//! into a pulse-width.
//!
//! Pulse-widths are measured in microseconds throughout.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

mod calibration;
mod channel;

pub use calibration::{BidiSample, CalibrationModel, CalibrationTable, Cubic, NaiveModel, Sample};
pub use channel::{Command, ServoChannel, ServoConfig};

/// Identifies a PWM output, e.g. a GPIO pin or a channel on a PWM board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(pub u8);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ServoError {
    #[error("need calibration samples at {required} or more distinct angles, but got {samples} samples")]
    InsufficientCalibrationData { samples: usize, required: usize },
    #[error("pulse-width {pulse_width:.1}µs on {channel} is outside the safe range {min}µs..={max}µs")]
    OutOfSafeRange {
        channel: Channel,
        pulse_width: f64,
        min: f64,
        max: f64,
    },
    #[error("failed to fit calibration curve: {0}")]
    Fit(&'static str),
}

/// The range of pulse-widths that it's safe to send to a servo.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafeBand {
    pub min: f64,
    pub max: f64,
}

impl Default for SafeBand {
    fn default() -> Self {
        SafeBand {
            min: 500.0,
            max: 2500.0,
        }
    }
}

impl SafeBand {
    pub fn check(&self, channel: Channel, pulse_width: f64) -> Result<(), ServoError> {
        if (self.min..=self.max).contains(&pulse_width) {
            Ok(())
        } else {
            Err(ServoError::OutOfSafeRange {
                channel,
                pulse_width,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Something that can send pulses to servos.
///
/// The plotter only talks to servos through this trait, so that it can be
/// run against real hardware or against a [`VirtualDriver`].
pub trait ServoDriver {
    /// Starts sending pulses of the given width on a channel.
    ///
    /// Implementations must refuse pulse-widths outside their [`SafeBand`].
    fn set_pulse_width(&mut self, channel: Channel, pulse_width: f64) -> Result<(), ServoError>;

    /// The pulse-width most recently set on a channel, if it's being driven.
    fn pulse_width(&self, channel: Channel) -> Option<f64>;

    /// Stops driving the given channels, so that the servos stop buzzing.
    fn quiet(&mut self, channels: &[Channel]);

    fn safe_band(&self) -> SafeBand;

    /// Waits to let the servos catch up.
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A driver that doesn't drive anything, but remembers what it was told.
///
/// Pauses are recorded instead of slept through.
#[derive(Clone, Debug, Default)]
pub struct VirtualDriver {
    band: SafeBand,
    pulse_widths: BTreeMap<Channel, f64>,
    commands: usize,
    paused: Duration,
}

impl VirtualDriver {
    pub fn new(band: SafeBand) -> Self {
        VirtualDriver {
            band,
            ..Default::default()
        }
    }

    /// How many pulse-widths have been set in total.
    pub fn command_count(&self) -> usize {
        self.commands
    }

    /// The total time spent in [`ServoDriver::pause`].
    pub fn paused(&self) -> Duration {
        self.paused
    }
}

impl ServoDriver for VirtualDriver {
    fn set_pulse_width(&mut self, channel: Channel, pulse_width: f64) -> Result<(), ServoError> {
        self.band.check(channel, pulse_width)?;
        self.pulse_widths.insert(channel, pulse_width);
        self.commands += 1;
        Ok(())
    }

    fn pulse_width(&self, channel: Channel) -> Option<f64> {
        self.pulse_widths.get(&channel).copied()
    }

    fn quiet(&mut self, channels: &[Channel]) {
        log::info!("going quiet");
        for c in channels {
            self.pulse_widths.remove(c);
        }
    }

    fn safe_band(&self) -> SafeBand {
        self.band
    }

    fn pause(&mut self, duration: Duration) {
        self.paused += duration;
    }
}
