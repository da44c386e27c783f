use std::time::Duration;

use brachio_servo::{Channel, ServoDriver, ServoError};

use crate::{PenConfig, PenState};

/// The servo that lifts the pen.
#[derive(Clone, Debug)]
pub struct Pen {
    channel: Channel,
    up: f64,
    down: f64,
    transition: Duration,
}

impl Pen {
    pub fn from_config(config: &PenConfig) -> Self {
        Pen {
            channel: config.channel,
            up: config.up,
            down: config.down,
            transition: Duration::try_from_secs_f64(config.transition_s).unwrap_or_default(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn pulse_width(&self, state: PenState) -> f64 {
        match state {
            PenState::Up => self.up,
            PenState::Down => self.down,
        }
    }

    /// Moves the pen and waits for it to get there.
    pub fn set(&self, state: PenState, driver: &mut impl ServoDriver) -> Result<(), ServoError> {
        driver.set_pulse_width(self.channel, self.pulse_width(state))?;
        driver.pause(self.transition);
        Ok(())
    }

    pub fn transition(&self) -> Duration {
        self.transition
    }
}
