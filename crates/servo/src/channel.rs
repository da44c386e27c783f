use brachio_geom::Angle;
use serde::{Deserialize, Serialize};

use crate::{CalibrationModel, CalibrationTable, Channel, Cubic, ServoDriver, ServoError};

/// How a servo is wired up and calibrated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub channel: Channel,
    /// The servo's angle when the arm is parked, in degrees.
    pub parked_angle: f64,
    /// The pulse-width that puts the servo at `parked_angle`.
    pub parked_pulse_width: f64,
    /// Pulse-width change per degree, for the naive calibration.
    pub degree_us: f64,
    /// Backlash compensation. Ignored if `calibration` has bidirectional
    /// measurements, because then we compute it from those.
    pub hysteresis_correction: f64,
    /// If present, replaces the naive calibration with a fitted one.
    pub calibration: Option<CalibrationTable>,
}

impl Default for ServoConfig {
    fn default() -> Self {
        ServoConfig {
            channel: Channel(14),
            parked_angle: 0.0,
            parked_pulse_width: 1500.0,
            degree_us: 10.0,
            hysteresis_correction: 0.0,
            calibration: None,
        }
    }
}

impl ServoConfig {
    /// The shoulder servo of a standard BrachioGraph.
    pub fn shoulder() -> Self {
        ServoConfig {
            channel: Channel(14),
            parked_angle: -90.0,
            degree_us: -10.0,
            ..Default::default()
        }
    }

    /// The elbow servo of a standard BrachioGraph.
    pub fn elbow() -> Self {
        ServoConfig {
            channel: Channel(15),
            parked_angle: 90.0,
            degree_us: 10.0,
            ..Default::default()
        }
    }
}

/// A pulse-width that we're about to send to a servo.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Command {
    /// The pulse-width from the calibration model.
    pub raw: f64,
    /// The hysteresis correction to add to it.
    pub correction: f64,
    /// The pulse-width to actually send.
    pub pulse_width: f64,
}

/// A single servo, together with everything we know about its calibration
/// and recent history.
#[derive(Clone, Debug)]
pub struct ServoChannel {
    id: Channel,
    model: CalibrationModel,
    parked_angle: Angle,
    hysteresis_correction: f64,
    // The most recent uncorrected pulse-width, used to tell which direction we're moving.
    // Starts at zero, so the first command counts as an increase.
    last_raw: f64,
    active_correction: f64,
}

impl ServoChannel {
    pub fn new(
        id: Channel,
        model: CalibrationModel,
        parked_angle: Angle,
        hysteresis_correction: f64,
    ) -> Self {
        ServoChannel {
            id,
            model,
            parked_angle,
            hysteresis_correction,
            last_raw: 0.0,
            active_correction: 0.0,
        }
    }

    pub fn from_config(config: &ServoConfig) -> Result<Self, ServoError> {
        let parked_angle = Angle::degrees(config.parked_angle);
        let channel = match &config.calibration {
            None => ServoChannel::new(
                config.channel,
                CalibrationModel::naive(
                    config.parked_angle,
                    config.parked_pulse_width,
                    config.degree_us,
                ),
                parked_angle,
                config.hysteresis_correction,
            ),
            Some(CalibrationTable::Samples(samples)) => ServoChannel::new(
                config.channel,
                CalibrationModel::fitted(samples)?,
                parked_angle,
                config.hysteresis_correction,
            ),
            Some(CalibrationTable::Bidirectional(samples)) => {
                let (cubic, correction) = Cubic::fit_bidirectional(samples)?;
                log::debug!(
                    "{}: hysteresis correction {correction:.1}µs from {} samples",
                    config.channel,
                    samples.len()
                );
                ServoChannel::new(
                    config.channel,
                    CalibrationModel::Fitted(cubic),
                    parked_angle,
                    correction,
                )
            }
        };
        Ok(channel)
    }

    pub fn id(&self) -> Channel {
        self.id
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn parked_angle(&self) -> Angle {
        self.parked_angle
    }

    pub fn hysteresis_correction(&self) -> f64 {
        self.hysteresis_correction
    }

    pub fn angle_to_pulse_width(&self, angle: Angle) -> f64 {
        self.model.angle_to_pulse_width(angle)
    }

    /// Works out what to send to the servo to reach `angle`, without sending it.
    ///
    /// When the pulse-width is increasing the correction is added, when it's
    /// decreasing it's subtracted, and when it stays the same we keep whatever
    /// we did last time.
    pub fn prepare(&self, angle: Angle) -> Command {
        let raw = self.model.angle_to_pulse_width(angle);
        let correction = if raw > self.last_raw {
            self.hysteresis_correction
        } else if raw < self.last_raw {
            -self.hysteresis_correction
        } else {
            self.active_correction
        };
        Command {
            raw,
            correction,
            pulse_width: raw + correction,
        }
    }

    /// Records that `command` was sent.
    pub fn commit(&mut self, command: &Command) {
        self.last_raw = command.raw;
        self.active_correction = command.correction;
    }

    /// Sends the servo to `angle`, returning the pulse-width that was sent.
    pub fn command(
        &mut self,
        angle: Angle,
        driver: &mut impl ServoDriver,
    ) -> Result<f64, ServoError> {
        let cmd = self.prepare(angle);
        driver.set_pulse_width(self.id, cmd.pulse_width)?;
        self.commit(&cmd);
        Ok(cmd.pulse_width)
    }
}
