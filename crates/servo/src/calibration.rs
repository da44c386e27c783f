//! Converting servo angles into pulse-widths.
//!
//! Cheap hobby servos are neither linear nor symmetric, so in addition to the
//! naive linear conversion we support fitting a cubic to measured samples.

use std::collections::BTreeSet;

use brachio_geom::Angle;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::ServoError;

/// A measured pulse-width for a servo angle: `[angle, pulse_width]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Sample {
    /// In degrees.
    pub angle: f64,
    pub pulse_width: f64,
}

impl From<[f64; 2]> for Sample {
    fn from([angle, pulse_width]: [f64; 2]) -> Self {
        Sample { angle, pulse_width }
    }
}

impl From<Sample> for [f64; 2] {
    fn from(s: Sample) -> Self {
        [s.angle, s.pulse_width]
    }
}

/// Pulse-widths for a servo angle, measured once while turning clockwise and
/// once while turning anticlockwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidiSample {
    /// In degrees.
    pub angle: f64,
    pub cw: f64,
    pub acw: f64,
}

/// Calibration measurements, as they appear in configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationTable {
    Samples(Vec<Sample>),
    Bidirectional(Vec<BidiSample>),
}

/// Linear conversion anchored at the parked position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaiveModel {
    /// In degrees.
    pub parked_angle: f64,
    pub parked_pulse_width: f64,
    /// Pulse-width change per degree. Negative if the servo is mounted backwards.
    pub degree_us: f64,
}

/// A cubic polynomial in the angle.
///
/// The polynomial is stored in terms of the angle shifted and scaled to lie
/// in `[-1, 1]` over the sampled range, which keeps the fit well-conditioned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cubic {
    coefficients: [f64; 4],
    center: f64,
    scale: f64,
}

impl Cubic {
    /// The least number of distinct angles that we need samples for.
    pub const MIN_SAMPLES: usize = 2;

    /// Least-squares fit of a cubic to the samples.
    pub fn fit(samples: &[Sample]) -> Result<Cubic, ServoError> {
        let distinct = samples
            .iter()
            .map(|s| s.angle.to_bits())
            .collect::<BTreeSet<_>>()
            .len();
        if distinct < Self::MIN_SAMPLES {
            return Err(ServoError::InsufficientCalibrationData {
                samples: samples.len(),
                required: Self::MIN_SAMPLES,
            });
        }

        let lo = samples.iter().map(|s| s.angle).fold(f64::INFINITY, f64::min);
        let hi = samples.iter().map(|s| s.angle).fold(f64::NEG_INFINITY, f64::max);
        let center = (lo + hi) / 2.0;
        let scale = (hi - lo) / 2.0;

        let vandermonde = DMatrix::from_fn(samples.len(), 4, |row, col| {
            ((samples[row].angle - center) / scale).powi(col as i32)
        });
        let pulse_widths = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.pulse_width));

        // With fewer than four distinct angles the system is underdetermined, and
        // the SVD gives us the minimum-norm solution.
        let solution = vandermonde
            .svd(true, true)
            .solve(&pulse_widths, 1e-10)
            .map_err(ServoError::Fit)?;

        let mut coefficients = [0.0; 4];
        coefficients.copy_from_slice(solution.as_slice());
        Ok(Cubic {
            coefficients,
            center,
            scale,
        })
    }

    /// Fits a cubic to the average of the clockwise and anticlockwise
    /// measurements, and returns it together with the hysteresis correction:
    /// the average of half the difference between anticlockwise and clockwise.
    pub fn fit_bidirectional(samples: &[BidiSample]) -> Result<(Cubic, f64), ServoError> {
        let means: Vec<Sample> = samples
            .iter()
            .map(|s| Sample {
                angle: s.angle,
                pulse_width: (s.cw + s.acw) / 2.0,
            })
            .collect();
        let cubic = Cubic::fit(&means)?;

        let correction =
            samples.iter().map(|s| (s.acw - s.cw) / 2.0).sum::<f64>() / samples.len() as f64;
        Ok((cubic, correction))
    }

    pub fn eval(&self, angle: f64) -> f64 {
        let t = (angle - self.center) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }
}

/// A servo's conversion from angles to pulse-widths.
///
/// This is fixed once the plotter is built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationModel {
    Naive(NaiveModel),
    Fitted(Cubic),
}

impl CalibrationModel {
    pub fn naive(parked_angle: f64, parked_pulse_width: f64, degree_us: f64) -> Self {
        CalibrationModel::Naive(NaiveModel {
            parked_angle,
            parked_pulse_width,
            degree_us,
        })
    }

    pub fn fitted(samples: &[Sample]) -> Result<Self, ServoError> {
        Ok(CalibrationModel::Fitted(Cubic::fit(samples)?))
    }

    pub fn angle_to_pulse_width(&self, angle: Angle) -> f64 {
        let degrees = angle.to_degrees();
        match self {
            CalibrationModel::Naive(m) => {
                (degrees - m.parked_angle) * m.degree_us + m.parked_pulse_width
            }
            CalibrationModel::Fitted(cubic) => cubic.eval(degrees),
        }
    }
}
