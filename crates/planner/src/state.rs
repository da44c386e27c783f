use std::collections::BTreeSet;

use brachio_geom::{Angles, Point, ServoPair};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenState {
    Up,
    Down,
}

/// The angles and pulse-widths that a servo has visited, rounded to integers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub angles: BTreeSet<i64>,
    pub pulse_widths: BTreeSet<i64>,
}

impl Usage {
    pub(crate) fn record(&mut self, degrees: f64, pulse_width: f64) {
        self.angles.insert(degrees.round() as i64);
        self.pulse_widths.insert(pulse_width.round() as i64);
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty() && self.pulse_widths.is_empty()
    }
}

/// Where the plotter thinks it is.
///
/// There's no feedback from the servos, so this is only ever as accurate as
/// the calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotterState {
    pub position: Point,
    pub angles: Angles,
    pub pen: PenState,
    pub usage: ServoPair<Usage>,
}

impl PlotterState {
    pub(crate) fn new(position: Point, angles: Angles) -> Self {
        PlotterState {
            position,
            angles,
            pen: PenState::Up,
            usage: ServoPair::default(),
        }
    }

    pub fn reset_usage(&mut self) {
        self.usage = ServoPair::default();
    }
}
