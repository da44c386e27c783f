use brachio_geom::{Arm, Bounds, Len, Pantograph, ServoPair};
use brachio_servo::{Channel, SafeBand, ServoConfig};
use serde::{Deserialize, Serialize};

/// The pen-lifting servo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenConfig {
    pub channel: Channel,
    /// Pulse-width that lifts the pen off the paper.
    pub up: f64,
    /// Pulse-width that puts the pen on the paper.
    pub down: f64,
    /// How long the pen takes to go up or down, in seconds.
    pub transition_s: f64,
}

impl Default for PenConfig {
    fn default() -> Self {
        PenConfig {
            channel: Channel(18),
            up: 1500.0,
            down: 1100.0,
            transition_s: 0.25,
        }
    }
}

/// Everything that describes a particular plotter.
///
/// Missing fields in a configuration file take their values from
/// [`PlotterConfig::default`], which describes a standard BrachioGraph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub arm: Arm,
    pub servos: ServoPair<ServoConfig>,
    pub pen: PenConfig,
    /// The area that artwork gets scaled into.
    pub bounds: Bounds,
    /// Seconds to spend per unit of movement (centimeters or degrees).
    pub wait: f64,
    /// Step size of straight-line moves, in centimeters.
    pub resolution_cm: f64,
    /// Step size of moves in angle space, in degrees.
    pub resolution_degrees: f64,
    /// Pulse-widths that the servos will accept.
    pub safe_band: SafeBand,
    /// Mirror artwork left-to-right when plotting it.
    pub flip: bool,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        PlotterConfig {
            arm: Arm::default(),
            servos: ServoPair::new(ServoConfig::shoulder(), ServoConfig::elbow()),
            pen: PenConfig::default(),
            bounds: Bounds::default(),
            wait: 0.1,
            resolution_cm: 0.1,
            resolution_degrees: 1.0,
            safe_band: SafeBand::default(),
            flip: true,
        }
    }
}

impl PlotterConfig {
    /// A pantograph with its motors 3cm apart, parked with both arms splayed
    /// out at 45 degrees.
    pub fn pantograph() -> Self {
        PlotterConfig {
            arm: Arm::Pantograph(Pantograph::default()),
            servos: ServoPair::new(
                ServoConfig {
                    parked_angle: -45.0,
                    ..ServoConfig::shoulder()
                },
                ServoConfig {
                    parked_angle: 45.0,
                    ..ServoConfig::elbow()
                },
            ),
            bounds: Bounds::new(-3.0, 3.0, 3.0, 6.0),
            ..Default::default()
        }
    }

    pub fn with_arm(&mut self, arm: Arm) -> &mut Self {
        self.arm = arm;
        self
    }

    pub fn with_arm_lengths(&mut self, inner: Len, outer: Len) -> &mut Self {
        self.arm = Arm::TwoLink(brachio_geom::TwoLinkArm::new(inner, outer));
        self
    }

    pub fn with_servos(&mut self, one: ServoConfig, two: ServoConfig) -> &mut Self {
        self.servos = ServoPair::new(one, two);
        self
    }

    pub fn with_bounds(&mut self, bounds: Bounds) -> &mut Self {
        self.bounds = bounds;
        self
    }

    pub fn with_wait(&mut self, wait: f64) -> &mut Self {
        self.wait = wait;
        self
    }

    pub fn with_resolution_cm(&mut self, resolution: f64) -> &mut Self {
        self.resolution_cm = resolution;
        self
    }

    pub fn with_resolution_degrees(&mut self, resolution: f64) -> &mut Self {
        self.resolution_degrees = resolution;
        self
    }

    pub fn with_flip(&mut self, flip: bool) -> &mut Self {
        self.flip = flip;
        self
    }
}
