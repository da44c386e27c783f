//! Basic geometry of servo-driven drawing arms, including conversion between
//! Cartesian pen positions and servo angles.
//!
//! Two arm topologies are supported. A [`TwoLinkArm`] has a shoulder servo at
//! the origin driving an inner arm, and an elbow servo at the end of the inner
//! arm driving the outer arm that holds the pen. A [`Pantograph`] has two
//! servos side-by-side on the x axis, each driving an arm; the ends of those
//! arms are joined by two follower arms that meet at the pen.
//!
//! Coordinates are in centimeters, with the y axis pointing away from the
//! arm's base. Angles are measured from the positive y axis, positive angles
//! rotating towards positive x.

use serde::{Deserialize, Serialize};

mod error;
mod pantograph;
mod two_link;

pub use error::GeomError;
pub use pantograph::Pantograph;
pub use two_link::TwoLinkArm;

pub type Angle = euclid::Angle<f64>;
pub type Point = euclid::Point2D<f64, Cm>;

pub struct Cm;

pub type Len = euclid::Length<f64, Cm>;

fn square<T: core::ops::Mul<T> + Copy>(x: T) -> <T as core::ops::Mul<T>>::Output {
    x * x
}

// The arguments we feed to `acos` are computed from the law of cosines, and
// at the very edge of the reachable region they can stray outside [-1, 1] by
// a rounding error.
const ACOS_TOLERANCE: f64 = 1e-9;

fn checked_acos(cos: f64) -> Option<f64> {
    if cos.is_nan() || cos.abs() > 1.0 + ACOS_TOLERANCE {
        None
    } else {
        Some(cos.clamp(-1.0, 1.0).acos())
    }
}

pub trait LenExt {
    fn cm(self) -> Len;
}

impl LenExt for f64 {
    fn cm(self) -> Len {
        Len::new(self)
    }
}

pub trait FromKurbo {
    type Input;
    fn from_kurbo(p: Self::Input) -> Self;
}

#[cfg(feature = "kurbo")]
impl FromKurbo for Point {
    type Input = kurbo::Point;
    fn from_kurbo(p: kurbo::Point) -> Self {
        Point::new(p.x, p.y)
    }
}

/// One value for each of the two arm servos.
///
/// For a [`TwoLinkArm`], `one` is the shoulder and `two` is the elbow. For a
/// [`Pantograph`], `one` is the left motor and `two` is the right motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServoPair<T> {
    pub one: T,
    pub two: T,
}

impl<T> ServoPair<T> {
    pub fn new(one: T, two: T) -> Self {
        Self { one, two }
    }

    pub fn map<S>(self, mut f: impl FnMut(T) -> S) -> ServoPair<S> {
        ServoPair {
            one: f(self.one),
            two: f(self.two),
        }
    }

    pub fn as_ref(&self) -> ServoPair<&T> {
        ServoPair {
            one: &self.one,
            two: &self.two,
        }
    }

    pub fn as_mut(&mut self) -> ServoPair<&mut T> {
        ServoPair {
            one: &mut self.one,
            two: &mut self.two,
        }
    }

    pub fn zip<S>(self, other: ServoPair<S>) -> ServoPair<(T, S)> {
        ServoPair {
            one: (self.one, other.one),
            two: (self.two, other.two),
        }
    }
}

/// Angles of the two arm servos.
pub type Angles = ServoPair<Angle>;

impl Angles {
    pub fn from_degrees(one: f64, two: f64) -> Self {
        Self {
            one: Angle::degrees(one),
            two: Angle::degrees(two),
        }
    }

    pub fn to_degrees(self) -> ServoPair<f64> {
        self.map(Angle::to_degrees)
    }
}

/// The rectangular region that the arm is allowed to draw in.
///
/// In configuration files this is written as `[left, bottom, right, top]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl From<[f64; 4]> for Bounds {
    fn from([left, bottom, right, top]: [f64; 4]) -> Self {
        Bounds {
            left,
            bottom,
            right,
            top,
        }
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(b: Bounds) -> Self {
        [b.left, b.bottom, b.right, b.top]
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::new(-8.0, 4.0, 6.0, 13.0)
    }
}

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Bounds {
            left,
            bottom,
            right,
            top,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right, self.top)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }

    pub fn contains(&self, p: &Point) -> bool {
        let (x0, x1) = (self.left.min(self.right), self.left.max(self.right));
        let (y0, y1) = (self.bottom.min(self.top), self.bottom.max(self.top));
        (x0..=x1).contains(&p.x) && (y0..=y1).contains(&p.y)
    }

    #[cfg(feature = "kurbo")]
    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.left, self.bottom, self.right, self.top)
    }
}

/// Conversion between pen positions and servo angles.
pub trait Kinematics {
    /// The servo angles that put the pen at `p`.
    fn xy_to_angles(&self, p: &Point) -> Result<Angles, GeomError>;

    /// The pen position for a pair of servo angles.
    fn angles_to_xy(&self, angles: &Angles) -> Point;

    /// The furthest distance from the arm's base that the pen can reach.
    fn max_reach(&self) -> Len;
}

/// The geometry of a drawing arm, chosen when the plotter is built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Arm {
    TwoLink(TwoLinkArm),
    Pantograph(Pantograph),
}

impl Default for Arm {
    fn default() -> Self {
        Arm::TwoLink(TwoLinkArm::default())
    }
}

impl Kinematics for Arm {
    fn xy_to_angles(&self, p: &Point) -> Result<Angles, GeomError> {
        match self {
            Arm::TwoLink(a) => a.xy_to_angles(p),
            Arm::Pantograph(a) => a.xy_to_angles(p),
        }
    }

    fn angles_to_xy(&self, angles: &Angles) -> Point {
        match self {
            Arm::TwoLink(a) => a.angles_to_xy(angles),
            Arm::Pantograph(a) => a.angles_to_xy(angles),
        }
    }

    fn max_reach(&self) -> Len {
        match self {
            Arm::TwoLink(a) => a.max_reach(),
            Arm::Pantograph(a) => a.max_reach(),
        }
    }
}
