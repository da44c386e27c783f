use core::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{checked_acos, square, Angle, Angles, GeomError, Kinematics, Len, LenExt as _, Point};

/// A shoulder-and-elbow arm.
///
/// The shoulder servo sits at the origin. A shoulder angle of zero points
/// the inner arm straight along the y axis. The elbow angle is the deviation
/// of the outer arm from the line of the inner arm, so an elbow angle of zero
/// means the arm is fully extended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TwoLinkArm {
    /// Length of the arm from the shoulder servo to the elbow servo.
    pub inner_arm: Len,
    /// Length of the arm from the elbow servo to the pen.
    pub outer_arm: Len,
}

impl Default for TwoLinkArm {
    fn default() -> Self {
        Self {
            inner_arm: Len::new(8.0),
            outer_arm: Len::new(8.0),
        }
    }
}

impl TwoLinkArm {
    pub fn new(inner_arm: Len, outer_arm: Len) -> Self {
        Self {
            inner_arm,
            outer_arm,
        }
    }

    /// The closest that the pen can get to the shoulder.
    pub fn min_reach(&self) -> Len {
        (self.inner_arm.get() - self.outer_arm.get()).abs().cm()
    }

    fn unreachable(&self, p: &Point, distance: f64) -> GeomError {
        GeomError::UnreachablePosition {
            x: p.x,
            y: p.y,
            distance,
            min_reach: self.min_reach().get(),
            max_reach: self.max_reach().get(),
        }
    }
}

impl Kinematics for TwoLinkArm {
    fn xy_to_angles(&self, p: &Point) -> Result<Angles, GeomError> {
        let inner = self.inner_arm.get();
        let outer = self.outer_arm.get();
        let hypotenuse = p.x.hypot(p.y);

        // Out-of-range inputs would otherwise turn into NaNs in the acos calls below.
        if hypotenuse > inner + outer || hypotenuse < self.min_reach().get() || hypotenuse == 0.0
        {
            return Err(self.unreachable(p, hypotenuse));
        }

        let hypotenuse_angle = p.x.atan2(p.y);
        let inner_angle = checked_acos(
            (square(hypotenuse) + square(inner) - square(outer)) / (2.0 * hypotenuse * inner),
        )
        .ok_or_else(|| self.unreachable(p, hypotenuse))?;
        let outer_angle =
            checked_acos((square(inner) + square(outer) - square(hypotenuse)) / (2.0 * inner * outer))
                .ok_or_else(|| self.unreachable(p, hypotenuse))?;

        Ok(Angles {
            one: Angle::radians(hypotenuse_angle - inner_angle),
            two: Angle::radians(PI - outer_angle),
        })
    }

    fn angles_to_xy(&self, angles: &Angles) -> Point {
        let inner = self.inner_arm.get();
        let outer = self.outer_arm.get();
        let shoulder = angles.one.radians;
        let outer_direction = shoulder + angles.two.radians;

        let elbow = Point::new(shoulder.sin() * inner, shoulder.cos() * inner);
        Point::new(
            elbow.x + outer_direction.sin() * outer,
            elbow.y + outer_direction.cos() * outer,
        )
    }

    fn max_reach(&self) -> Len {
        self.inner_arm + self.outer_arm
    }
}
