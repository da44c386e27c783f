use serde::{Deserialize, Serialize};

use crate::{checked_acos, square, Angle, Angles, GeomError, Kinematics, Len, LenExt as _, Point};

/// A five-bar pantograph.
///
/// Two servos sit on the x axis. Each turns a driver arm, and the ends of
/// the driver arms (the "elbows") are joined to the pen by two follower arms
/// of equal length. A servo angle of zero points its driver arm straight
/// along the y axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pantograph {
    pub driver: Len,
    pub follower: Len,
    /// Position of the left motor on the x axis.
    pub motor_1_x: Len,
    /// Position of the right motor on the x axis.
    pub motor_2_x: Len,
    /// Set to -1 if the servos are mounted so that their angles run backwards.
    #[serde(default = "default_multiplier")]
    pub angle_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for Pantograph {
    fn default() -> Self {
        Self {
            driver: Len::new(8.0),
            follower: Len::new(8.0),
            motor_1_x: Len::new(-1.5),
            motor_2_x: Len::new(1.5),
            angle_multiplier: 1.0,
        }
    }
}

impl Pantograph {
    fn base(&self) -> Point {
        Point::new((self.motor_1_x.get() + self.motor_2_x.get()) / 2.0, 0.0)
    }

    fn unreachable(&self, p: &Point) -> GeomError {
        GeomError::UnreachablePosition {
            x: p.x,
            y: p.y,
            distance: (*p - self.base()).length(),
            min_reach: 0.0,
            max_reach: self.max_reach().get(),
        }
    }

    // Returns the angle between the line from the motor to `p` and the driver
    // arm, and the angle between that same line and the y axis.
    fn motor_triangle(&self, motor_x: f64, p: &Point) -> Result<(f64, f64), GeomError> {
        let driver = self.driver.get();
        let follower = self.follower.get();
        let dx = motor_x - p.x;
        let d = dx.hypot(p.y);
        if d == 0.0 {
            return Err(self.unreachable(p));
        }

        let inner = checked_acos((square(driver) + square(d) - square(follower)) / (2.0 * driver * d))
            .ok_or_else(|| self.unreachable(p))?;
        let outer = -(dx / d).asin();
        Ok((inner, outer))
    }
}

impl Kinematics for Pantograph {
    fn xy_to_angles(&self, p: &Point) -> Result<Angles, GeomError> {
        let (inner_1, outer_1) = self.motor_triangle(self.motor_1_x.get(), p)?;
        let (inner_2, outer_2) = self.motor_triangle(self.motor_2_x.get(), p)?;

        // The left elbow bends outwards to the left, the right one to the right.
        Ok(Angles {
            one: Angle::radians((outer_1 - inner_1) * self.angle_multiplier),
            two: Angle::radians((outer_2 + inner_2) * self.angle_multiplier),
        })
    }

    fn angles_to_xy(&self, angles: &Angles) -> Point {
        let driver = self.driver.get();
        let follower = self.follower.get();
        let a1 = angles.one.radians / self.angle_multiplier;
        let a2 = angles.two.radians / self.angle_multiplier;

        let elbow_1 = Point::new(self.motor_1_x.get() + a1.sin() * driver, a1.cos() * driver);
        let elbow_2 = Point::new(self.motor_2_x.get() + a2.sin() * driver, a2.cos() * driver);

        // The pen is at the apex of an isosceles triangle whose base joins the elbows.
        let base = elbow_2 - elbow_1;
        let tilt = base.y.atan2(base.x);
        let corner = (base.length() / 2.0 / follower).clamp(-1.0, 1.0).acos();

        Point::new(
            elbow_1.x + (corner + tilt).cos() * follower,
            elbow_1.y + (corner + tilt).sin() * follower,
        )
    }

    fn max_reach(&self) -> Len {
        let half_separation = (self.motor_2_x.get() - self.motor_1_x.get()) / 2.0;
        self.driver + (square(self.follower.get()) - square(half_separation)).max(0.0).sqrt().cm()
    }
}
