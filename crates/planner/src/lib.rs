//! Moving a servo drawing arm around.
//!
//! A [`Plotter`] combines an arm's geometry with the calibration of its
//! servos, and breaks every movement into small steps so that the pen
//! travels in (nearly) straight lines at a controlled pace.

use std::time::Duration;

use brachio_geom::{Angle, Angles, Arm, Bounds, GeomError, Kinematics, Point, ServoPair};
use brachio_servo::{ServoChannel, ServoDriver, ServoError};
use brachio_sketcher::SketchError;

mod config;
mod patterns;
mod pen;
mod report;
mod state;

pub use config::{PenConfig, PlotterConfig};
pub use pen::Pen;
pub use report::{Report, ServoReport, Span};
pub use state::{PenState, PlotterState, Usage};

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum PlotError {
    #[error(transparent)]
    Geom(#[from] GeomError),
    #[error(transparent)]
    Servo(#[from] ServoError),
    #[error(transparent)]
    Sketch(#[from] SketchError),
}

/// How many steps to break a move of length `distance` into.
///
/// Every move takes at least one step, even if it goes nowhere.
pub fn step_count(distance: f64, resolution: f64) -> usize {
    if resolution > 0.0 && distance.is_finite() {
        ((distance / resolution).round() as usize).max(1)
    } else {
        1
    }
}

fn lerp(a: Angle, b: Angle, t: f64) -> Angle {
    Angle::radians(a.radians + (b.radians - a.radians) * t)
}

/// A drawing arm, attached to some servos.
pub struct Plotter<D> {
    arm: Arm,
    servos: ServoPair<ServoChannel>,
    pen: Pen,
    bounds: Bounds,
    wait: f64,
    resolution_cm: f64,
    resolution_degrees: f64,
    flip: bool,
    state: PlotterState,
    driver: D,
}

impl<D: ServoDriver> Plotter<D> {
    /// Sets up the servos and puts the arm in its parked position straight away.
    pub fn new(config: &PlotterConfig, driver: D) -> Result<Self, PlotError> {
        let servos = ServoPair::new(
            ServoChannel::from_config(&config.servos.one)?,
            ServoChannel::from_config(&config.servos.two)?,
        );
        let parked = Angles::new(servos.one.parked_angle(), servos.two.parked_angle());
        let mut plotter = Plotter {
            arm: config.arm,
            servos,
            pen: Pen::from_config(&config.pen),
            bounds: config.bounds,
            wait: config.wait,
            resolution_cm: config.resolution_cm,
            resolution_degrees: config.resolution_degrees,
            flip: config.flip,
            state: PlotterState::new(config.arm.angles_to_xy(&parked), parked),
            driver,
        };

        plotter.pen.set(PenState::Up, &mut plotter.driver)?;
        plotter.set_angles(parked)?;
        log::info!(
            "plotter ready, parked at ({:.1}, {:.1})",
            plotter.state.position.x,
            plotter.state.position.y
        );
        Ok(plotter)
    }

    pub fn state(&self) -> &PlotterState {
        &self.state
    }

    pub fn position(&self) -> Point {
        self.state.position
    }

    pub fn angles(&self) -> Angles {
        self.state.angles
    }

    pub fn arm(&self) -> &Arm {
        &self.arm
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn servos(&self) -> &ServoPair<ServoChannel> {
        &self.servos
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    fn pause_secs(&mut self, seconds: f64) {
        let duration = Duration::try_from_secs_f64(seconds).unwrap_or_default();
        if !duration.is_zero() {
            self.driver.pause(duration);
        }
    }

    /// Commands both servos, or neither if either pulse-width is outside the safe band.
    fn command(&mut self, angles: Angles) -> Result<(), PlotError> {
        let cmds = ServoPair::new(
            self.servos.one.prepare(angles.one),
            self.servos.two.prepare(angles.two),
        );
        let band = self.driver.safe_band();
        band.check(self.servos.one.id(), cmds.one.pulse_width)?;
        band.check(self.servos.two.id(), cmds.two.pulse_width)?;

        // Each servo's history is updated as soon as its pulse-width is sent, so
        // that it stays accurate if the driver then fails on the other one.
        self.driver
            .set_pulse_width(self.servos.one.id(), cmds.one.pulse_width)?;
        self.servos.one.commit(&cmds.one);
        self.state.angles.one = angles.one;
        self.state
            .usage
            .one
            .record(angles.one.to_degrees(), cmds.one.pulse_width);
        self.state.position = self.arm.angles_to_xy(&self.state.angles);

        self.driver
            .set_pulse_width(self.servos.two.id(), cmds.two.pulse_width)?;
        self.servos.two.commit(&cmds.two);
        self.state.angles.two = angles.two;
        self.state
            .usage
            .two
            .record(angles.two.to_degrees(), cmds.two.pulse_width);
        self.state.position = self.arm.angles_to_xy(&self.state.angles);
        Ok(())
    }

    /// Moves both servos to `angles` immediately, without any interpolation or pauses.
    pub fn set_angles(&mut self, angles: Angles) -> Result<(), PlotError> {
        self.command(angles)
    }

    pub fn set_pen(&mut self, state: PenState) -> Result<(), PlotError> {
        if self.state.pen != state {
            self.pen.set(state, &mut self.driver)?;
            self.state.pen = state;
        }
        Ok(())
    }

    pub fn pen_up(&mut self) -> Result<(), PlotError> {
        self.set_pen(PenState::Up)
    }

    pub fn pen_down(&mut self) -> Result<(), PlotError> {
        self.set_pen(PenState::Down)
    }

    fn set_pen_for(&mut self, draw: bool) -> Result<(), PlotError> {
        self.set_pen(if draw { PenState::Down } else { PenState::Up })
    }

    /// Moves the servos to `target`, interpolating in angle space.
    ///
    /// A `None` target leaves that servo where it is. `resolution` is the
    /// step size in degrees, and `wait` is the number of seconds to spend per
    /// degree of movement.
    pub fn move_angles_paced(
        &mut self,
        target: ServoPair<Option<Angle>>,
        resolution: f64,
        wait: f64,
        draw: bool,
    ) -> Result<(), PlotError> {
        let start = self.state.angles;
        let end = Angles::new(
            target.one.unwrap_or(start.one),
            target.two.unwrap_or(start.two),
        );
        let distance = (end.one - start.one)
            .to_degrees()
            .hypot((end.two - start.two).to_degrees());
        let steps = step_count(distance, resolution);

        self.set_pen_for(draw)?;
        log::debug!(
            "moving to {:.1}°, {:.1}° in {steps} steps",
            end.one.to_degrees(),
            end.two.to_degrees()
        );

        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let angles = if i == steps {
                end
            } else {
                Angles::new(lerp(start.one, end.one, t), lerp(start.two, end.two, t))
            };
            if let Err(e) = self.command(angles) {
                log::warn!("move aborted at step {i} of {steps}: {e}");
                return Err(e);
            }
            if i < steps {
                self.pause_secs(distance * wait / steps as f64);
            }
        }
        self.pause_secs(distance * wait / 10.0);
        Ok(())
    }

    /// Like [`Plotter::move_angles_paced`], with the configured resolution and pace.
    pub fn move_angles(
        &mut self,
        target: ServoPair<Option<Angle>>,
        draw: bool,
    ) -> Result<(), PlotError> {
        self.move_angles_paced(target, self.resolution_degrees, self.wait, draw)
    }

    /// Moves the pen to `target` in a straight line.
    ///
    /// `resolution` is the step size in centimeters, and `wait` is the
    /// number of seconds to spend per centimeter of movement.
    pub fn xy_paced(
        &mut self,
        target: Point,
        resolution: f64,
        wait: f64,
        draw: bool,
    ) -> Result<(), PlotError> {
        // Don't start moving towards somewhere we can't get to.
        self.arm.xy_to_angles(&target)?;

        let start = self.state.position;
        let distance = (target - start).length();
        let steps = step_count(distance, resolution);

        self.set_pen_for(draw)?;
        log::debug!(
            "moving to ({:.2}, {:.2}) in {steps} steps",
            target.x,
            target.y
        );

        for i in 1..=steps {
            let p = if i == steps {
                target
            } else {
                start.lerp(target, i as f64 / steps as f64)
            };
            let result = self
                .arm
                .xy_to_angles(&p)
                .map_err(PlotError::from)
                .and_then(|angles| self.command(angles));
            if let Err(e) = result {
                log::warn!("move aborted at step {i} of {steps}: {e}");
                return Err(e);
            }
            if i < steps {
                self.pause_secs(distance * wait / steps as f64);
            }
        }
        self.pause_secs(distance * wait / 10.0);
        Ok(())
    }

    /// Like [`Plotter::xy_paced`], with the configured resolution and pace.
    pub fn xy(&mut self, target: Point, draw: bool) -> Result<(), PlotError> {
        self.xy_paced(target, self.resolution_cm, self.wait, draw)
    }

    /// Lifts the pen and returns the arm to its parked position.
    pub fn park(&mut self) -> Result<(), PlotError> {
        log::info!("parking");
        self.pen_up()?;
        let target = ServoPair::new(
            Some(self.servos.one.parked_angle()),
            Some(self.servos.two.parked_angle()),
        );
        self.move_angles(target, false)
    }

    /// Stops driving all the servos, so that they stop buzzing.
    pub fn quiet(&mut self) {
        self.driver.quiet(&[
            self.servos.one.id(),
            self.servos.two.id(),
            self.pen.channel(),
        ]);
    }

    pub fn report(&self) -> Report {
        let servo = |channel: &ServoChannel, angle: Angle, usage: &Usage| {
            ServoReport::new(
                channel.id(),
                angle.to_degrees(),
                self.driver.pulse_width(channel.id()),
                channel.hysteresis_correction(),
                usage,
            )
        };
        Report {
            position: self.state.position,
            pen: self.state.pen,
            bounds: self.bounds,
            servos: ServoPair::new(
                servo(&self.servos.one, self.state.angles.one, &self.state.usage.one),
                servo(&self.servos.two, self.state.angles.two, &self.state.usage.two),
            ),
        }
    }

    /// Forgets which angles and pulse-widths have been used.
    pub fn reset_report(&mut self) {
        self.state.reset_usage();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use brachio_servo::{BidiSample, CalibrationTable, Channel, SafeBand, ServoConfig, VirtualDriver};

    use super::*;

    /// A driver that remembers every pulse-width it was asked to send.
    #[derive(Default)]
    pub struct Recorder {
        pub inner: VirtualDriver,
        pub log: Vec<(Channel, f64)>,
    }

    impl Recorder {
        pub fn channel_log(&self, channel: Channel) -> Vec<f64> {
            self.log
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, pw)| *pw)
                .collect()
        }
    }

    impl ServoDriver for Recorder {
        fn set_pulse_width(&mut self, channel: Channel, pulse_width: f64) -> Result<(), ServoError> {
            self.inner.set_pulse_width(channel, pulse_width)?;
            self.log.push((channel, pulse_width));
            Ok(())
        }

        fn pulse_width(&self, channel: Channel) -> Option<f64> {
            self.inner.pulse_width(channel)
        }

        fn quiet(&mut self, channels: &[Channel]) {
            self.inner.quiet(channels)
        }

        fn safe_band(&self) -> SafeBand {
            self.inner.safe_band()
        }

        fn pause(&mut self, duration: Duration) {
            self.inner.pause(duration)
        }
    }

    pub fn fast_config() -> PlotterConfig {
        let mut config = PlotterConfig::default();
        config.with_wait(0.0);
        config
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn step_counts() {
        assert_eq!(step_count(0.0, 1.0), 1);
        assert_eq!(step_count(0.4, 1.0), 1);
        assert_eq!(step_count(2.6, 1.0), 3);
        assert_eq!(step_count(10.0, 0.1), 100);
        assert_eq!(step_count(10.0, 0.0), 1);
    }

    #[test]
    fn starts_parked() {
        let plotter = Plotter::new(&fast_config(), VirtualDriver::default()).unwrap();
        let p = plotter.position();
        assert_close(p.x, -8.0);
        assert_close(p.y, 8.0);
        assert_eq!(plotter.state().pen, PenState::Up);

        let driver = plotter.driver();
        assert_eq!(driver.pulse_width(Channel(14)), Some(1500.0));
        assert_eq!(driver.pulse_width(Channel(15)), Some(1500.0));
        assert_eq!(driver.pulse_width(Channel(18)), Some(1500.0));
        assert_eq!(driver.command_count(), 3);
        assert_eq!(driver.paused(), Duration::from_millis(250));
    }

    #[test]
    fn xy_steps_and_pauses() {
        let mut config = PlotterConfig::default();
        config.with_wait(1.0).with_resolution_cm(1.0);
        let mut plotter = Plotter::new(&config, VirtualDriver::default()).unwrap();
        plotter.xy(Point::new(-8.0, 11.0), false).unwrap();

        let p = plotter.position();
        assert_close(p.x, -8.0);
        assert_close(p.y, 11.0);

        let driver = plotter.driver();
        // Three for parking, then two servos for each of three steps.
        assert_eq!(driver.command_count(), 9);
        // The pen transition, two steps of a second each, and 0.3s to settle.
        assert_close(driver.paused().as_secs_f64(), 0.25 + 2.0 + 0.3);
    }

    #[test]
    fn zero_length_move_takes_one_step() {
        let mut plotter = Plotter::new(&fast_config(), VirtualDriver::default()).unwrap();
        let here = plotter.position();
        plotter.xy(here, false).unwrap();
        assert_eq!(plotter.driver().command_count(), 5);

        plotter
            .move_angles(ServoPair::new(None, None), false)
            .unwrap();
        assert_eq!(plotter.driver().command_count(), 7);
    }

    #[test]
    fn move_angles_interpolates() {
        let mut plotter = Plotter::new(&fast_config(), Recorder::default()).unwrap();
        plotter
            .move_angles_paced(
                ServoPair::new(Some(Angle::degrees(-80.0)), None),
                2.0,
                0.0,
                false,
            )
            .unwrap();
        // Five steps of two degrees, each a 20µs decrease on the shoulder.
        let shoulder = plotter.driver().channel_log(Channel(14));
        assert_eq!(shoulder.len(), 6);
        for (pw, expected) in shoulder.iter().zip([1500.0, 1480.0, 1460.0, 1440.0, 1420.0, 1400.0]) {
            assert_close(*pw, expected);
        }
        // The elbow gets told to stay put.
        assert!(plotter
            .driver()
            .channel_log(Channel(15))
            .iter()
            .all(|pw| (pw - 1500.0).abs() < 1e-9));
        assert_close(plotter.angles().one.to_degrees(), -80.0);
        assert_close(plotter.angles().two.to_degrees(), 90.0);
    }

    #[test]
    fn unsafe_move_stops_at_last_good_step() {
        let band = SafeBand {
            min: 1000.0,
            max: 2005.0,
        };
        let mut plotter = Plotter::new(&fast_config(), VirtualDriver::new(band)).unwrap();
        let err = plotter
            .move_angles(ServoPair::new(Some(Angle::degrees(-160.0)), None), false)
            .unwrap_err();
        let PlotError::Servo(ServoError::OutOfSafeRange {
            channel,
            pulse_width,
            ..
        }) = err
        else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(channel, Channel(14));
        assert_close(pulse_width, 2010.0);

        assert_close(plotter.angles().one.to_degrees(), -140.0);
        assert_close(plotter.angles().two.to_degrees(), 90.0);
        assert_close(plotter.driver().pulse_width(Channel(14)).unwrap(), 2000.0);
    }

    #[test]
    fn unreachable_target_does_not_move() {
        let mut plotter = Plotter::new(&fast_config(), VirtualDriver::default()).unwrap();
        let err = plotter.xy(Point::new(0.0, 20.0), true).unwrap_err();
        assert!(matches!(err, PlotError::Geom(GeomError::UnreachablePosition { .. })));
        assert_eq!(plotter.driver().command_count(), 3);
        assert_eq!(plotter.state().pen, PenState::Up);
    }

    #[test]
    fn hysteresis_through_the_planner() {
        let mut config = fast_config();
        config.servos.one.hysteresis_correction = 5.0;
        let mut plotter = Plotter::new(&config, Recorder::default()).unwrap();
        plotter
            .set_angles(Angles::from_degrees(-80.0, 90.0))
            .unwrap();
        plotter
            .set_angles(Angles::from_degrees(-85.0, 90.0))
            .unwrap();
        plotter
            .set_angles(Angles::from_degrees(-85.0, 90.0))
            .unwrap();
        let shoulder = plotter.driver().channel_log(Channel(14));
        assert_eq!(shoulder.len(), 4);
        // Parking is the first command, which counts as an increase.
        assert_close(shoulder[0], 1505.0);
        assert_close(shoulder[1], 1395.0);
        assert_close(shoulder[2], 1455.0);
        assert_close(shoulder[3], 1455.0);
    }

    /// A driver that can't move the elbow past a limit of its own, even though
    /// the safe band allows it.
    struct StiffElbow {
        inner: VirtualDriver,
        limit: f64,
    }

    impl ServoDriver for StiffElbow {
        fn set_pulse_width(&mut self, channel: Channel, pulse_width: f64) -> Result<(), ServoError> {
            if channel == Channel(15) && pulse_width > self.limit {
                return Err(ServoError::OutOfSafeRange {
                    channel,
                    pulse_width,
                    min: 500.0,
                    max: self.limit,
                });
            }
            self.inner.set_pulse_width(channel, pulse_width)
        }

        fn pulse_width(&self, channel: Channel) -> Option<f64> {
            self.inner.pulse_width(channel)
        }

        fn quiet(&mut self, channels: &[Channel]) {
            self.inner.quiet(channels)
        }

        fn safe_band(&self) -> SafeBand {
            self.inner.safe_band()
        }

        fn pause(&mut self, duration: Duration) {
            self.inner.pause(duration)
        }
    }

    #[test]
    fn driver_failure_keeps_the_servo_that_moved() {
        let mut config = fast_config();
        config.servos.one.hysteresis_correction = 5.0;
        let driver = StiffElbow {
            inner: VirtualDriver::default(),
            limit: 1600.0,
        };
        let mut plotter = Plotter::new(&config, driver).unwrap();

        let err = plotter
            .set_angles(Angles::from_degrees(-80.0, 110.0))
            .unwrap_err();
        assert!(matches!(err, PlotError::Servo(ServoError::OutOfSafeRange { .. })));

        // The shoulder was sent 1400 - 5, and the elbow stayed parked.
        assert_close(plotter.driver().pulse_width(Channel(14)).unwrap(), 1395.0);
        assert_close(plotter.angles().one.to_degrees(), -80.0);
        assert_close(plotter.angles().two.to_degrees(), 90.0);
        let expected = plotter.arm().angles_to_xy(&Angles::from_degrees(-80.0, 90.0));
        assert_close(plotter.position().x, expected.x);
        assert_close(plotter.position().y, expected.y);
        assert!(plotter.state().usage.one.angles.contains(&-80));
        assert!(!plotter.state().usage.two.angles.contains(&110));

        // 1450 is an increase from the 1400 that was sent, not a decrease from 1500.
        plotter
            .set_angles(Angles::from_degrees(-85.0, 90.0))
            .unwrap();
        assert_close(plotter.driver().pulse_width(Channel(14)).unwrap(), 1455.0);
    }

    #[test]
    fn bidirectional_calibration() {
        let bidi = |rows: &[(f64, f64, f64)]| {
            Some(CalibrationTable::Bidirectional(
                rows.iter()
                    .map(|&(angle, cw, acw)| BidiSample { angle, cw, acw })
                    .collect(),
            ))
        };
        let mut config = fast_config();
        config.with_servos(
            ServoConfig {
                calibration: bidi(&[
                    (-135.0, 2374.0, 2386.0),
                    (-120.0, 2204.0, 2214.0),
                    (-105.0, 2042.0, 2054.0),
                    (-90.0, 1898.0, 1900.0),
                    (-75.0, 1730.0, 1750.0),
                    (-60.0, 1604.0, 1612.0),
                    (-45.0, 1466.0, 1476.0),
                    (-30.0, 1330.0, 1340.0),
                    (-15.0, 1188.0, 1200.0),
                    (0.0, 1048.0, 1060.0),
                    (15.0, 904.0, 910.0),
                    (30.0, 750.0, 766.0),
                ]),
                ..ServoConfig::shoulder()
            },
            ServoConfig {
                calibration: bidi(&[
                    (15.0, 783.0, 761.0),
                    (30.0, 917.0, 901.0),
                    (45.0, 1053.0, 1035.0),
                    (60.0, 1183.0, 1167.0),
                    (75.0, 1303.0, 1287.0),
                    (90.0, 1427.0, 1417.0),
                    (105.0, 1557.0, 1537.0),
                    (120.0, 1697.0, 1681.0),
                    (135.0, 1843.0, 1827.0),
                    (150.0, 2003.0, 1987.0),
                ]),
                ..ServoConfig::elbow()
            },
        );
        let plotter = Plotter::new(&config, VirtualDriver::default()).unwrap();
        let report = plotter.report();
        let pw = |r: &ServoReport| r.pulse_width.unwrap();
        // The fitted pulse-widths at the parked angles (1894.35 and 1421.17),
        // corrected as increases since parking is the first command.
        assert!((pw(&report.servos.one) - 1899.77).abs() < 0.05);
        assert!((pw(&report.servos.two) - 1412.87).abs() < 0.05);
        assert_close(report.servos.one.hysteresis_correction, 65.0 / 12.0);
        assert_close(report.servos.two.hysteresis_correction, -8.3);
    }

    #[test]
    fn pantograph_parks() {
        let mut config = PlotterConfig::pantograph();
        config.with_wait(0.0);
        let mut plotter = Plotter::new(&config, VirtualDriver::default()).unwrap();
        let parked = plotter.position();
        assert_close(parked.x, 0.0);

        let b = plotter.bounds();
        plotter.xy(b.top_left(), false).unwrap();
        let p = plotter.position();
        assert_close(p.x, b.left);
        assert_close(p.y, b.top);

        plotter.park().unwrap();
        let p = plotter.position();
        assert_close(p.x, parked.x);
        assert_close(p.y, parked.y);
    }

    #[test]
    fn report_and_reset() {
        let mut plotter = Plotter::new(&fast_config(), VirtualDriver::default()).unwrap();
        plotter
            .move_angles(ServoPair::new(Some(Angle::degrees(-60.0)), None), true)
            .unwrap();
        let report = plotter.report();
        assert_eq!(report.pen, PenState::Down);
        let angles = report.servos.one.angles_used.unwrap();
        assert_eq!((angles.min, angles.max, angles.mid), (-90.0, -60.0, -75.0));
        let pws = report.servos.one.pulse_widths_used.unwrap();
        assert_eq!((pws.min, pws.max), (1200.0, 1500.0));
        assert_close(report.servos.one.pulse_width.unwrap(), 1200.0);

        let table = report.to_string();
        assert!(table.contains("pulse-widths"));
        assert!(table.contains("pen down"));

        plotter.reset_report();
        let report = plotter.report();
        assert_eq!(report.servos.one.angles_used, None);
        assert!(report.to_string().contains("no movements recorded"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pen"], "down");
        assert_eq!(json["servos"]["one"]["channel"], 14);
    }

    #[test]
    fn quiet_stops_all_channels() {
        let mut plotter = Plotter::new(&fast_config(), VirtualDriver::default()).unwrap();
        plotter.quiet();
        let driver = plotter.into_driver();
        for c in [14, 15, 18] {
            assert_eq!(driver.pulse_width(Channel(c)), None);
        }
    }
}
