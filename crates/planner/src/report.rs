use std::fmt;

use brachio_geom::{Bounds, Point, ServoPair};
use brachio_servo::Channel;
use serde::Serialize;

use crate::{PenState, Usage};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
    pub mid: f64,
}

impl Span {
    fn of(values: &std::collections::BTreeSet<i64>) -> Option<Span> {
        let min = *values.first()? as f64;
        let max = *values.last()? as f64;
        Some(Span {
            min,
            max,
            mid: (min + max) / 2.0,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServoReport {
    pub channel: Channel,
    /// In degrees.
    pub angle: f64,
    /// What the driver is currently sending, if anything.
    pub pulse_width: Option<f64>,
    pub hysteresis_correction: f64,
    /// Angles visited since the last reset.
    pub angles_used: Option<Span>,
    /// Pulse-widths sent since the last reset.
    pub pulse_widths_used: Option<Span>,
}

impl ServoReport {
    pub(crate) fn new(
        channel: Channel,
        angle: f64,
        pulse_width: Option<f64>,
        hysteresis_correction: f64,
        usage: &Usage,
    ) -> Self {
        ServoReport {
            channel,
            angle,
            pulse_width,
            hysteresis_correction,
            angles_used: Span::of(&usage.angles),
            pulse_widths_used: Span::of(&usage.pulse_widths),
        }
    }
}

/// A snapshot of the plotter, for checking calibration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub position: Point,
    pub pen: PenState,
    pub bounds: Bounds,
    pub servos: ServoPair<ServoReport>,
}

fn opt(f: &mut fmt::Formatter<'_>, value: Option<f64>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{v:>7.0}"),
        None => write!(f, "{:>7}", "-"),
    }
}

fn spans(f: &mut fmt::Formatter<'_>, label: &str, a: Option<Span>, b: Option<Span>) -> fmt::Result {
    write!(f, "{label:>13} ")?;
    for (i, span) in [a, b].into_iter().enumerate() {
        if i == 1 {
            write!(f, " |")?;
        }
        match span {
            Some(s) => write!(f, " {:>5.0} {:>5.0} {:>5.0}", s.min, s.max, s.mid)?,
            None => write!(f, " {:>5} {:>5} {:>5}", "-", "-", "-")?,
        }
    }
    writeln!(f)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (one, two) = (&self.servos.one, &self.servos.two);
        let rule = "              -------------------+-------------------";

        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "              {:<18} | {:<18}",
            format!("servo 1 ({})", one.channel),
            format!("servo 2 ({})", two.channel)
        )?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:>13} {:>18.1} | {:>18.1}",
            "hysteresis", one.hysteresis_correction, two.hysteresis_correction
        )?;
        write!(f, "{:>13} {:>11}", "pulse-width", "")?;
        opt(f, one.pulse_width)?;
        write!(f, " | {:>11}", "")?;
        opt(f, two.pulse_width)?;
        writeln!(f)?;
        writeln!(f, "{:>13} {:>18.0} | {:>18.0}", "angle", one.angle, two.angle)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "{:>13}   min   max   mid |   min   max   mid", "")?;
        writeln!(f, "{rule}")?;
        if one.angles_used.is_none() && two.angles_used.is_none() {
            writeln!(f, "no movements recorded since the last reset")?;
        } else {
            spans(f, "pulse-widths", one.pulse_widths_used, two.pulse_widths_used)?;
            spans(f, "angles", one.angles_used, two.angles_used)?;
        }
        writeln!(f, "{rule}")?;
        let pen = match self.pen {
            PenState::Up => "up",
            PenState::Down => "down",
        };
        writeln!(
            f,
            "pen {pen} at ({:.1}, {:.1}); bounds [{}, {}, {}, {}]",
            self.position.x,
            self.position.y,
            self.bounds.left,
            self.bounds.bottom,
            self.bounds.right,
            self.bounds.top
        )
    }
}
