use brachio_geom::{Angle, Point, ServoPair};
use brachio_planner::Plotter;
use brachio_servo::ServoDriver;
use reedline::{DefaultPrompt, Prompt, Reedline, Signal};

use crate::{Error, Result};

/// A line typed at the drive prompt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveCmd {
    /// Travel to a point with the pen up.
    Move(f64, f64),
    /// Draw a line to a point.
    Draw(f64, f64),
    /// Move the servos to these angles, in degrees.
    Angles(f64, f64),
    Up,
    Down,
    Park,
    Report,
    Quiet,
    Quit,
}

fn numbers<const N: usize>(args: &[&str]) -> std::result::Result<[f64; N], String> {
    if args.len() != N {
        return Err(format!("expected {N} numbers, got {}", args.len()));
    }
    let mut ret = [0.0; N];
    for (r, a) in ret.iter_mut().zip(args) {
        *r = a.parse().map_err(|_| format!("expected a number, got {a:?}"))?;
    }
    Ok(ret)
}

pub fn parse(line: &str) -> std::result::Result<DriveCmd, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((cmd, args)) = words.split_first() else {
        return Err("empty command".to_owned());
    };
    let no_args = |c: DriveCmd| {
        if args.is_empty() {
            Ok(c)
        } else {
            Err(format!("{cmd} doesn't take arguments"))
        }
    };
    match *cmd {
        "move" => numbers::<2>(args).map(|[x, y]| DriveCmd::Move(x, y)),
        "draw" => numbers::<2>(args).map(|[x, y]| DriveCmd::Draw(x, y)),
        "angles" => numbers::<2>(args).map(|[a, b]| DriveCmd::Angles(a, b)),
        "up" => no_args(DriveCmd::Up),
        "down" => no_args(DriveCmd::Down),
        "park" => no_args(DriveCmd::Park),
        "report" => no_args(DriveCmd::Report),
        "quiet" => no_args(DriveCmd::Quiet),
        "quit" => no_args(DriveCmd::Quit),
        other => Err(format!("unknown command {other:?}")),
    }
}

fn read_cmd(reed: &mut Reedline, prompt: &dyn Prompt) -> Result<String> {
    let s = reed.read_line(prompt)?;
    match s {
        Signal::Success(s) => Ok(s),
        Signal::CtrlC | Signal::CtrlD => Err(Error::Exit),
    }
}

fn run<D: ServoDriver>(plotter: &mut Plotter<D>, cmd: DriveCmd) -> anyhow::Result<()> {
    match cmd {
        DriveCmd::Move(x, y) => plotter.xy(Point::new(x, y), false)?,
        DriveCmd::Draw(x, y) => plotter.xy(Point::new(x, y), true)?,
        DriveCmd::Angles(a, b) => plotter.move_angles(
            ServoPair::new(Some(Angle::degrees(a)), Some(Angle::degrees(b))),
            false,
        )?,
        DriveCmd::Up => plotter.pen_up()?,
        DriveCmd::Down => plotter.pen_down()?,
        DriveCmd::Park => plotter.park()?,
        DriveCmd::Report => println!("{}", plotter.report()),
        DriveCmd::Quiet => plotter.quiet(),
        DriveCmd::Quit => {}
    }
    Ok(())
}

/// Reads commands from the terminal until `quit`.
pub fn command_mode<D: ServoDriver>(plotter: &mut Plotter<D>) -> Result<()> {
    let mut reed = Reedline::create();
    let prompt = DefaultPrompt::default();
    eprintln!("commands: move x y, draw x y, angles a b, up, down, park, report, quiet, quit");
    loop {
        let s = read_cmd(&mut reed, &prompt)?;
        if s.trim().is_empty() {
            continue;
        }

        let cmd = match parse(&s) {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if cmd == DriveCmd::Quit {
            break;
        }
        if let Err(e) = run(plotter, cmd) {
            eprintln!("error: {e}");
        }
        let p = plotter.position();
        let a = plotter.angles().to_degrees();
        eprintln!(
            "at ({:.2}, {:.2}), angles ({:.1}°, {:.1}°)",
            p.x, p.y, a.one, a.two
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use brachio_planner::PlotterConfig;
    use brachio_servo::VirtualDriver;

    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(parse("move -3 10.5"), Ok(DriveCmd::Move(-3.0, 10.5)));
        assert_eq!(parse("  angles  -90 90 "), Ok(DriveCmd::Angles(-90.0, 90.0)));
        assert_eq!(parse("park"), Ok(DriveCmd::Park));
        assert_eq!(parse("quit"), Ok(DriveCmd::Quit));
        assert!(parse("move 3").is_err());
        assert!(parse("move 3 x").is_err());
        assert!(parse("park now").is_err());
        assert!(parse("fly").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn run_commands() {
        let mut config = PlotterConfig::default();
        config.with_wait(0.0);
        let mut plotter = Plotter::new(&config, VirtualDriver::default()).unwrap();

        run(&mut plotter, DriveCmd::Draw(0.0, 10.0)).unwrap();
        let p = plotter.position();
        assert!(p.x.abs() < 1e-6 && (p.y - 10.0).abs() < 1e-6);

        // Errors are reported, and the plotter stays where it was.
        assert!(run(&mut plotter, DriveCmd::Move(0.0, 30.0)).is_err());
        assert!((plotter.position().y - 10.0).abs() < 1e-6);

        run(&mut plotter, DriveCmd::Park).unwrap();
        let a = plotter.angles().to_degrees();
        assert!((a.one + 90.0).abs() < 1e-6 && (a.two - 90.0).abs() < 1e-6);
    }
}
