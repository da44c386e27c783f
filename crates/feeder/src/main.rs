use std::path::{Path, PathBuf};

use anyhow::Context as _;
use brachio_planner::{Plotter, PlotterConfig};
use brachio_servo::VirtualDriver;
use brachio_sketcher::Artwork;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

mod artwork;
mod drive;

#[derive(Parser)]
struct Args {
    /// Plotter configuration, as JSON. Defaults to a standard BrachioGraph.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Start from the pantograph preset instead of a BrachioGraph.
    #[arg(long, conflicts_with = "config")]
    pantograph: bool,
    /// Seconds per unit of movement, overriding the configuration.
    #[arg(long)]
    wait: Option<f64>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Plot a JSON file of polylines, scaled to fit the drawing bounds.
    Plot { path: PathBuf },
    /// Plot SVG path data, like "M0 0 L10 0 L10 10 Z".
    PlotPath {
        data: String,
        /// How closely to follow curves.
        #[arg(long, default_value_t = 0.1)]
        tolerance: f64,
    },
    /// Draw around the edge of the drawing bounds.
    Box {
        #[arg(long, default_value_t = 1)]
        repeat: usize,
        #[arg(long)]
        reverse: bool,
    },
    /// Draw a grid across the drawing bounds.
    TestPattern {
        #[arg(long, default_value_t = 4)]
        lines: usize,
        #[arg(long, default_value_t = 1)]
        repeat: usize,
        #[arg(long)]
        reverse: bool,
        /// Draw every line in both directions.
        #[arg(long)]
        both: bool,
    },
    /// Show the servo state after parking.
    Report {
        #[arg(long)]
        json: bool,
    },
    /// Move the arm around interactively.
    Drive,
}

#[derive(Debug)]
enum Error {
    Exit,
    Err(anyhow::Error),
}

impl<E> From<E> for Error
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Error::Err(e.into())
    }
}

type Result<T> = std::result::Result<T, Error>;

fn load_config(path: &Path) -> anyhow::Result<PlotterConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn config(args: &Args) -> anyhow::Result<PlotterConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None if args.pantograph => PlotterConfig::pantograph(),
        None => PlotterConfig::default(),
    };
    if let Some(wait) = args.wait {
        log::info!("overriding wait with {wait}s");
        config.with_wait(wait);
    }
    Ok(config)
}

fn plot(plotter: &mut Plotter<VirtualDriver>, art: &Artwork) -> anyhow::Result<()> {
    let bar = ProgressBar::new(art.lines.len() as u64).with_message("lines");
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    plotter.plot_lines_with_progress(art, |done| bar.set_position(done as u64))?;
    bar.finish();
    Ok(())
}

fn execute(plotter: &mut Plotter<VirtualDriver>, cmd: &Cmd) -> Result<()> {
    match cmd {
        Cmd::Plot { path } => plot(plotter, &artwork::load(path)?)?,
        Cmd::PlotPath { data, tolerance } => {
            plot(plotter, &artwork::from_svg_path(data, *tolerance)?)?
        }
        Cmd::Box { repeat, reverse } => plotter.box_outline(*repeat, *reverse)?,
        Cmd::TestPattern {
            lines,
            repeat,
            reverse,
            both,
        } => plotter.test_pattern(*lines, *repeat, *reverse, *both)?,
        Cmd::Report { json } => {
            let report = plotter.report();
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Cmd::Drive => drive::command_mode(plotter)?,
    }
    Ok(())
}

/// Runs `f`, then quiets the servos and prints a summary however `f` finished.
fn run_then_shut_down(
    mut plotter: Plotter<VirtualDriver>,
    f: impl FnOnce(&mut Plotter<VirtualDriver>) -> Result<()>,
) -> (Result<()>, VirtualDriver) {
    let result = f(&mut plotter);

    plotter.quiet();
    let driver = plotter.into_driver();
    eprintln!(
        "sent {} pulse-widths, taking {:.1}s",
        driver.command_count(),
        driver.paused().as_secs_f64()
    );
    (result, driver)
}

fn run(args: &Args) -> Result<()> {
    let config = config(args)?;
    let driver = VirtualDriver::new(config.safe_band);
    let plotter = Plotter::new(&config, driver).context("failed to set up the plotter")?;

    let (result, _) = run_then_shut_down(plotter, |plotter| execute(plotter, &args.cmd));
    result
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) | Err(Error::Exit) => {
            eprintln!("exiting...");
            Ok(())
        }
        Err(Error::Err(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use brachio_servo::{Channel, ServoDriver as _};

    use super::*;

    fn plotter() -> Plotter<VirtualDriver> {
        let mut config = PlotterConfig::default();
        config.with_wait(0.0);
        Plotter::new(&config, VirtualDriver::default()).unwrap()
    }

    #[test]
    fn quiet_after_leaving_drive_mode() {
        let (result, driver) = run_then_shut_down(plotter(), |_| Err(Error::Exit));
        assert!(matches!(result, Err(Error::Exit)));
        for c in [14, 15, 18] {
            assert_eq!(driver.pulse_width(Channel(c)), None);
        }
        assert_eq!(driver.command_count(), 3);
    }

    #[test]
    fn quiet_after_a_failed_command() {
        let cmd = Cmd::Plot {
            path: PathBuf::from("/nonexistent/art.json"),
        };
        let (result, driver) = run_then_shut_down(plotter(), |p| execute(p, &cmd));
        assert!(matches!(result, Err(Error::Err(_))));
        assert_eq!(driver.pulse_width(Channel(14)), None);
    }

    #[test]
    fn box_then_quiet() {
        let cmd = Cmd::Box {
            repeat: 1,
            reverse: false,
        };
        let (result, driver) = run_then_shut_down(plotter(), |p| execute(p, &cmd));
        assert!(result.is_ok());
        assert!(driver.command_count() > 3);
        assert_eq!(driver.pulse_width(Channel(18)), None);
    }
}
