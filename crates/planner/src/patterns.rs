//! Drawing whole pictures: artwork, and patterns for checking calibration.

use brachio_geom::{FromKurbo as _, Point};
use brachio_servo::ServoDriver;
use brachio_sketcher::Artwork;

use crate::{PlotError, Plotter};

// Two points are "the same place" if they agree to the nearest millimeter.
fn same_place(a: Point, b: Point) -> bool {
    (a.x * 10.0).round() == (b.x * 10.0).round() && (a.y * 10.0).round() == (b.y * 10.0).round()
}

impl<D: ServoDriver> Plotter<D> {
    /// Draws a straight line, and optionally draws it again in reverse.
    pub fn draw_line(&mut self, start: Point, end: Point, both: bool) -> Result<(), PlotError> {
        self.xy(start, false)?;
        self.xy(end, true)?;
        if both {
            self.xy(start, true)?;
        }
        Ok(())
    }

    /// Scales `art` into the drawing bounds and draws it, then parks.
    pub fn plot_lines(&mut self, art: &Artwork) -> Result<(), PlotError> {
        self.plot_lines_with_progress(art, |_| {})
    }

    /// Like [`Plotter::plot_lines`], calling `progress` with the number of
    /// polylines finished after each one.
    pub fn plot_lines_with_progress(
        &mut self,
        art: &Artwork,
        mut progress: impl FnMut(usize),
    ) -> Result<(), PlotError> {
        let art = brachio_sketcher::normalize(art, &self.bounds.to_kurbo(), self.flip)?;
        log::info!(
            "plotting {} lines with {} points",
            art.lines.len(),
            art.point_count()
        );

        for (i, line) in art.lines.iter().enumerate() {
            let mut points = line.iter().map(|p| Point::from_kurbo(*p));
            if let Some(start) = points.next() {
                if !same_place(self.position(), start) {
                    self.xy(start, false)?;
                }
                for p in points {
                    self.xy(p, true)?;
                }
            }
            progress(i + 1);
        }

        self.park()
    }

    /// Draws around the edge of the drawing bounds, starting and finishing
    /// at the bottom left corner.
    pub fn box_outline(&mut self, repeat: usize, reverse: bool) -> Result<(), PlotError> {
        let b = self.bounds;
        let corners = if reverse {
            [b.top_left(), b.top_right(), b.bottom_right(), b.bottom_left()]
        } else {
            [b.bottom_right(), b.top_right(), b.top_left(), b.bottom_left()]
        };

        self.xy(b.bottom_left(), false)?;
        for _ in 0..repeat {
            for corner in corners {
                self.xy(corner, true)?;
            }
        }
        self.park()
    }

    /// Draws `lines + 1` evenly spaced vertical lines across the drawing bounds.
    ///
    /// Lines are drawn top-to-bottom, or bottom-to-top if `reverse` is set.
    /// With `both`, each line is also drawn back in the other direction.
    pub fn vertical_lines(
        &mut self,
        lines: usize,
        repeat: usize,
        reverse: bool,
        both: bool,
    ) -> Result<(), PlotError> {
        let b = self.bounds;
        let (from, to) = if reverse {
            (b.bottom, b.top)
        } else {
            (b.top, b.bottom)
        };
        let lines = lines.max(1);
        let step = b.width() / lines as f64;

        for _ in 0..repeat {
            for i in 0..=lines {
                let x = b.left + step * i as f64;
                self.draw_line(Point::new(x, from), Point::new(x, to), both)?;
            }
        }
        self.park()
    }

    /// Draws `lines + 1` evenly spaced horizontal lines, from the top of the
    /// drawing bounds to the bottom.
    ///
    /// Lines are drawn left-to-right, or right-to-left if `reverse` is set.
    pub fn horizontal_lines(
        &mut self,
        lines: usize,
        repeat: usize,
        reverse: bool,
        both: bool,
    ) -> Result<(), PlotError> {
        let b = self.bounds;
        let (from, to) = if reverse {
            (b.right, b.left)
        } else {
            (b.left, b.right)
        };
        let lines = lines.max(1);
        let step = b.height() / lines as f64;

        for _ in 0..repeat {
            for i in 0..=lines {
                let y = b.top - step * i as f64;
                self.draw_line(Point::new(from, y), Point::new(to, y), both)?;
            }
        }
        self.park()
    }

    /// A grid of vertical and then horizontal lines.
    pub fn test_pattern(
        &mut self,
        lines: usize,
        repeat: usize,
        reverse: bool,
        both: bool,
    ) -> Result<(), PlotError> {
        self.vertical_lines(lines, repeat, reverse, both)?;
        self.horizontal_lines(lines, repeat, reverse, both)
    }
}
