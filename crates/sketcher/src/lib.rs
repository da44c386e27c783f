//! Artwork: the polylines that a plotter draws, and the geometry for fitting
//! them into a drawing area.

use kurbo::{BezPath, PathEl, Point, Rect};
use serde::{Deserialize, Serialize};

mod normalize;

pub use normalize::{analyse, normalize, Fit};

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum SketchError {
    #[error("artwork has no extent to scale (width {width}, height {height})")]
    DegenerateArtwork { width: f64, height: f64 },
    #[error("drawing bounds have no area (width {width}, height {height})")]
    DegenerateBounds { width: f64, height: f64 },
}

/// A sequence of polylines, in the order that they should be drawn.
///
/// In files, this is a JSON array of polylines, each of which is an array of
/// `[x, y]` points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<[f64; 2]>>", into = "Vec<Vec<[f64; 2]>>")]
pub struct Artwork {
    pub lines: Vec<Vec<Point>>,
}

impl From<Vec<Vec<[f64; 2]>>> for Artwork {
    fn from(lines: Vec<Vec<[f64; 2]>>) -> Self {
        Artwork {
            lines: lines
                .into_iter()
                .map(|line| line.into_iter().map(|[x, y]| Point::new(x, y)).collect())
                .collect(),
        }
    }
}

impl From<Artwork> for Vec<Vec<[f64; 2]>> {
    fn from(art: Artwork) -> Self {
        art.lines
            .into_iter()
            .map(|line| line.into_iter().map(|p| [p.x, p.y]).collect())
            .collect()
    }
}

impl Artwork {
    pub fn new(lines: Vec<Vec<Point>>) -> Self {
        Artwork { lines }
    }

    /// Flattens a path into polylines, approximating curves to within `tolerance`.
    ///
    /// Every subpath becomes a polyline; closed subpaths end where they started.
    pub fn from_path(path: &BezPath, tolerance: f64) -> Self {
        let mut lines = Vec::new();
        let mut cur_line = Vec::new();
        path.flatten(tolerance, |el| match el {
            PathEl::MoveTo(p) => {
                if !cur_line.is_empty() {
                    lines.push(std::mem::take(&mut cur_line));
                }
                cur_line.push(p);
            }
            PathEl::LineTo(p) => {
                cur_line.push(p);
            }
            PathEl::ClosePath => {
                if let Some(start) = cur_line.first().copied() {
                    cur_line.push(start);
                    lines.push(std::mem::take(&mut cur_line));
                } else {
                    log::warn!("closing empty path");
                }
            }
            // Flattening only produces line segments.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
        });
        if !cur_line.is_empty() {
            lines.push(cur_line);
        }
        Artwork { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.lines.iter().flatten().copied()
    }

    pub fn point_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// The smallest rectangle containing every point, or `None` if there are no points.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json() {
        let art: Artwork = serde_json::from_str("[[[0, 0], [1, 2]], [[3, 4]]]").unwrap();
        assert_eq!(
            art.lines,
            vec![
                vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)],
                vec![Point::new(3.0, 4.0)]
            ]
        );
        assert_eq!(art.point_count(), 3);
        assert_eq!(
            serde_json::to_string(&art).unwrap(),
            "[[[0.0,0.0],[1.0,2.0]],[[3.0,4.0]]]"
        );
    }

    #[test]
    fn bounding_box() {
        let art = Artwork::new(vec![
            vec![Point::new(1.0, 5.0), Point::new(-2.0, 3.0)],
            vec![],
            vec![Point::new(4.0, -1.0)],
        ]);
        assert_eq!(art.bounding_box(), Some(Rect::new(-2.0, -1.0, 4.0, 5.0)));
        assert_eq!(Artwork::default().bounding_box(), None);
        assert!(Artwork::new(vec![vec![]]).is_empty());
    }

    #[test]
    fn flatten_path() {
        let path = BezPath::from_svg("M0 0 L10 0 L10 10 Z M20 20 L30 20").unwrap();
        let art = Artwork::from_path(&path, 0.1);
        assert_eq!(art.lines.len(), 2);
        assert_eq!(
            art.lines[0],
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 0.0)
            ]
        );
        assert_eq!(
            art.lines[1],
            vec![Point::new(20.0, 20.0), Point::new(30.0, 20.0)]
        );
    }

    #[test]
    fn flatten_curve() {
        let path = BezPath::from_svg("M0 0 Q5 10 10 0").unwrap();
        let art = Artwork::from_path(&path, 0.01);
        assert_eq!(art.lines.len(), 1);
        let line = &art.lines[0];
        assert!(line.len() > 3);
        assert_eq!(line[0], Point::new(0.0, 0.0));
        assert_eq!(*line.last().unwrap(), Point::new(10.0, 0.0));
        let bbox = art.bounding_box().unwrap();
        assert!((bbox.y1 - 5.0).abs() < 0.05);
    }
}
