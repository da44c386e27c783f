use kurbo::{Point, Rect};

use crate::{Artwork, SketchError};

/// How a piece of artwork should be moved and scaled to fit a drawing area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fit {
    /// Whether to swap x and y, so that a portrait artwork lands in a
    /// landscape area or vice versa.
    pub rotate: bool,
    /// The center of the artwork's bounding box, after any rotation.
    pub artwork_mid: Point,
    /// The center of the drawing area.
    pub bounds_mid: Point,
    /// Every coordinate gets divided by this.
    pub divider: f64,
}

impl Fit {
    pub fn apply(&self, p: Point, flip: bool) -> Point {
        let p = if self.rotate { Point::new(p.y, p.x) } else { p };
        let mut x = (p.x - self.artwork_mid.x) / self.divider;
        let y = (p.y - self.artwork_mid.y) / self.divider;
        if flip ^ self.rotate {
            x = -x;
        }
        Point::new(x + self.bounds_mid.x, y + self.bounds_mid.y)
    }
}

/// Works out how to fit `art` into `bounds`, preserving its aspect ratio.
pub fn analyse(art: &Artwork, bounds: &Rect) -> Result<Fit, SketchError> {
    let bbox = art.bounding_box().ok_or(SketchError::DegenerateArtwork {
        width: 0.0,
        height: 0.0,
    })?;
    let (width, height) = (bbox.width(), bbox.height());
    if width == 0.0 || height == 0.0 {
        return Err(SketchError::DegenerateArtwork { width, height });
    }

    let (box_width, box_height) = (bounds.width(), bounds.height());
    if box_width == 0.0 || box_height == 0.0 {
        return Err(SketchError::DegenerateBounds {
            width: box_width,
            height: box_height,
        });
    }

    let same_orientation = (width >= height && box_width >= box_height)
        || (width <= height && box_width <= box_height);

    let mid = bbox.center();
    let fit = if same_orientation {
        Fit {
            rotate: false,
            artwork_mid: mid,
            bounds_mid: bounds.center(),
            divider: (width / box_width).max(height / box_height),
        }
    } else {
        Fit {
            rotate: true,
            artwork_mid: Point::new(mid.y, mid.x),
            bounds_mid: bounds.center(),
            divider: (width / box_height).max(height / box_width),
        }
    };
    log::debug!("fitting {width:.2}x{height:.2} artwork into {box_width:.2}x{box_height:.2}: {fit:?}");
    Ok(fit)
}

/// Rotates and scales `art` so that it fits in `bounds` as large as possible.
///
/// If `flip` is set, the result is mirrored left-to-right. The result has
/// exactly the same polylines and points as the input, in the same order.
pub fn normalize(art: &Artwork, bounds: &Rect, flip: bool) -> Result<Artwork, SketchError> {
    let fit = analyse(art, bounds)?;
    Ok(Artwork {
        lines: art
            .lines
            .iter()
            .map(|line| line.iter().map(|p| fit.apply(*p, flip)).collect())
            .collect(),
    })
}
