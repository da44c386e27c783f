use std::path::Path;

use anyhow::{anyhow, Context as _};
use brachio_sketcher::Artwork;
use kurbo::BezPath;

/// Reads artwork from a JSON file of polylines.
pub fn load(path: &Path) -> anyhow::Result<Artwork> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let art: Artwork = serde_json::from_str(&data)
        .with_context(|| format!("{} is not a list of polylines", path.display()))?;
    if art.is_empty() {
        return Err(anyhow!("{} has no points to draw", path.display()));
    }
    log::debug!(
        "loaded {} lines with {} points from {}",
        art.lines.len(),
        art.point_count(),
        path.display()
    );
    Ok(art)
}

/// Flattens SVG path data (the `d` attribute of a `<path>`) into artwork.
pub fn from_svg_path(data: &str, tolerance: f64) -> anyhow::Result<Artwork> {
    let path = BezPath::from_svg(data).map_err(|e| anyhow!("invalid SVG path data: {e}"))?;
    Ok(Artwork::from_path(&path, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_path() {
        let art = from_svg_path("M0 0 L4 0 L4 3 Z", 0.1).unwrap();
        assert_eq!(art.lines.len(), 1);
        assert_eq!(art.point_count(), 4);
        assert!(from_svg_path("M0 0 L", 0.1).is_err());
    }

    #[test]
    fn missing_file() {
        let err = load(Path::new("/nonexistent/art.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
