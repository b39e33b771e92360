//! Conversion of a source image into board palette colors

use std::path::Path;

use tracing::{debug, info};

use crate::error::{KeeperError, KeeperResult};
use crate::types::{ColorGrid, ColorId, Grid, PaletteEntry, Rgb};

/// Decode an image file into an RGB grid indexed by (x, y); alpha is dropped
pub fn load(path: &Path) -> KeeperResult<Grid<Rgb>> {
    let decoded = image::open(path).map_err(|source| KeeperError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    info!(path = %path.display(), width, height, "Loaded source image");

    Ok(Grid::from_fn(width as usize, height as usize, |x, y| {
        let [red, green, blue] = rgb.get_pixel(x as u32, y as u32).0;
        Rgb::new(red, green, blue)
    }))
}

/// Closest palette entry by Euclidean distance; ties go to the earliest entry
pub fn nearest_palette_color(rgb: Rgb, palette: &[PaletteEntry]) -> Option<ColorId> {
    let mut best: Option<(u32, ColorId)> = None;
    for entry in palette {
        let distance = rgb.distance_squared(entry.rgb());
        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, entry.id));
        }
    }
    best.map(|(_, id)| id)
}

/// Map every pixel to its nearest palette color, keeping the grid's dimensions
pub fn rasterize(pixels: &Grid<Rgb>, palette: &[PaletteEntry]) -> KeeperResult<ColorGrid> {
    if palette.is_empty() {
        return Err(KeeperError::EmptyPalette);
    }
    let target = Grid::from_fn(pixels.width(), pixels.height(), |x, y| {
        pixels
            .get(x, y)
            .and_then(|rgb| nearest_palette_color(rgb, palette))
            .unwrap_or(palette[0].id)
    });
    debug!(width = target.width(), height = target.height(), colors = palette.len(), "Rasterized target image");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: ColorId, red: u8, green: u8, blue: u8) -> PaletteEntry {
        PaletteEntry { id, red, green, blue }
    }

    fn palette() -> Vec<PaletteEntry> {
        vec![
            entry(1, 236, 240, 241),
            entry(4, 44, 62, 80),
            entry(6, 231, 76, 60),
            entry(13, 0, 152, 255),
        ]
    }

    #[test]
    fn test_exact_match_returns_that_entry() {
        let palette = palette();
        for e in &palette {
            assert_eq!(nearest_palette_color(e.rgb(), &palette), Some(e.id));
        }
    }

    #[test]
    fn test_nearest_picks_minimum_distance() {
        assert_eq!(nearest_palette_color(Rgb::new(255, 255, 255), &palette()), Some(1));
        assert_eq!(nearest_palette_color(Rgb::new(0, 0, 0), &palette()), Some(4));
        assert_eq!(nearest_palette_color(Rgb::new(250, 60, 50), &palette()), Some(6));
    }

    #[test]
    fn test_equidistant_pixel_returns_first_in_palette_order() {
        let forward = vec![entry(7, 0, 0, 0), entry(3, 10, 0, 0)];
        assert_eq!(nearest_palette_color(Rgb::new(5, 0, 0), &forward), Some(7));

        let reversed = vec![entry(3, 10, 0, 0), entry(7, 0, 0, 0)];
        assert_eq!(nearest_palette_color(Rgb::new(5, 0, 0), &reversed), Some(3));
    }

    #[test]
    fn test_empty_palette_has_no_match() {
        assert_eq!(nearest_palette_color(Rgb::new(1, 2, 3), &[]), None);
        let pixels = Grid::from_fn(1, 1, |_, _| Rgb::new(1, 2, 3));
        assert!(matches!(rasterize(&pixels, &[]), Err(KeeperError::EmptyPalette)));
    }

    #[test]
    fn test_rasterize_preserves_dimensions_and_axes() {
        // 3 wide, 2 tall: only (2, 1) is white
        let pixels = Grid::from_fn(3, 2, |x, y| {
            if (x, y) == (2, 1) { Rgb::new(255, 255, 255) } else { Rgb::new(0, 0, 0) }
        });
        let target = rasterize(&pixels, &palette()).unwrap();
        assert_eq!(target.width(), 3);
        assert_eq!(target.height(), 2);
        assert_eq!(target.get(2, 1), Some(1));
        assert_eq!(target.get(1, 1), Some(4));
        assert_eq!(target.get(0, 0), Some(4));
    }

    #[test]
    fn test_load_png_indexes_by_x_y() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.png");
        let mut img = image::RgbaImage::new(2, 3);
        img.put_pixel(1, 2, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let pixels = load(&path).unwrap();
        assert_eq!(pixels.width(), 2);
        assert_eq!(pixels.height(), 3);
        assert_eq!(pixels.get(1, 2), Some(Rgb::new(10, 20, 30)));
        assert_eq!(pixels.get(0, 0), Some(Rgb::new(0, 0, 0)));
    }

    #[test]
    fn test_load_missing_file_is_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, KeeperError::ImageLoad { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_garbage_is_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load(&path), Err(KeeperError::ImageLoad { .. })));
    }
}
