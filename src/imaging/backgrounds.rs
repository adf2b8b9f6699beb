//! Background selection: an ordered chain of background providers.
//!
//! A random photo from the background directory comes first, a solid canvas
//! second. The solid canvas cannot fail, so a render always has a background.

use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, Rgb, RgbImage};
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extensions accepted as background photos, paired with the decoder they need.
const BACKGROUND_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    BACKGROUND_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Background file extensions that have a decoder compiled in.
pub fn supported_background_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

fn is_background_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                supported_background_extensions()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(e))
            })
}

/// Background photos in `dir`, sorted. Empty when the directory is missing.
pub fn list_background_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_background_file(p))
        .collect();
    files.sort();
    files
}

/// One step in the background fallback chain.
pub trait BackgroundProvider {
    /// Produce a `size`×`size` canvas, or `None` to defer to the next provider.
    fn load(&self, size: u32) -> Option<RgbImage>;

    fn describe(&self) -> String;
}

/// A random photo from a directory, filled and center-cropped to the canvas.
pub struct RandomPhoto {
    pub dir: PathBuf,
}

impl BackgroundProvider for RandomPhoto {
    fn load(&self, size: u32) -> Option<RgbImage> {
        let files = list_background_files(&self.dir);
        let chosen = files.choose(&mut rand::rng())?;
        let decoded = ImageReader::open(chosen)
            .map_err(|e| e.to_string())
            .and_then(|r| r.with_guessed_format().map_err(|e| e.to_string()))
            .and_then(|r| r.decode().map_err(|e| e.to_string()));
        match decoded {
            Ok(img) => {
                tracing::debug!(background = %chosen.display(), "background selected");
                Some(img.resize_to_fill(size, size, FilterType::Lanczos3).to_rgb8())
            }
            Err(e) => {
                tracing::warn!(background = %chosen.display(), error = %e, "background failed to decode");
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("random photo from {}", self.dir.display())
    }
}

/// A plain canvas of one color.
pub struct SolidColor(pub Rgb<u8>);

impl BackgroundProvider for SolidColor {
    fn load(&self, size: u32) -> Option<RgbImage> {
        Some(RgbImage::from_pixel(size, size, self.0))
    }

    fn describe(&self) -> String {
        let [r, g, b] = self.0.0;
        format!("solid color ({r}, {g}, {b})")
    }
}

pub fn background_chain(dir: &Path, fallback: Rgb<u8>) -> Vec<Box<dyn BackgroundProvider>> {
    vec![
        Box::new(RandomPhoto {
            dir: dir.to_path_buf(),
        }),
        Box::new(SolidColor(fallback)),
    ]
}

/// Walk the chain; the first provider that produces a canvas wins.
pub fn compose_background(chain: &[Box<dyn BackgroundProvider>], size: u32) -> RgbImage {
    chain
        .iter()
        .find_map(|provider| provider.load(size))
        .unwrap_or_else(|| RgbImage::new(size, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
        RgbImage::from_pixel(width, height, Rgb(color))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn supported_extensions_cover_common_photos() {
        let exts = supported_background_extensions();
        for expected in ["jpg", "jpeg", "png"] {
            assert!(exts.contains(&expected), "expected {expected}");
        }
    }

    #[test]
    fn listing_filters_non_images() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_png(&tmp.path().join("b.png"), 4, 4, [1, 2, 3]);
        write_png(&tmp.path().join("a.PNG"), 4, 4, [1, 2, 3]);
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("nested.jpg")).unwrap();

        let files = list_background_files(tmp.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png"]);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        assert!(list_background_files(Path::new("/nonexistent/backgrounds")).is_empty());
    }

    #[test]
    fn empty_directory_falls_back_to_solid_color() {
        let tmp = tempfile::TempDir::new().unwrap();
        let chain = background_chain(tmp.path(), Rgb([255, 165, 0]));
        let canvas = compose_background(&chain, 32);
        assert_eq!(canvas.dimensions(), (32, 32));
        assert!(canvas.pixels().all(|p| p.0 == [255, 165, 0]));
    }

    #[test]
    fn photo_is_filled_to_square() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_png(&tmp.path().join("wide.png"), 40, 20, [10, 200, 30]);

        let chain = background_chain(tmp.path(), Rgb([255, 165, 0]));
        let canvas = compose_background(&chain, 16);
        assert_eq!(canvas.dimensions(), (16, 16));
        assert_eq!(canvas.get_pixel(8, 8).0, [10, 200, 30]);
    }

    #[test]
    fn undecodable_photo_falls_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let chain = background_chain(tmp.path(), Rgb([9, 9, 9]));
        let canvas = compose_background(&chain, 8);
        assert!(canvas.pixels().all(|p| p.0 == [9, 9, 9]));
    }
}
