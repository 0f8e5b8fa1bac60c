//! Image processing task.
//!
//! Two independent sub-pipelines run over the same source set:
//!
//! 1. **WebP**: every raster source (png/jpeg) is transcoded to a WebP
//!    variant at quality 70, written alongside the optimized copy.
//! 2. **Optimize**: a format-preserving variant - PNG through oxipng at
//!    preset 3, JPEG re-encoded, everything else (svg, gif, ico, webp)
//!    copied byte-for-byte so attributes like an SVG viewBox survive.
//!
//! Failure of one sub-pipeline or one file never blocks the other; a reload
//! broadcast fires once per sub-pipeline that produced output. Image
//! encoding is the most expensive transform in the pipeline, so both
//! sub-pipelines share the single conservative staleness predicate and skip
//! anything whose output is already newer than its source.

use super::{discover, relative_output, write_output, TaskError};
use crate::build::{stale, FileResult, FileStatus, TaskReport};
use crate::paths::{AssetKind, PathRegistry};
use crate::reload::Reloader;
use std::path::Path;
use std::time::Instant;

/// Lossy quality for the WebP variant.
const WEBP_QUALITY: f32 = 70.0;
/// oxipng effort preset for the optimized PNG variant.
const OXIPNG_PRESET: u8 = 3;
/// Re-encode quality for the optimized JPEG variant.
const JPEG_QUALITY: u8 = 80;

pub fn run(registry: &PathRegistry, reloader: &Reloader, force: bool) -> TaskReport {
    let start = Instant::now();
    let entry = registry.resolve(AssetKind::Images);
    let mut report = TaskReport::new(AssetKind::Images);

    let sources = match discover(&entry.source_glob) {
        Ok(sources) => sources,
        Err(e) => return TaskReport::task_failed(AssetKind::Images, e.to_string()),
    };

    // WebP sub-pipeline
    let mut webp_changed = false;
    for source in &sources {
        if !is_raster(source) {
            continue;
        }
        let out_path =
            relative_output(source, &entry.base_dir, &entry.out_dir).with_extension("webp");
        match process(source, &out_path, force, encode_webp) {
            Some(result) => {
                webp_changed |= result.status == FileStatus::Built;
                report.push(result);
            }
            None => report.push(FileResult::skipped(source.clone())),
        }
    }
    if webp_changed {
        reloader.broadcast(AssetKind::Images);
    }

    // Optimize sub-pipeline
    let mut optimize_changed = false;
    for source in &sources {
        let out_path = relative_output(source, &entry.base_dir, &entry.out_dir);
        match process(source, &out_path, force, optimize) {
            Some(result) => {
                optimize_changed |= result.status == FileStatus::Built;
                report.push(result);
            }
            None => report.push(FileResult::skipped(source.clone())),
        }
    }
    if optimize_changed {
        reloader.broadcast(AssetKind::Images);
    }

    report.duration = start.elapsed();
    report
}

/// Run one encoder over one file with the shared staleness check. `None`
/// means the output was up to date.
fn process(
    source: &Path,
    out_path: &Path,
    force: bool,
    encode: fn(&Path) -> Result<Vec<u8>, TaskError>,
) -> Option<FileResult> {
    if !force && !stale::source_newer(source, out_path) {
        return None;
    }
    match encode(source).and_then(|bytes| write_output(out_path, &bytes)) {
        Ok(()) => Some(FileResult::built(source.to_path_buf(), vec![out_path.to_path_buf()])),
        Err(e) => {
            tracing::warn!(image = %source.display(), "{}", e);
            Some(FileResult::failed(source.to_path_buf(), e.to_string()))
        }
    }
}

fn extension(path: &Path) -> String {
    path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default()
}

/// Whether the source is a raster format we transcode to WebP.
fn is_raster(path: &Path) -> bool {
    matches!(extension(path).as_str(), "png" | "jpg" | "jpeg")
}

// Hands webp raw RGBA bytes rather than a decoded image value; the two
// crates pin different `image` major versions, so their types must not meet.
fn encode_webp(source: &Path) -> Result<Vec<u8>, TaskError> {
    let img = image::open(source).map_err(|e| TaskError::Image(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), width, height);
    Ok(encoder.encode(WEBP_QUALITY).to_vec())
}

fn optimize(source: &Path) -> Result<Vec<u8>, TaskError> {
    let bytes = std::fs::read(source)?;
    match extension(source).as_str() {
        "png" => oxipng::optimize_from_memory(&bytes, &oxipng::Options::from_preset(OXIPNG_PRESET))
            .map_err(|e| TaskError::Image(e.to_string())),
        "jpg" | "jpeg" => {
            let img = image::load_from_memory(&bytes).map_err(|e| TaskError::Image(e.to_string()))?;
            let mut out = Vec::new();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder.encode_image(&img).map_err(|e| TaskError::Image(e.to_string()))?;
            Ok(out)
        }
        // svg, gif, ico, webp and anything unrecognized pass through intact
        _ => Ok(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn setup(temp: &TempDir) -> PathRegistry {
        fs::create_dir_all(temp.path().join("static/img")).unwrap();
        PathRegistry::from_config(&default_config(), temp.path())
    }

    fn write_png(path: &Path) {
        let mut img = RgbaImage::new(4, 4);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([200, 50, 50, 255]);
        }
        img.save(path).unwrap();
    }

    #[test]
    fn test_dual_output_for_png() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        write_png(&temp.path().join("static/img/a.png"));

        let report = run(&registry, &Reloader::new(), false);
        assert!(report.is_success(), "{}", report.summary());
        assert!(temp.path().join("build/img/a.webp").exists());
        assert!(temp.path().join("build/img/a.png").exists());
    }

    #[test]
    fn test_webp_output_is_valid_container() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        write_png(&temp.path().join("static/img/a.png"));

        let report = run(&registry, &Reloader::new(), false);
        assert!(report.is_success(), "{}", report.summary());

        let bytes = fs::read(temp.path().join("build/img/a.webp")).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_svg_copied_verbatim() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"></svg>"#;
        fs::write(temp.path().join("static/img/icon.svg"), svg).unwrap();

        let report = run(&registry, &Reloader::new(), false);
        assert!(report.is_success(), "{}", report.summary());
        assert!(!temp.path().join("build/img/icon.webp").exists());

        let copied = fs::read_to_string(temp.path().join("build/img/icon.svg")).unwrap();
        assert!(copied.contains("viewBox"));
    }

    #[test]
    fn test_corrupt_image_fails_only_that_file() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        fs::write(temp.path().join("static/img/broken.png"), b"not a png").unwrap();
        write_png(&temp.path().join("static/img/fine.png"));

        let report = run(&registry, &Reloader::new(), false);
        assert!(report.failed_count() >= 1);
        assert!(temp.path().join("build/img/fine.webp").exists());
        assert!(temp.path().join("build/img/fine.png").exists());
    }

    #[test]
    fn test_nested_structure_preserved() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        fs::create_dir_all(temp.path().join("static/img/icons")).unwrap();
        write_png(&temp.path().join("static/img/icons/dot.png"));

        run(&registry, &Reloader::new(), false);
        assert!(temp.path().join("build/img/icons/dot.webp").exists());
        assert!(temp.path().join("build/img/icons/dot.png").exists());
    }

    #[test]
    fn test_incremental_skip() {
        let temp = TempDir::new().unwrap();
        let registry = setup(&temp);
        write_png(&temp.path().join("static/img/a.png"));

        let first = run(&registry, &Reloader::new(), false);
        assert_eq!(first.built_count(), 2); // webp + optimized

        let second = run(&registry, &Reloader::new(), false);
        assert_eq!(second.built_count(), 0);
        assert_eq!(second.skipped_count(), 2);
    }
}
