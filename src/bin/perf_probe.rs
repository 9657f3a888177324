use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use panowarp::processing::transform;
use panowarp::{Adjustments, Image, MeshParams, apply_projection_with};

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

fn list_images(dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read_dir failed for {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, IMAGE_EXTS))
        .collect();
    files.sort();
    if files.len() > limit {
        files.truncate(limit);
    }
    Ok(files)
}

fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

fn build_adjustments() -> Adjustments {
    Adjustments {
        brightness: 12,
        contrast: 1.15,
        saturation: 1.1,
        temperature: 6,
        blur_radius: 1,
        ..Adjustments::default()
    }
}

/// A mask that marks the middle third of the frame as salient.
fn centre_mask(width: u32, height: u32) -> Result<Image> {
    let mut data = vec![0u8; width as usize * height as usize * 3];
    let (lo, hi) = (width / 3, 2 * width / 3);
    for (i, px) in data.chunks_exact_mut(3).enumerate() {
        let x = (i % width as usize) as u32;
        if (lo..hi).contains(&x) {
            px.fill(255);
        }
    }
    Ok(Image::from_raw(data, width, height, 3)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args();
    let _bin = args.next();
    let dir = args
        .next()
        .map(PathBuf::from)
        .context("usage: perf_probe <image-dir> [count]")?;
    let count = args
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(20);

    let files = list_images(&dir, count)?;
    if files.is_empty() {
        anyhow::bail!("No images found in {}", dir.display());
    }
    eprintln!("Using {} images from {}", files.len(), dir.display());

    let adj = build_adjustments();
    let params = MeshParams::default();
    let mut adjust_samples = Vec::with_capacity(files.len());
    let mut project_samples = Vec::with_capacity(files.len());
    for path in &files {
        let img = Image::load(path).with_context(|| format!("open failed for {}", path.display()))?;

        let t0 = Instant::now();
        let _adjusted = transform::apply(&img, &adj);
        adjust_samples.push(t0.elapsed().as_secs_f64() * 1000.0);

        let mask = centre_mask(img.width(), img.height())?;
        let t0 = Instant::now();
        match apply_projection_with(&img, &mask, &params) {
            Ok(_) => project_samples.push(t0.elapsed().as_secs_f64() * 1000.0),
            Err(err) => eprintln!("skipping projection for {}: {}", path.display(), err),
        }
    }

    let out_dir = std::env::temp_dir().join(format!(
        "panowarp-perf-probe-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    ));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("create_dir_all {}", out_dir.display()))?;

    let export_start = Instant::now();
    files.par_iter().try_for_each(|path| -> Result<()> {
        let input =
            Image::load(path).with_context(|| format!("open failed for {}", path.display()))?;
        let processed = transform::apply(&input, &adj);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        let output = out_dir.join(format!("{}.jpg", stem));
        processed
            .save(&output, 90)
            .with_context(|| format!("jpeg encode failed {}", output.display()))?;
        Ok(())
    })?;
    let export_wall_s = export_start.elapsed().as_secs_f64();
    let images_per_sec = files.len() as f64 / export_wall_s.max(1e-9);

    println!("METRIC file_count={}", files.len());
    println!("METRIC adjust_ms_median={:.2}", median_ms(&adjust_samples));
    println!("METRIC project_ms_median={:.2}", median_ms(&project_samples));
    println!("METRIC export_wall_s={:.2}", export_wall_s);
    println!("METRIC export_images_per_sec={:.3}", images_per_sec);
    println!("METRIC export_out_dir={}", out_dir.display());

    Ok(())
}
