use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use panowarp::config::AppConfig;
use panowarp::processing::transform;
use panowarp::{Adjustments, Image, apply_projection_with};

const USAGE: &str = "usage:
  panowarp adjust <input> <output> [--brightness N] [--contrast F] [--saturation F]
                  [--temperature N] [--grayscale] [--blur R] [--invert] [--quality Q]
  panowarp project <panorama> <output> [--mask PATH] [--quality Q]";

#[derive(Debug, PartialEq)]
enum Command {
    Adjust {
        input: PathBuf,
        output: PathBuf,
        adjustments: Option<Adjustments>,
        quality: Option<u8>,
    },
    Project {
        panorama: PathBuf,
        output: PathBuf,
        mask: Option<PathBuf>,
        quality: Option<u8>,
    },
}

fn flag_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let raw = value.with_context(|| format!("{} expects a value", flag))?;
    raw.parse::<T>()
        .map_err(|_| anyhow::anyhow!("invalid value for {}: {}", flag, raw))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut args = args.into_iter();
    let sub = args.next().context(USAGE)?;
    let first = args.next().map(PathBuf::from).context(USAGE)?;
    let output = args.next().map(PathBuf::from).context(USAGE)?;

    match sub.as_str() {
        "adjust" => {
            let mut adj = Adjustments::default();
            let mut touched = false;
            let mut quality = None;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--brightness" => adj.brightness = flag_value(&flag, args.next())?,
                    "--contrast" => adj.contrast = flag_value(&flag, args.next())?,
                    "--saturation" => adj.saturation = flag_value(&flag, args.next())?,
                    "--temperature" => adj.temperature = flag_value(&flag, args.next())?,
                    "--blur" => adj.blur_radius = flag_value(&flag, args.next())?,
                    "--grayscale" => adj.grayscale = true,
                    "--invert" => adj.invert = true,
                    "--quality" => {
                        quality = Some(flag_value(&flag, args.next())?);
                        continue;
                    }
                    other => bail!("unknown flag {}\n{}", other, USAGE),
                }
                touched = true;
            }
            Ok(Command::Adjust {
                input: first,
                output,
                adjustments: touched.then_some(adj),
                quality,
            })
        }
        "project" => {
            let mut mask = None;
            let mut quality = None;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--mask" => mask = Some(flag_value::<PathBuf>(&flag, args.next())?),
                    "--quality" => quality = Some(flag_value(&flag, args.next())?),
                    other => bail!("unknown flag {}\n{}", other, USAGE),
                }
            }
            Ok(Command::Project {
                panorama: first,
                output,
                mask,
                quality,
            })
        }
        other => bail!("unknown command {}\n{}", other, USAGE),
    }
}

fn configure_threads(config: &AppConfig) {
    let Some(threads) = config.threads() else {
        return;
    };
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        tracing::warn!(%err, threads, "could not size worker pool");
    }
}

fn load(path: &Path) -> Result<Image> {
    Image::load(path).with_context(|| format!("load failed for {}", path.display()))
}

fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Adjust {
            input,
            output,
            adjustments,
            quality,
        } => {
            let img = load(&input)?;
            let adj = adjustments
                .or_else(|| Adjustments::load(&input))
                .unwrap_or_default();
            if adj.is_identity() {
                eprintln!("panowarp: no adjustments given, writing input unchanged");
            }
            let out = transform::apply(&img, &adj);
            let quality = quality.unwrap_or(config.jpeg_quality());
            out.save(&output, quality)
                .with_context(|| format!("save failed for {}", output.display()))?;
            adj.save(&output)
                .with_context(|| format!("sidecar write failed for {}", output.display()))?;
            eprintln!(
                "panowarp: saved {} ({}x{}, quality {})",
                output.display(),
                out.width(),
                out.height(),
                quality
            );
        }
        Command::Project {
            panorama,
            output,
            mask,
            quality,
        } => {
            let img = load(&panorama)?;
            let mask_path = mask.unwrap_or_else(|| config.mask_path());
            let mask = load(&mask_path)?;
            let out = apply_projection_with(&img, &mask, &config.mesh_params())
                .with_context(|| format!("projection failed for {}", panorama.display()))?;
            let quality = quality.unwrap_or(config.jpeg_quality());
            out.save(&output, quality)
                .with_context(|| format!("save failed for {}", output.display()))?;
            eprintln!(
                "panowarp: projected {} -> {} ({}x{})",
                panorama.display(),
                output.display(),
                out.width(),
                out.height()
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();
    configure_threads(&config);
    let command = parse_args(std::env::args().skip(1))?;
    run(command, &config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use panowarp::Adjustments;

    use super::{Command, parse_args};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn adjust_flags_build_recipe() {
        let cmd = parse_args(args(&[
            "adjust",
            "in.jpg",
            "out.jpg",
            "--brightness",
            "20",
            "--contrast",
            "1.5",
            "--invert",
            "--quality",
            "80",
        ]))
        .unwrap();
        let expected = Adjustments {
            brightness: 20,
            contrast: 1.5,
            invert: true,
            ..Adjustments::default()
        };
        assert_eq!(
            cmd,
            Command::Adjust {
                input: PathBuf::from("in.jpg"),
                output: PathBuf::from("out.jpg"),
                adjustments: Some(expected),
                quality: Some(80),
            }
        );
    }

    #[test]
    fn adjust_without_flags_defers_to_sidecar() {
        let cmd = parse_args(args(&["adjust", "in.jpg", "out.jpg", "--quality", "70"])).unwrap();
        assert!(matches!(
            cmd,
            Command::Adjust {
                adjustments: None,
                quality: Some(70),
                ..
            }
        ));
    }

    #[test]
    fn project_accepts_mask_override() {
        let cmd = parse_args(args(&["project", "pano.jpg", "out.jpg", "--mask", "m.png"])).unwrap();
        assert_eq!(
            cmd,
            Command::Project {
                panorama: PathBuf::from("pano.jpg"),
                output: PathBuf::from("out.jpg"),
                mask: Some(PathBuf::from("m.png")),
                quality: None,
            }
        );
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse_args(args(&["adjust", "in.jpg"])).is_err());
        assert!(parse_args(args(&["adjust", "a", "b", "--brightness", "x"])).is_err());
        assert!(parse_args(args(&["adjust", "a", "b", "--sharpen"])).is_err());
        assert!(parse_args(args(&["rotate", "a", "b"])).is_err());
    }
}
