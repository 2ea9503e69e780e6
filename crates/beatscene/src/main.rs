//! Beatscene - beatmap synthesis and streaming scene
//!
//! `build` turns a feature dump into a beatmap; `scene` streams the animated
//! scene for a while and prints where every object ended up.

mod logging_setup;

use anyhow::{Context, Result};
use beatscene_core::{AppContext, BeatType, EngineConfig, FeatureFrames};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "beatscene")]
#[command(about = "Build beatmaps from audio features and stream animated scenes")]
struct Args {
    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a beatmap from a feature dump
    Build {
        /// Feature dump (JSON)
        features: PathBuf,

        /// Output JSON file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Stream a scene and print its final state
    Scene {
        /// Scene variant id, the configured default if omitted
        #[arg(short, long)]
        variant: Option<u32>,

        /// How long to stream
        #[arg(short, long, default_value_t = 1.0)]
        seconds: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EngineConfig::default(),
    };
    let _log_guard = logging_setup::init(&config.logging)?;

    let context = AppContext::new(config);
    match args.command {
        Command::Build {
            features,
            output,
            pretty,
        } => {
            let json = build_beatmap(&context, &features, pretty)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Beatmap written to {:?}", path);
                }
                None => println!("{}", json),
            }
        }
        Command::Scene { variant, seconds } => {
            let duration =
                Duration::try_from_secs_f64(seconds).context("Invalid --seconds value")?;
            println!("{}", stream_scene(&context, variant, duration)?);
        }
    }

    context.shutdown()?;
    Ok(())
}

fn build_beatmap(context: &AppContext, path: &Path, pretty: bool) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let features = FeatureFrames::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse feature dump {:?}", path))?;

    let beatmap = context
        .build_beatmap(&features)
        .with_context(|| format!("Failed to build beatmap from {:?}", path))?;

    let counts = beatmap.counts_by_type();
    let count = |beat_type: BeatType| counts.get(&beat_type).copied().unwrap_or(0);
    info!(
        "Beatmap: {} events ({} low, {} regular, {} climax)",
        beatmap.len(),
        count(BeatType::Low),
        count(BeatType::Regular),
        count(BeatType::Climax)
    );

    Ok(beatmap.to_json_string(pretty)?)
}

fn stream_scene(context: &AppContext, variant: Option<u32>, duration: Duration) -> Result<String> {
    let variant = context.start_stream(variant)?;
    info!("Streaming {:?} for {:?}", variant, duration);

    thread::sleep(duration);
    context.stop_stream()?;

    let snapshot = context.scene_state();
    info!("Scene stopped after {} ticks", snapshot.ticks);
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatscene_core::ClockConfig;

    #[test]
    fn test_build_from_feature_file() {
        let features = FeatureFrames::new(
            vec![0.0, 1.0, 4.0, 2.0],
            vec![0.0, 0.1, 0.3, 0.2],
            vec![
                vec![0.0, -20.0, -40.0],
                vec![0.0, -20.0, -40.0],
                vec![-40.0, -20.0, 0.0],
                vec![-40.0, 0.0, -20.0],
            ],
            vec![1, 2, 3],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        fs::write(&path, serde_json::to_string(&features).unwrap()).unwrap();

        let context = AppContext::new(EngineConfig::default());
        let json = build_beatmap(&context, &path, false).unwrap();
        let events: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(!events.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_feature_file() {
        let context = AppContext::new(EngineConfig::default());
        assert!(build_beatmap(&context, Path::new("does/not/exist.json"), false).is_err());
    }

    #[test]
    fn test_stream_scene_prints_objects() {
        let mut config = EngineConfig::default();
        config.clock = ClockConfig {
            interval_ms: 1,
            ..ClockConfig::time()
        };
        let context = AppContext::new(config);

        let json = stream_scene(&context, None, Duration::from_millis(10)).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot["variant"], "approach");
        assert_eq!(snapshot["objects"].as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from(["beatscene", "scene", "--variant", "1", "-s", "0.5"])
            .unwrap();
        assert!(matches!(
            args.command,
            Command::Scene {
                variant: Some(1),
                ..
            }
        ));

        let args =
            Args::try_parse_from(["beatscene", "build", "f.json", "--config", "c.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
    }
}
