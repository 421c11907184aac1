use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use filmface_core::clustering::infrastructure::agglomerative_clusterer::{
    AgglomerativeClusterer, Linkage,
};
use filmface_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use filmface_core::frames::infrastructure::image_dir_frame_store::ImageDirFrameStore;
use filmface_core::pipeline::extract_features_use_case::ExtractFeaturesUseCase;
use filmface_core::pipeline::extraction_logger::LogExtractionLogger;
use filmface_core::pipeline::frame_assembler::ExtractionConfig;
use filmface_core::pipeline::frame_feature_record::FeatureTable;
use filmface_core::pipeline::frame_mapper::{FrameMapper, SequentialFrameMapper};
use filmface_core::pipeline::infrastructure::threaded_frame_mapper::ThreadedFrameMapper;
use filmface_core::shared::constants::{
    DEFAULT_CLUSTER_DISTANCE_THRESHOLD, DEFAULT_MOUTH_OPEN_RATIO,
};

/// Per-frame face features and character identities for a sampled film.
#[derive(Parser)]
#[command(name = "filmface")]
struct Cli {
    /// Directory holding one sub-directory of sampled frames per film.
    #[arg(long)]
    frames_dir: PathBuf,

    /// Film identifier (frames live in <frames-dir>/<film>/<film>_frame_<n>.jpg).
    #[arg(long)]
    film: String,

    /// JSON file of detector output keyed by frame index.
    #[arg(long)]
    detections: PathBuf,

    /// First frame to process (1-based).
    #[arg(long, default_value = "1")]
    first_frame: usize,

    /// Last frame to process (default: last contiguous frame on disk).
    #[arg(long)]
    last_frame: Option<usize>,

    /// Write the feature table here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Identity clustering merge cut-off, in embedding distance units.
    #[arg(long, default_value_t = DEFAULT_CLUSTER_DISTANCE_THRESHOLD)]
    cluster_threshold: f64,

    /// Clustering linkage: ward, complete, average or single.
    #[arg(long, default_value = "ward")]
    linkage: String,

    /// Mouth gap relative to the thinner lip above which a mouth is open.
    #[arg(long, default_value_t = DEFAULT_MOUTH_OPEN_RATIO)]
    mouth_open_ratio: f64,

    /// Load frames and run detection on separate threads.
    #[arg(long)]
    threaded: bool,

    /// Skip per-frame colour statistics.
    #[arg(long)]
    no_frame_stats: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let linkage: Linkage = cli.linkage.parse()?;

    let store = ImageDirFrameStore::new(&cli.frames_dir);
    let frames = frame_range(&cli, &store)?;
    log::info!(
        "Film '{}': frames {}..={}",
        cli.film,
        frames.start(),
        frames.end()
    );

    let detector = ReplayFaceDetector::from_json_file(&cli.detections)?;

    let clusterer = AgglomerativeClusterer::new(cli.cluster_threshold, linkage)?;
    let mapper: Box<dyn FrameMapper> = if cli.threaded {
        Box::new(ThreadedFrameMapper::new())
    } else {
        Box::new(SequentialFrameMapper)
    };
    let config = ExtractionConfig {
        mouth_open_ratio: cli.mouth_open_ratio,
        compute_frame_stats: !cli.no_frame_stats,
    };

    let mut use_case = ExtractFeaturesUseCase::new(
        Box::new(store),
        Box::new(detector),
        Box::new(clusterer),
        mapper,
        Box::new(LogExtractionLogger::default()),
        &config,
    );
    let indices: Vec<usize> = frames.collect();
    let table = use_case.execute(&cli.film, &indices)?;

    write_table(&table, cli.output.as_ref())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frames_dir.is_dir() {
        return Err(format!("Frames directory not found: {}", cli.frames_dir.display()).into());
    }
    if !cli.detections.is_file() {
        return Err(format!("Detections file not found: {}", cli.detections.display()).into());
    }
    if cli.film.is_empty() {
        return Err("Film identifier must not be empty".into());
    }
    if cli.first_frame == 0 {
        return Err("Frames are numbered from 1; --first-frame must be at least 1".into());
    }
    if let Some(last) = cli.last_frame {
        if last < cli.first_frame {
            return Err(format!(
                "--last-frame ({last}) must not be before --first-frame ({})",
                cli.first_frame
            )
            .into());
        }
    }
    if !(cli.cluster_threshold.is_finite() && cli.cluster_threshold > 0.0) {
        return Err(format!(
            "Cluster threshold must be a positive number, got {}",
            cli.cluster_threshold
        )
        .into());
    }
    if !(cli.mouth_open_ratio.is_finite() && cli.mouth_open_ratio >= 0.0) {
        return Err(format!(
            "Mouth open ratio must be a non-negative number, got {}",
            cli.mouth_open_ratio
        )
        .into());
    }
    Ok(())
}

fn frame_range(
    cli: &Cli,
    store: &ImageDirFrameStore,
) -> Result<std::ops::RangeInclusive<usize>, Box<dyn std::error::Error>> {
    let last = match cli.last_frame {
        Some(last) => last,
        None => {
            let count = store.count_frames(&cli.film);
            if count == 0 {
                return Err(format!(
                    "No frames found at {}",
                    store.frame_path(&cli.film, 1).display()
                )
                .into());
            }
            count
        }
    };
    if last < cli.first_frame {
        return Err(format!(
            "Film has {last} frames, fewer than --first-frame ({})",
            cli.first_frame
        )
        .into());
    }
    Ok(cli.first_frame..=last)
}

fn write_table(
    table: &FeatureTable,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, table)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            log::info!(
                "Wrote {} frame records to {}",
                table.records.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, table)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec![
            "filmface",
            "--frames-dir",
            ".",
            "--film",
            "casablanca",
            "--detections",
            "Cargo.toml",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.first_frame, 1);
        assert_eq!(cli.last_frame, None);
        assert_eq!(cli.cluster_threshold, DEFAULT_CLUSTER_DISTANCE_THRESHOLD);
        assert_eq!(cli.mouth_open_ratio, DEFAULT_MOUTH_OPEN_RATIO);
        assert_eq!(cli.linkage.parse::<Linkage>().unwrap(), Linkage::Ward);
        assert!(!cli.threaded);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_rejects_zero_first_frame() {
        assert!(validate(&parse(&["--first-frame", "0"])).is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let cli = parse(&["--first-frame", "10", "--last-frame", "3"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        assert!(validate(&parse(&["--cluster-threshold", "0"])).is_err());
    }

    #[test]
    fn test_explicit_range_skips_disk_scan() {
        let cli = parse(&["--first-frame", "3", "--last-frame", "5"]);
        let store = ImageDirFrameStore::new("does-not-exist");
        assert_eq!(frame_range(&cli, &store).unwrap(), 3..=5);
    }

    #[test]
    fn test_missing_film_directory_has_no_frames() {
        let cli = parse(&[]);
        let store = ImageDirFrameStore::new("does-not-exist");
        assert!(frame_range(&cli, &store).is_err());
    }
}
