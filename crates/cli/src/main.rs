use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::json;

use mtcnn_core::detection::domain::face_detector::FaceDetector;
use mtcnn_core::detection::infrastructure::model_resolver;
use mtcnn_core::detection::infrastructure::onnx_mtcnn_detector::{MtcnnConfig, OnnxMtcnnDetector};
use mtcnn_core::shared::constants::IMAGE_EXTENSIONS;
use mtcnn_core::shared::face::Face;
use mtcnn_core::shared::image::ImageData;

/// MTCNN face detection for images.
#[derive(Parser)]
#[command(name = "mtcnn")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Write detections as JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Smallest face to look for, in pixels (>= 12).
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Per-stage confidence thresholds: PNet, RNet, ONet (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.6_f32, 0.7, 0.7])]
    steps_threshold: Vec<f32>,

    /// Pyramid decay factor (0.0-1.0, exclusive).
    #[arg(long, default_value = "0.709")]
    scale_factor: f64,

    /// Directory with pre-downloaded stage models (skips the cache lookup).
    #[arg(long)]
    model_dir: Option<PathBuf>,
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

    let models = model_resolver::resolve_stage_models(cli.model_dir.as_deref(), |name| {
        Some(Box::new(move |downloaded, total| {
            download_progress(name, downloaded, total)
        }))
    })?;
    eprintln!();

    let config = MtcnnConfig {
        min_face_size: cli.min_face_size,
        steps_threshold: [
            cli.steps_threshold[0],
            cli.steps_threshold[1],
            cli.steps_threshold[2],
        ],
        scale_factor: cli.scale_factor,
    };
    let mut detector = OnnxMtcnnDetector::from_stage_models(&models, config)?;

    let image = ImageData::open(&cli.input)?;
    let faces = detector.detect_faces(&image)?;
    log::info!("{} face(s) detected in {}", faces.len(), cli.input.display());

    let rendered = serde_json::to_string_pretty(&faces_to_json(&faces))?;
    match cli.output {
        Some(path) => {
            fs::write(&path, rendered)?;
            log::info!("Detections written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn faces_to_json(faces: &[Face]) -> serde_json::Value {
    json!(faces
        .iter()
        .map(|f| {
            let keypoints: serde_json::Map<String, serde_json::Value> = f
                .keypoints
                .named()
                .iter()
                .map(|(name, (x, y))| (name.to_string(), json!([x, y])))
                .collect();
            json!({
                "box": [
                    f.bounding_box.x,
                    f.bounding_box.y,
                    f.bounding_box.width,
                    f.bounding_box.height,
                ],
                "confidence": f.confidence,
                "keypoints": keypoints,
            })
        })
        .collect::<Vec<_>>())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_image(&cli.input) {
        return Err(format!(
            "Input must be an image file ({}), got: {}",
            IMAGE_EXTENSIONS.join(", "),
            cli.input.display()
        )
        .into());
    }
    if cli.min_face_size < 12 {
        return Err(format!(
            "Min face size must be at least 12, got {}",
            cli.min_face_size
        )
        .into());
    }
    if cli.steps_threshold.len() != 3 {
        return Err(format!(
            "Exactly three stage thresholds are required, got {}",
            cli.steps_threshold.len()
        )
        .into());
    }
    for t in &cli.steps_threshold {
        if !(0.0..=1.0).contains(t) {
            return Err(format!("Stage thresholds must be between 0.0 and 1.0, got {t}").into());
        }
    }
    if cli.scale_factor <= 0.0 || cli.scale_factor >= 1.0 {
        return Err(format!(
            "Scale factor must be strictly between 0.0 and 1.0, got {}",
            cli.scale_factor
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
