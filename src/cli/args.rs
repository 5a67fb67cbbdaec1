// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    vision-decode detect --model ssd300.onnx --source image.jpg
    vision-decode detect -m ssd300.onnx -s frames/ --conf 0.5 --nms 0.45
    vision-decode pose --model human-pose-estimation-0001.onnx --source image.jpg
    vision-decode pose -m human-pose-estimation-0001.onnx -s frames/ --imgsz 256x456 --coco"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect objects with an SSD-style model
    Detect(DetectArgs),
    /// Estimate multi-person poses with a heatmap + PAF model
    Pose(PoseArgs),
}

/// Arguments shared by every command.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to ONNX model file
    #[arg(short, long)]
    pub model: String,

    /// Input source (image file or directory of images)
    #[arg(short, long)]
    pub source: String,

    /// Number of ONNX Runtime intra-op threads (0 = runtime default)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Feed RGB instead of BGR channel order
    #[arg(long, default_value_t = false)]
    pub rgb: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the detect command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    /// Shared arguments.
    pub common: CommonArgs,

    /// Model input size as H or HxW
    #[arg(long, default_value = "300", value_parser = parse_imgsz)]
    pub imgsz: (usize, usize),

    /// Score threshold
    #[arg(long, default_value_t = 0.6)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = 0.6)]
    pub nms: f32,

    /// Maximum number of detections per image
    #[arg(long, default_value_t = 300)]
    pub max_det: usize,

    /// Suppress overlapping boxes only within the same class
    #[arg(long, default_value_t = false)]
    pub per_class: bool,

    /// Name of the detection output (defaults to the first output)
    #[arg(long)]
    pub output: Option<String>,
}

/// Arguments for the pose command.
#[derive(Args, Debug)]
pub struct PoseArgs {
    #[command(flatten)]
    /// Shared arguments.
    pub common: CommonArgs,

    /// Model input size as H or HxW
    #[arg(long, default_value = "256x456", value_parser = parse_imgsz)]
    pub imgsz: (usize, usize),

    /// Minimum heatmap peak value for a joint candidate
    #[arg(long, default_value_t = 0.1)]
    pub peak_threshold: f32,

    /// Minimum number of joints for a pose
    #[arg(long, default_value_t = 3)]
    pub min_joints: usize,

    /// Minimum accumulated score per joint for a pose
    #[arg(long, default_value_t = 0.2)]
    pub min_average_score: f32,

    /// Drop poses scoring below this value
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Report keypoints in the 17-joint COCO order
    #[arg(long, default_value_t = false)]
    pub coco: bool,

    /// Name of the heatmap output
    #[arg(long, requires = "pafs")]
    pub heatmaps: Option<String>,

    /// Name of the PAF output
    #[arg(long, requires = "heatmaps")]
    pub pafs: Option<String>,
}

/// Parse `H` or `HxW` into (height, width).
///
/// # Errors
///
/// Returns a message if a dimension is missing, zero, or not a number.
pub fn parse_imgsz(value: &str) -> Result<(usize, usize), String> {
    let parse = |part: &str| -> Result<usize, String> {
        match part.trim().parse::<usize>() {
            Ok(0) => Err(format!("image size must be non-zero, got '{value}'")),
            Ok(n) => Ok(n),
            Err(_) => Err(format!("invalid image size '{value}', expected H or HxW")),
        }
    };
    match value.split_once(['x', 'X']) {
        Some((h, w)) => Ok((parse(h)?, parse(w)?)),
        None => {
            let size = parse(value)?;
            Ok((size, size))
        }
    }
}
