// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::args::{CommonArgs, DetectArgs, PoseArgs};
use crate::error::{DecodeError, Result};
use crate::logging::set_verbose;
use crate::pipeline::{detect_frame, estimate_poses};
use crate::preprocessing::ChannelOrder;
use crate::results::{summarize_poses, Speed};
use crate::{
    verbose, DetectionConfig, DetectionDecoder, InferenceSession, PoseAssembler, PoseConfig,
    SessionConfig, Task, VERSION,
};
use crate::{info, warn};

/// Image extensions read from a source directory.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Run a detection model over every image of the source.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded or the source has no images.
pub fn run_detect(args: &DetectArgs) -> Result<()> {
    set_verbose(args.common.verbose);

    let mut config = session_config(&args.common, args.imgsz);
    if let Some(output) = &args.output {
        config = config.with_detection_output(output.clone());
    }
    let mut session = InferenceSession::load(&args.common.model, Task::Detect, config)?;
    let decoder = DetectionDecoder::new(
        DetectionConfig::new()
            .with_score_threshold(args.conf)
            .with_nms_threshold(args.nms)
            .with_max_detections(args.max_det)
            .with_class_agnostic(!args.per_class),
    )?;

    let images = collect_images(Path::new(&args.common.source))?;
    print_header(&session);

    let mut totals = SpeedTotals::default();
    for (i, path) in images.iter().enumerate() {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let frame = detect_frame(&mut session, &decoder, &image)?;
        verbose!(
            "image {}/{} {}: {}x{} {}{:.1}ms",
            i + 1,
            images.len(),
            path.display(),
            frame.frame_size.1,
            frame.frame_size.0,
            decoder.summarize(&frame.detections),
            frame.speed.inference.unwrap_or(0.0)
        );
        for det in &frame.detections {
            let name = decoder
                .label_name(det.label)
                .map_or_else(|| det.label.to_string(), ToString::to_string);
            info!(
                "  {name} {:.2} [{:.1}, {:.1}, {:.1}, {:.1}]",
                det.score, det.bbox.x, det.bbox.y, det.bbox.width, det.bbox.height
            );
        }
        totals.add(&frame.speed);
    }

    totals.print(session.input_size());
    Ok(())
}

/// Run a heatmap + PAF pose model over every image of the source.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded or the source has no images.
pub fn run_pose(args: &PoseArgs) -> Result<()> {
    set_verbose(args.common.verbose);

    let mut config = session_config(&args.common, args.imgsz);
    if let (Some(heatmaps), Some(pafs)) = (&args.heatmaps, &args.pafs) {
        config = config.with_pose_outputs(heatmaps.clone(), pafs.clone());
    }
    let mut session = InferenceSession::load(&args.common.model, Task::Pose, config)?;
    let assembler = PoseAssembler::openpose(
        PoseConfig::new()
            .with_peak_threshold(args.peak_threshold)
            .with_min_joints(args.min_joints)
            .with_min_average_score(args.min_average_score),
    )?;

    let images = collect_images(Path::new(&args.common.source))?;
    print_header(&session);

    let mut totals = SpeedTotals::default();
    for (i, path) in images.iter().enumerate() {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let frame = estimate_poses(&mut session, &assembler, &image)?;
        let mut poses = frame.poses;
        if let Some(min_score) = args.min_score {
            poses = poses.filter_by_score(min_score);
        }
        if args.coco {
            poses = poses.to_coco17();
        }

        verbose!(
            "image {}/{} {}: {}x{} {}{:.1}ms",
            i + 1,
            images.len(),
            path.display(),
            frame.frame_size.1,
            frame.frame_size.0,
            summarize_poses(&poses),
            frame.speed.inference.unwrap_or(0.0)
        );
        for (pose, score) in poses.iter() {
            let joints: Vec<String> = pose
                .keypoints
                .iter()
                .map(|kp| {
                    if kp.is_missing() {
                        "-".to_string()
                    } else {
                        format!("({:.0}, {:.0})", kp.x, kp.y)
                    }
                })
                .collect();
            info!(
                "  pose {score:.2} ({} joints): {}",
                pose.num_visible(),
                joints.join(" ")
            );
        }
        totals.add(&frame.speed);
    }

    totals.print(session.input_size());
    Ok(())
}

fn session_config(common: &CommonArgs, imgsz: (usize, usize)) -> SessionConfig {
    let order = if common.rgb {
        ChannelOrder::Rgb
    } else {
        ChannelOrder::Bgr
    };
    SessionConfig::new(imgsz.0, imgsz.1)
        .with_threads(common.threads)
        .with_channel_order(order)
}

fn print_header(session: &InferenceSession) {
    info!("vision-decode {VERSION} 🚀 Rust ONNX FP32 CPU");
    verbose!(
        "{} model: outputs {:?}, imgsz=({}, {})",
        session.task(),
        session.output_names(),
        session.input_size().0,
        session.input_size().1
    );
}

/// Collect image paths from a file or a directory (sorted, non-recursive).
fn collect_images(source: &Path) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        return Err(DecodeError::InvalidInput(format!(
            "Source not found: {}",
            source.display()
        )));
    }

    let mut images: Vec<PathBuf> = fs::read_dir(source)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .collect();
    images.sort();

    if images.is_empty() {
        return Err(DecodeError::InvalidInput(format!(
            "No images found in {}",
            source.display()
        )));
    }
    Ok(images)
}

#[derive(Debug, Default)]
struct SpeedTotals {
    preprocess: f64,
    inference: f64,
    postprocess: f64,
    frames: usize,
}

impl SpeedTotals {
    fn add(&mut self, speed: &Speed) {
        self.preprocess += speed.preprocess.unwrap_or(0.0);
        self.inference += speed.inference.unwrap_or(0.0);
        self.postprocess += speed.postprocess.unwrap_or(0.0);
        self.frames += 1;
    }

    fn print(&self, input_size: (usize, usize)) {
        #[allow(clippy::cast_precision_loss)]
        let n = self.frames.max(1) as f64;
        verbose!(
            "Speed: {:.1}ms preprocess, {:.1}ms inference, {:.1}ms postprocess per image at shape (1, 3, {}, {})",
            self.preprocess / n,
            self.inference / n,
            self.postprocess / n,
            input_size.0,
            input_size.1
        );
    }
}
