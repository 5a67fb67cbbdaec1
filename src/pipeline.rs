// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame pipelines: preprocess, run the session, decode.

use std::time::Instant;

use image::{DynamicImage, GenericImageView};

use crate::assembler::PoseAssembler;
use crate::detection::DetectionDecoder;
use crate::error::Result;
use crate::preprocessing::preprocess_frame;
use crate::rescale::Rescaler;
use crate::results::{Detection, PoseSet, Speed};
use crate::session::InferenceSession;
use crate::tensor::RawTensor;

/// Detections for one frame.
#[derive(Debug, Clone)]
pub struct FrameDetections {
    /// Detections in selection order, in frame pixels.
    pub detections: Vec<Detection>,
    /// Frame (width, height).
    pub frame_size: (u32, u32),
    /// Stage timings.
    pub speed: Speed,
}

/// Poses for one frame.
#[derive(Debug, Clone)]
pub struct FramePoses {
    /// Poses in frame pixels with their scores.
    pub poses: PoseSet,
    /// Frame (width, height).
    pub frame_size: (u32, u32),
    /// Heatmap grid (width, height) the poses were decoded on.
    pub grid_size: (usize, usize),
    /// Stage timings.
    pub speed: Speed,
}

/// Run a detection model on one frame.
///
/// # Errors
///
/// Propagates session failures and output shape errors.
pub fn detect_frame(
    session: &mut InferenceSession,
    decoder: &DetectionDecoder,
    image: &DynamicImage,
) -> Result<FrameDetections> {
    let frame_size = image.dimensions();
    let (outputs, mut speed) = infer(session, image)?;

    let start = Instant::now();
    let detections = decoder.decode_tensor(session.detection_output(&outputs)?, frame_size)?;
    speed.postprocess = Some(elapsed_ms(start));

    Ok(FrameDetections {
        detections,
        frame_size,
        speed,
    })
}

/// Run a heatmap + PAF pose model on one frame.
///
/// Poses are rescaled from the heatmap grid to frame pixels.
///
/// # Errors
///
/// Propagates session failures and output shape errors.
pub fn estimate_poses(
    session: &mut InferenceSession,
    assembler: &PoseAssembler,
    image: &DynamicImage,
) -> Result<FramePoses> {
    let frame_size = image.dimensions();
    let (outputs, mut speed) = infer(session, image)?;

    let start = Instant::now();
    let (heatmaps, pafs) = session.pose_outputs(&outputs)?;
    let heatmaps = heatmaps.view_chw()?;
    let (_, grid_h, grid_w) = heatmaps.dim();
    let poses = assembler.assemble(heatmaps, pafs.view_chw()?)?;
    let poses = Rescaler::new((grid_w, grid_h), frame_size)?.apply_set(poses);
    speed.postprocess = Some(elapsed_ms(start));

    Ok(FramePoses {
        poses,
        frame_size,
        grid_size: (grid_w, grid_h),
        speed,
    })
}

fn infer(session: &mut InferenceSession, image: &DynamicImage) -> Result<(Vec<RawTensor>, Speed)> {
    let start = Instant::now();
    let input = preprocess_frame(image, session.input_size(), session.config().channel_order);
    let preprocess = elapsed_ms(start);

    let start = Instant::now();
    let outputs = session.run(&input)?;
    let inference = elapsed_ms(start);

    Ok((outputs, Speed::new(preprocess, inference, 0.0)))
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
