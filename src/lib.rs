//! Hierarchical block motion estimation.
//!
//! Frames are split into blocks and every block is matched against a
//! reference frame, from a heavily downscaled copy up to full resolution
//! with sub-pixel precision. The result is a dense field of motion vectors,
//! suitable for frame interpolation, motion compensation or occlusion
//! detection.
//!
//! [`MotionAnalysis`] runs the whole coarse-to-fine search for a pair of
//! frames; [`search::BlockSearch`] searches a single level and can also
//! re-estimate an existing field on a different block grid.

mod cpu;
pub mod data;
pub mod error;
pub mod field;
pub mod pyramid;
pub mod search;
pub mod y4m;

#[cfg(test)]
mod test_utils;

use std::{
    io::Read,
    sync::{
        Arc,
        mpsc::{channel, sync_channel},
    },
    thread,
    time::Instant,
};

use anyhow::Context;
pub use num_rational::Rational32;
use rayon::prelude::*;
use v_frame::{
    frame::Frame,
    pixel::{ChromaSampling, Pixel},
};

pub use crate::{
    data::{
        block::BlockSize,
        frame::{MvFrame, MvPlane, MvPyramid, PyramidConfig},
        motion::MotionVector,
    },
    error::ConfigError,
    field::{FieldError, FieldGeometry, MotionField},
    pyramid::{AnalysisOptions, MotionAnalysis, PairResult},
    search::{CostMetric, SearchType},
    y4m::VideoDetails,
};

const FRAME_PREFETCH_DEPTH: usize = 8;

/// Results of the analysis of a whole clip.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ClipResults {
    /// One entry per frame after the first, each frame being searched in
    /// the one before it.
    pub pairs: Vec<PairResult>,
    /// The total number of frames read.
    pub frame_count: usize,
    /// Average speed (FPS)
    pub speed: f64,
}

/// Searches every frame of `frames` in the frame before it.
///
/// Pyramids are built and pairs searched in parallel; each worker owns its
/// own [`MotionAnalysis`]. With temporal prediction the pairs depend on each
/// other and are searched in order.
///
/// # Errors
///
/// - If `opts` cannot be applied to frames of this size.
#[inline]
pub fn analyze_frames<T: Pixel>(
    frames: &[Frame<T>],
    chroma_sampling: ChromaSampling,
    bit_depth: usize,
    opts: &AnalysisOptions,
) -> anyhow::Result<Vec<PairResult>> {
    let Some(first) = frames.first() else {
        log::warn!("no frames to analyze");
        return Ok(Vec::new());
    };
    if frames.len() < 2 {
        log::warn!("a single frame has no pair to search");
    }
    let (width, height) = (first.planes[0].cfg.width, first.planes[0].cfg.height);
    let template = MotionAnalysis::<T>::new(width, height, chroma_sampling, bit_depth, opts)
        .context("invalid analysis options")?;
    let cfg = template.pyramid_config();

    let pyramids: Vec<_> = frames
        .par_iter()
        .map(|frame| MvPyramid::new(frame, chroma_sampling, bit_depth, &cfg))
        .collect();

    if opts.temporal {
        let mut analysis = template;
        return Ok(pyramids
            .windows(2)
            .map(|pair| analysis.search_pair(&pair[1], &pair[0]))
            .collect());
    }

    Ok((1..pyramids.len())
        .into_par_iter()
        .map_init(
            || template.clone(),
            |analysis, n| analysis.search_pair(&pyramids[n], &pyramids[n - 1]),
        )
        .collect())
}

/// Runs through a y4m clip, searching every frame in the previous one.
///
/// Frames are decoded on the calling thread while the search runs on a
/// worker thread.
///
/// # Arguments
///
/// - `progress_callback`: An optional callback that will fire after each
///   frame is analyzed, with the number of frames analyzed and the number of
///   scene changes found so far.
///
/// # Errors
///
/// - If the stream format is unsupported or `opts` cannot be applied to it.
#[inline]
pub fn analyze_clip<R: Read, T: Pixel>(
    dec: &mut ::y4m::Decoder<R>,
    opts: &AnalysisOptions,
    frame_limit: Option<usize>,
    progress_callback: Option<&dyn Fn(usize, usize)>,
) -> anyhow::Result<ClipResults> {
    let details = crate::y4m::get_video_details(dec)?;
    let mut analysis = MotionAnalysis::<T>::new(
        details.width,
        details.height,
        details.chroma_sampling,
        details.bit_depth,
        opts,
    )
    .context("invalid analysis options")?;
    let cfg = analysis.pyramid_config();

    let (frame_tx, frame_rx) = sync_channel::<Arc<Frame<T>>>(FRAME_PREFETCH_DEPTH);
    let (progress_tx, progress_rx) = if progress_callback.is_some() {
        let (tx, rx) = channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };

    let analysis_handle = thread::spawn(move || -> ClipResults {
        let start_time = Instant::now();
        let mut pairs = Vec::new();
        let mut scene_changes = 0;
        let mut prev: Option<MvPyramid<T>> = None;
        let mut frameno = 0usize;

        while let Ok(frame) = frame_rx.recv() {
            let pyramid = MvPyramid::new(&frame, details.chroma_sampling, details.bit_depth, &cfg);
            if let Some(reference) = &prev {
                let result = analysis.search_pair(&pyramid, reference);
                if result.scene_change {
                    scene_changes += 1;
                    log::debug!("scene change at frame {}", frameno);
                }
                pairs.push(result);
            }
            prev = Some(pyramid);

            frameno += 1;
            if let Some(ref progress_tx) = progress_tx {
                let _ = progress_tx.send((frameno, scene_changes));
            }
        }

        ClipResults {
            pairs,
            frame_count: frameno,
            speed: frameno as f64 / start_time.elapsed().as_secs_f64(),
        }
    });

    let drain_progress = || {
        if let (Some(progress_rx), Some(progress_fn)) = (&progress_rx, progress_callback) {
            while let Ok((frames, scene_changes)) = progress_rx.try_recv() {
                progress_fn(frames, scene_changes);
            }
        }
    };

    let mut produced = 0usize;
    while frame_limit.is_none_or(|limit| produced < limit) {
        match crate::y4m::read_video_frame::<R, T>(dec, &details) {
            Ok(frame) => {
                produced += 1;
                if frame_tx.send(Arc::new(frame)).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
        drain_progress();
    }

    drop(frame_tx);
    let results = analysis_handle
        .join()
        .map_err(|_| anyhow::anyhow!("motion analysis thread panicked"))?;
    drain_progress();

    Ok(results)
}
