//! Minimal y4m input.

use std::io::Read;

use anyhow::{Context, bail};
use num_rational::Rational32;
use v_frame::{
    frame::Frame,
    pixel::{ChromaSampling, Pixel},
};

/// Properties of a y4m stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VideoDetails {
    /// Luma width in pixels.
    pub width: usize,
    /// Luma height in pixels.
    pub height: usize,
    /// Bits per sample.
    pub bit_depth: usize,
    /// Chroma subsampling.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub chroma_sampling: ChromaSampling,
    /// Duration of one frame, in seconds.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub time_base: Rational32,
}

/// Reads the stream properties from the y4m header.
///
/// # Errors
///
/// - If the stream uses a colorspace without a matching chroma sampling.
#[inline]
pub fn get_video_details<R: Read>(dec: &y4m::Decoder<R>) -> anyhow::Result<VideoDetails> {
    let width = dec.get_width();
    let height = dec.get_height();
    let color_space = dec.get_colorspace();
    let bit_depth = color_space.get_bit_depth();
    let chroma_sampling = map_y4m_color_space(color_space)?;
    let framerate = dec.get_framerate();
    let time_base = Rational32::new(framerate.den as i32, framerate.num as i32);

    Ok(VideoDetails {
        width,
        height,
        bit_depth,
        chroma_sampling,
        time_base,
    })
}

fn map_y4m_color_space(color_space: y4m::Colorspace) -> anyhow::Result<ChromaSampling> {
    use y4m::Colorspace::{
        C420, C420jpeg, C420mpeg2, C420p10, C420p12, C420paldv, C422, C422p10, C422p12, C444,
        C444p10, C444p12, Cmono, Cmono12,
    };
    use ChromaSampling::{Cs400, Cs420, Cs422, Cs444};

    Ok(match color_space {
        Cmono | Cmono12 => Cs400,
        C420jpeg | C420paldv | C420mpeg2 | C420 | C420p10 | C420p12 => Cs420,
        C422 | C422p10 | C422p12 => Cs422,
        C444 | C444p10 | C444p12 => Cs444,
        other => bail!("unsupported y4m colorspace {:?}", other),
    })
}

/// Reads the next frame, without padding.
///
/// # Errors
///
/// - If no more frames can be read.
#[inline]
pub fn read_video_frame<R: Read, T: Pixel>(
    dec: &mut y4m::Decoder<R>,
    cfg: &VideoDetails,
) -> anyhow::Result<Frame<T>> {
    let bytes = dec.get_bytes_per_sample();
    let frame = dec.read_frame().context("failed to read y4m frame")?;

    let mut f: Frame<T> = Frame::new_with_padding(cfg.width, cfg.height, cfg.chroma_sampling, 0);
    let (chroma_width, _) = cfg
        .chroma_sampling
        .get_chroma_dimensions(cfg.width, cfg.height);

    f.planes[0].copy_from_raw_u8(frame.get_y_plane(), cfg.width * bytes, bytes);
    if cfg.chroma_sampling != ChromaSampling::Cs400 {
        f.planes[1].copy_from_raw_u8(frame.get_u_plane(), chroma_width * bytes, bytes);
        f.planes[2].copy_from_raw_u8(frame.get_v_plane(), chroma_width * bytes, bytes);
    }
    Ok(f)
}
