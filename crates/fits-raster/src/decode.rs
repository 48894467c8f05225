//! FITS primary image to [`RasterImage`].

use std::io::{Read, Seek};
use std::time::Instant;

use fits_stream::{Bitpix, FitsReader};
use tracing::{debug, info, info_span};

use crate::classify::{classify, Classification, Depth};
use crate::error::{CodecError, Result};
use crate::metadata::HeaderMetadata;
use crate::progress::{Progress, Tracker};
use crate::raster::{try_zeroed, PixelBuffer, RasterImage};

/// A decoded image together with the header it came from.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub raster: RasterImage,
    pub metadata: HeaderMetadata,
    /// The map applied to float samples, when they were outside [0,1].
    pub normalization: Option<Normalization>,
}

/// Smallest and largest finite sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRange {
    pub min: f32,
    pub max: f32,
}

/// Scan `samples` for their range, skipping NaN and infinities. `None` when
/// no sample is finite.
pub fn sample_range(samples: &[f32]) -> Option<SampleRange> {
    samples
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some(SampleRange { min: v, max: v }),
            Some(r) => Some(SampleRange {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
}

/// Affine map `v -> (v + offset) * scale` into [0,1].
///
/// Held in `f64`: the span of two finite `f32` samples can exceed `f32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub offset: f64,
    pub scale: f64,
}

impl Normalization {
    /// The map for a sample range, or `None` when the range already lies in
    /// [0,1]. A degenerate range maps every sample to 0.
    pub fn for_range(range: SampleRange) -> Option<Self> {
        if range.min >= 0.0 && range.max <= 1.0 {
            return None;
        }
        let (min, max) = (f64::from(range.min), f64::from(range.max));
        let span = max - min;
        Some(Normalization {
            offset: -min,
            scale: if span > 0.0 { 1.0 / span } else { 1.0 },
        })
    }

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        ((f64::from(v) + self.offset) * self.scale) as f32
    }
}

/// Decode the primary image of `stream`.
///
/// `progress` sees `2 * height * planes` scanlines in total: one pass reading
/// the file and one pass producing the output.
pub fn decode<R, P>(stream: R, progress: &mut P) -> Result<Decoded>
where
    R: Read + Seek,
    P: Progress + ?Sized,
{
    let _span = info_span!("fits_decode").entered();
    let started = Instant::now();

    let mut reader = FitsReader::open(stream).map_err(CodecError::open)?;
    let image = reader.image().clone();
    let class = classify(image.bitpix, &image.naxes, image.scaling)?;
    info!(
        width = class.width,
        height = class.height,
        planes = class.planes,
        naxis = image.naxes.len(),
        "resolution"
    );
    info!(
        input = class.bitpix.name(),
        input_depth = class.input_depth,
        depth = class.depth.bits(),
        "pixel format"
    );

    let extension_names = reader.extension_names().map_err(CodecError::decode)?;
    let mut metadata = HeaderMetadata::capture(reader.cards(), &image, extension_names);
    debug!(
        keywords = metadata.keywords.len(),
        extensions = metadata.extension_names.len(),
        elapsed = ?started.elapsed(),
        "metadata captured"
    );

    let mut tracker = Tracker::new(progress, 2 * class.scanlines());
    tracker.start()?;
    let (raster, normalization) = match class.depth {
        Depth::Eight => (read_bytes(&mut reader, &class, &mut tracker)?, None),
        Depth::Float32 => {
            let (raster, norm) = read_floats(&mut reader, &class, &mut tracker)?;
            metadata.is_normalized = norm.is_some();
            metadata.is_converted = class.bitpix != Bitpix::F32;
            (raster, norm)
        }
    };

    info!(elapsed = ?started.elapsed(), "decode complete");
    Ok(Decoded {
        raster,
        metadata,
        normalization,
    })
}

fn read_bytes<R, P>(reader: &mut FitsReader<R>, class: &Classification, tracker: &mut Tracker<'_, P>) -> Result<RasterImage>
where
    R: Read + Seek,
    P: Progress + ?Sized,
{
    let plane_len = class.width * class.height;
    let mut samples: Vec<u8> = try_zeroed(plane_len * class.planes)?;

    for (plane, chunk) in samples.chunks_exact_mut(plane_len).enumerate() {
        reader.read_u8(plane * plane_len, chunk).map_err(CodecError::decode)?;
        tracker.advance(class.height)?;
    }
    for _ in 0..class.scanlines() {
        tracker.advance(1)?;
    }

    finish_raster(class, PixelBuffer::Bytes(samples))
}

fn read_floats<R, P>(
    reader: &mut FitsReader<R>,
    class: &Classification,
    tracker: &mut Tracker<'_, P>,
) -> Result<(RasterImage, Option<Normalization>)>
where
    R: Read + Seek,
    P: Progress + ?Sized,
{
    let started = Instant::now();
    let mut samples: Vec<f32> = try_zeroed(class.width * class.height * class.planes)?;

    for (line, row) in samples.chunks_exact_mut(class.width).enumerate() {
        reader
            .read_f32(line * class.width, row)
            .map_err(CodecError::decode)?;
        tracker.advance(1)?;
    }

    let range = sample_range(&samples);
    let norm = range.and_then(Normalization::for_range);
    debug!(?range, ?norm, elapsed = ?started.elapsed(), "sample range");

    for row in samples.chunks_exact_mut(class.width) {
        if let Some(n) = norm {
            row.iter_mut().for_each(|v| *v = n.apply(*v));
        }
        tracker.advance(1)?;
    }

    Ok((finish_raster(class, PixelBuffer::Floats(samples))?, norm))
}

fn finish_raster(class: &Classification, buffer: PixelBuffer) -> Result<RasterImage> {
    RasterImage::from_buffer(class.width, class.height, class.planes, buffer).ok_or_else(|| CodecError::Decode {
        source: fits_stream::Error::InvalidHeader("sample buffer does not match image shape"),
    })
}
