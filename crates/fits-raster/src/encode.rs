//! Row source to FITS primary image.

use std::io::{Seek, Write};
use std::time::Instant;

use fits_stream::{Error as FitsError, FitsWriter, ImageStorage, Value};
use tracing::{debug, info, info_span, trace, warn};

use crate::error::{CodecError, Result};
use crate::metadata::HeaderMetadata;
use crate::progress::{Progress, Tracker};
use crate::raster::ScanlineSource;

/// On-disk storage for a host depth: 8 to BYTE_IMG, 16 to USHORT_IMG and 32
/// to FLOAT_IMG.
pub fn storage_for_depth(bits: u32) -> Result<ImageStorage> {
    match bits {
        8 => Ok(ImageStorage::Byte),
        16 => Ok(ImageStorage::UnsignedShort),
        32 => Ok(ImageStorage::Float),
        other => Err(CodecError::write_reason(format!(
            "{other}-bit images cannot be saved as FITS"
        ))),
    }
}

/// Bytes of sample data the image will occupy: `ceil(width * depth / 8)`
/// per scanline. Header and block padding are not counted.
pub fn estimated_size<S: ScanlineSource + ?Sized>(source: &S) -> u64 {
    let row = (source.width() as u64 * u64::from(source.bits_per_channel())).div_ceil(8);
    row * source.height() as u64 * source.planes() as u64
}

/// Literal text the writer parses back into the same value. Booleans go out
/// as `T`/`F` so they stay logical.
fn keyword_literal(value: &Value) -> String {
    match value {
        Value::Logical(true) => String::from("T"),
        Value::Logical(false) => String::from("F"),
        other => other.to_literal(),
    }
}

/// Queue every carried-over keyword and commentary line on `writer`.
///
/// Layout keywords are skipped since the writer derives them from the image.
/// Keywords whose names the writer refuses are logged and dropped. Returns
/// the number of keywords queued.
pub fn replay_metadata<W: Write + Seek>(writer: &mut FitsWriter<W>, metadata: &HeaderMetadata) -> Result<usize> {
    let mut replayed = 0;
    for (name, keyword) in metadata.replayable_keywords() {
        let literal = keyword_literal(&keyword.value);
        match writer.add_key(name, &literal, keyword.comment.as_deref()) {
            Ok(()) => {
                trace!(keyword = name, value = %literal, "keyword");
                replayed += 1;
            }
            Err(FitsError::InvalidKeyword(_)) => warn!(keyword = name, "dropping keyword with invalid name"),
            Err(e) => return Err(CodecError::write(e)),
        }
    }
    for line in &metadata.commentary {
        writer
            .add_commentary(&line.keyword, &line.text)
            .map_err(CodecError::write)?;
    }
    Ok(replayed)
}

/// Write `source` as a three-axis primary image `[width, height, planes]`.
///
/// Rows go out plane by plane. `progress` sees `height * planes` scanlines.
/// On any failure, including cancellation, the image is left unfinished and
/// the stream is dropped.
pub fn encode<W, S, P>(stream: W, source: &S, metadata: Option<&HeaderMetadata>, progress: &mut P) -> Result<W>
where
    W: Write + Seek,
    S: ScanlineSource + ?Sized,
    P: Progress + ?Sized,
{
    let _span = info_span!("fits_encode").entered();
    let started = Instant::now();

    let storage = storage_for_depth(source.bits_per_channel())?;
    let (width, height, planes) = (source.width(), source.height(), source.planes());
    info!(width, height, planes, storage = storage.name(), "writing");

    let mut writer = FitsWriter::create(stream, storage, &[width, height, planes]).map_err(CodecError::write)?;
    if let Some(meta) = metadata {
        let replayed = replay_metadata(&mut writer, meta)?;
        debug!(replayed, commentary = meta.commentary.len(), "metadata queued");
    }

    let row_bytes = width * source.bits_per_channel() as usize / 8;
    let mut tracker = Tracker::new(progress, height * planes);
    tracker.start()?;
    for plane in 0..planes {
        for row in 0..height {
            let line = source.scanline(plane, row);
            if line.len() != row_bytes {
                return Err(CodecError::write_reason(format!(
                    "scanline {row} of plane {plane} has {} bytes, expected {row_bytes}",
                    line.len()
                )));
            }
            let written = match storage {
                ImageStorage::Byte => writer.write_u8(line),
                ImageStorage::UnsignedShort => writer.write_u16(&bytemuck::pod_collect_to_vec::<u8, u16>(line)),
                ImageStorage::Float => writer.write_f32(&bytemuck::pod_collect_to_vec::<u8, f32>(line)),
            };
            written.map_err(CodecError::write)?;
            tracker.advance(1)?;
        }
    }

    let stream = writer.finish().map_err(CodecError::write)?;
    info!(elapsed = ?started.elapsed(), "encode complete");
    Ok(stream)
}
