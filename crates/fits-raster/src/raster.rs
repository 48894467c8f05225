//! In-memory planar rasters and the row-source seam used by the encoder.

use std::ops::Range;

use crate::classify::{ColorMode, Depth};
use crate::error::{CodecError, Result};

/// Allocate `len` default-initialized samples, reporting failure instead of
/// aborting.
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CodecError::OutOfMemory { bytes })?;
    v.resize(len, T::default());
    Ok(v)
}

/// Sample storage of a [`RasterImage`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Bytes(Vec<u8>),
    Floats(Vec<f32>),
}

impl PixelBuffer {
    pub fn depth(&self) -> Depth {
        match self {
            PixelBuffer::Bytes(_) => Depth::Eight,
            PixelBuffer::Floats(_) => Depth::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::Bytes(v) => v.len(),
            PixelBuffer::Floats(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A planar image: `planes` planes of `height` rows of `width` samples,
/// stored plane-major then row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    planes: usize,
    buffer: PixelBuffer,
}

impl RasterImage {
    /// A zero-filled raster.
    pub fn new(width: usize, height: usize, planes: usize, depth: Depth) -> Result<Self> {
        let len = sample_count(width, height, planes)?;
        let buffer = match depth {
            Depth::Eight => PixelBuffer::Bytes(try_zeroed(len)?),
            Depth::Float32 => PixelBuffer::Floats(try_zeroed(len)?),
        };
        Ok(RasterImage {
            width,
            height,
            planes,
            buffer,
        })
    }

    /// Wrap an existing buffer. Returns `None` when its length does not
    /// match the dimensions.
    pub fn from_buffer(width: usize, height: usize, planes: usize, buffer: PixelBuffer) -> Option<Self> {
        let len = width.checked_mul(height)?.checked_mul(planes)?;
        (buffer.len() == len).then_some(RasterImage {
            width,
            height,
            planes,
            buffer,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn planes(&self) -> usize {
        self.planes
    }

    pub fn depth(&self) -> Depth {
        self.buffer.depth()
    }

    /// `None` for plane counts no host mode represents.
    pub fn color_mode(&self) -> Option<ColorMode> {
        ColorMode::from_planes(self.planes).ok()
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    fn row_range(&self, plane: usize, row: usize) -> Option<Range<usize>> {
        if plane >= self.planes || row >= self.height {
            return None;
        }
        let start = (plane * self.height + row) * self.width;
        Some(start..start + self.width)
    }

    pub fn byte_row(&self, plane: usize, row: usize) -> Option<&[u8]> {
        let range = self.row_range(plane, row)?;
        match &self.buffer {
            PixelBuffer::Bytes(v) => Some(&v[range]),
            PixelBuffer::Floats(_) => None,
        }
    }

    pub fn float_row(&self, plane: usize, row: usize) -> Option<&[f32]> {
        let range = self.row_range(plane, row)?;
        match &self.buffer {
            PixelBuffer::Floats(v) => Some(&v[range]),
            PixelBuffer::Bytes(_) => None,
        }
    }

    pub fn float_row_mut(&mut self, plane: usize, row: usize) -> Option<&mut [f32]> {
        let range = self.row_range(plane, row)?;
        match &mut self.buffer {
            PixelBuffer::Floats(v) => Some(&mut v[range]),
            PixelBuffer::Bytes(_) => None,
        }
    }

    pub fn byte_row_mut(&mut self, plane: usize, row: usize) -> Option<&mut [u8]> {
        let range = self.row_range(plane, row)?;
        match &mut self.buffer {
            PixelBuffer::Bytes(v) => Some(&mut v[range]),
            PixelBuffer::Floats(_) => None,
        }
    }
}

fn sample_count(width: usize, height: usize, planes: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(planes))
        .ok_or(CodecError::OutOfMemory { bytes: usize::MAX })
}

/// Row-at-a-time access to an image that is about to be written.
///
/// Hosts with their own pixel storage implement this instead of copying into
/// a [`RasterImage`].
pub trait ScanlineSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn planes(&self) -> usize;
    /// 8, 16 or 32. Samples of 32 bits are `f32`.
    fn bits_per_channel(&self) -> u32;
    /// The native-endian bytes of row `row` of plane `plane`.
    fn scanline(&self, plane: usize, row: usize) -> &[u8];
}

impl ScanlineSource for RasterImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn planes(&self) -> usize {
        self.planes
    }

    fn bits_per_channel(&self) -> u32 {
        self.depth().bits()
    }

    fn scanline(&self, plane: usize, row: usize) -> &[u8] {
        let Some(range) = self.row_range(plane, row) else {
            return &[];
        };
        match &self.buffer {
            PixelBuffer::Bytes(v) => &v[range],
            PixelBuffer::Floats(v) => bytemuck::cast_slice(&v[range]),
        }
    }
}
