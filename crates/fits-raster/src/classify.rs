//! Decide how a FITS primary image is represented in memory.

use fits_stream::{Bitpix, Scaling};

use crate::error::Unsupported;

/// Per-channel sample type of a [`RasterImage`](crate::raster::RasterImage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Eight,
    Float32,
}

impl Depth {
    pub fn bits(self) -> u32 {
        match self {
            Depth::Eight => 8,
            Depth::Float32 => 32,
        }
    }

    pub fn bytes_per_channel(self) -> usize {
        self.bits() as usize / 8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Grayscale,
    Rgb,
}

impl ColorMode {
    /// One plane is grayscale, three or more is color; two is unsupported.
    pub fn from_planes(planes: usize) -> Result<Self, Unsupported> {
        match planes {
            1 => Ok(ColorMode::Grayscale),
            n if n >= 3 => Ok(ColorMode::Rgb),
            n => Err(Unsupported::Planes(n)),
        }
    }
}

/// Outcome of classifying a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub width: usize,
    pub height: usize,
    pub planes: usize,
    pub bitpix: Bitpix,
    /// `|BITPIX|` of the source.
    pub input_depth: u32,
    pub depth: Depth,
    pub color_mode: ColorMode,
}

impl Classification {
    /// Scanlines in the image (one row of one plane each).
    pub fn scanlines(&self) -> usize {
        self.height * self.planes
    }
}

/// Pixel-type name for diagnostics, including codes `Bitpix` does not model.
pub(crate) fn pixel_type_name(code: i64) -> String {
    match Bitpix::from_code(code) {
        Ok(b) => b.name().to_string(),
        Err(_) => format!("unknown (BITPIX = {code})"),
    }
}

/// Map source pixel type and axes to a working depth and color mode.
///
/// | source                      | working depth |
/// |-----------------------------|---------------|
/// | BITPIX 8, identity scaling  | 8             |
/// | BITPIX 8, scaled            | 32 (float)    |
/// | BITPIX 16, 32, -32, 64, -64 | 32 (float)    |
pub fn classify(bitpix: i64, naxes: &[usize], scaling: Scaling) -> Result<Classification, Unsupported> {
    match naxes.len() {
        0 => return Err(Unsupported::NoImage),
        2 | 3 => {}
        n => return Err(Unsupported::Dimensionality(n)),
    }

    let pixel = Bitpix::from_code(bitpix).map_err(|_| Unsupported::PixelType(pixel_type_name(bitpix)))?;
    let depth = match pixel {
        Bitpix::U8 if scaling.is_identity() => Depth::Eight,
        _ => Depth::Float32,
    };

    let (width, height) = (naxes[0], naxes[1]);
    let planes = naxes.get(2).copied().unwrap_or(1);
    let color_mode = ColorMode::from_planes(planes)?;
    if width == 0 || height == 0 || planes == 0 {
        return Err(Unsupported::EmptyAxis);
    }

    Ok(Classification {
        width,
        height,
        planes,
        bitpix: pixel,
        input_depth: pixel.bits(),
        depth,
        color_mode,
    })
}
