//! Cheap header-only compatibility check.

use std::io::{Read, Seek};

use fits_stream::{Bitpix, FitsReader};
use tracing::{debug, info_span};

use crate::classify::{pixel_type_name, ColorMode};
use crate::error::Unsupported;

/// Pixel types [`probe`] lets through.
///
/// Narrower than what [`decode`](crate::decode::decode) accepts: 32- and
/// 64-bit integers and 64-bit floats are decodable but reported here as
/// incompatible.
pub const PROBE_PIXEL_TYPES: [Bitpix; 3] = [Bitpix::U8, Bitpix::I16, Bitpix::F32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// The stream is not a readable FITS file.
    Unreadable(String),
    Unsupported(Unsupported),
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// Open the primary header and report whether this codec should claim the
/// file. Never reads pixel data.
pub fn probe<R: Read + Seek>(stream: R) -> Compatibility {
    let _span = info_span!("fits_probe").entered();
    let reader = match FitsReader::open(stream) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "probe: not a FITS file");
            return Compatibility::Unreadable(e.to_string());
        }
    };
    let image = reader.image();
    let verdict = check(image.bitpix, &image.naxes);
    debug!(bitpix = image.bitpix, naxes = ?image.naxes, ?verdict, "probe");
    match verdict {
        Ok(()) => Compatibility::Compatible,
        Err(u) => Compatibility::Unsupported(u),
    }
}

fn check(bitpix: i64, naxes: &[usize]) -> Result<(), Unsupported> {
    match naxes.len() {
        0 => return Err(Unsupported::NoImage),
        2 | 3 => {}
        n => return Err(Unsupported::Dimensionality(n)),
    }
    if let Some(&planes) = naxes.get(2) {
        ColorMode::from_planes(planes)?;
    }
    if !PROBE_PIXEL_TYPES.iter().any(|b| b.code() == bitpix) {
        return Err(Unsupported::PixelType(pixel_type_name(bitpix)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_pixel_types() {
        for code in [8, 16, -32] {
            assert_eq!(check(code, &[4, 4]), Ok(()), "BITPIX {code}");
        }
        for code in [32, 64, -64] {
            assert!(matches!(check(code, &[4, 4]), Err(Unsupported::PixelType(_))), "BITPIX {code}");
        }
    }

    #[test]
    fn shape_checks() {
        assert_eq!(check(8, &[]), Err(Unsupported::NoImage));
        assert_eq!(check(8, &[4]), Err(Unsupported::Dimensionality(1)));
        assert_eq!(check(8, &[4, 4, 2]), Err(Unsupported::Planes(2)));
        assert_eq!(check(8, &[4, 4, 3]), Ok(()));
    }
}
