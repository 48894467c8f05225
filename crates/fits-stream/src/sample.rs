//! BITPIX sample types and big-endian sample conversion.
//!
//! FITS stores every binary sample most-significant byte first. Decoding
//! goes straight to `f32` with the BSCALE/BZERO transform applied; encoding
//! covers the three storage types the raster writer emits.

use bytemuck::pod_collect_to_vec;

use crate::error::{Error, Result};

/// BZERO that maps unsigned 16-bit samples onto signed BITPIX 16 storage.
pub const U16_BZERO: f64 = 32768.0;

/// Pixel storage type encoded by the BITPIX keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitpix {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Bitpix {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            8 => Ok(Bitpix::U8),
            16 => Ok(Bitpix::I16),
            32 => Ok(Bitpix::I32),
            64 => Ok(Bitpix::I64),
            -32 => Ok(Bitpix::F32),
            -64 => Ok(Bitpix::F64),
            other => Err(Error::InvalidBitpix(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Bitpix::U8 => 8,
            Bitpix::I16 => 16,
            Bitpix::I32 => 32,
            Bitpix::I64 => 64,
            Bitpix::F32 => -32,
            Bitpix::F64 => -64,
        }
    }

    /// Sample width in bits (`|BITPIX|`).
    pub fn bits(self) -> u32 {
        self.code().unsigned_abs() as u32
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }

    pub fn is_float(self) -> bool {
        self.code() < 0
    }

    /// The cfitsio image-type name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Bitpix::U8 => "BYTE_IMG",
            Bitpix::I16 => "SHORT_IMG",
            Bitpix::I32 => "LONG_IMG",
            Bitpix::I64 => "LONGLONG_IMG",
            Bitpix::F32 => "FLOAT_IMG",
            Bitpix::F64 => "DOUBLE_IMG",
        }
    }
}

/// Linear transform from stored to physical values: `physical = raw * bscale + bzero`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub bscale: f64,
    pub bzero: f64,
}

impl Scaling {
    pub const IDENTITY: Scaling = Scaling {
        bscale: 1.0,
        bzero: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        self.bscale == 1.0 && self.bzero == 0.0
    }

    #[inline]
    fn apply(&self, raw: f64) -> f32 {
        (raw * self.bscale + self.bzero) as f32
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::IDENTITY
    }
}

fn be_array<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Decode big-endian samples of type `bitpix` into `out`, applying `scaling`.
///
/// `raw` must hold exactly `out.len()` samples.
pub fn decode_f32(bitpix: Bitpix, raw: &[u8], scaling: Scaling, out: &mut [f32]) -> Result<()> {
    let width = bitpix.bytes_per_sample();
    if raw.len() != out.len() * width {
        return Err(Error::UnexpectedEof);
    }
    let chunks = raw.chunks_exact(width);
    let identity = scaling.is_identity();

    macro_rules! convert {
        ($decode:expr) => {
            for (dst, chunk) in out.iter_mut().zip(chunks) {
                let v = $decode(chunk);
                *dst = if identity { v as f32 } else { scaling.apply(v as f64) };
            }
        };
    }

    match bitpix {
        Bitpix::U8 => convert!(|c: &[u8]| c[0]),
        Bitpix::I16 => convert!(|c: &[u8]| i16::from_be_bytes(be_array(c))),
        Bitpix::I32 => convert!(|c: &[u8]| i32::from_be_bytes(be_array(c))),
        Bitpix::I64 => convert!(|c: &[u8]| i64::from_be_bytes(be_array(c))),
        Bitpix::F32 => convert!(|c: &[u8]| f32::from_be_bytes(be_array(c))),
        Bitpix::F64 => convert!(|c: &[u8]| f64::from_be_bytes(be_array(c))),
    }
    Ok(())
}

/// Big-endian bytes for a row of `f32` samples.
pub fn encode_f32(pixels: &[f32]) -> Vec<u8> {
    let mut buf: Vec<u8> = pod_collect_to_vec(pixels);
    for chunk in buf.chunks_exact_mut(4) {
        let v = f32::from_ne_bytes(be_array(chunk));
        chunk.copy_from_slice(&v.to_be_bytes());
    }
    buf
}

/// Big-endian bytes for a row of unsigned 16-bit samples stored with
/// BZERO = 32768 (the signed value is `v - 32768`).
pub fn encode_u16(pixels: &[u16]) -> Vec<u8> {
    let mut buf: Vec<u8> = pod_collect_to_vec(pixels);
    for chunk in buf.chunks_exact_mut(2) {
        let v = u16::from_ne_bytes(be_array(chunk)) ^ 0x8000;
        chunk.copy_from_slice(&v.to_be_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitpix_codes_round_trip() {
        for code in [8, 16, 32, 64, -32, -64] {
            assert_eq!(Bitpix::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(Bitpix::from_code(12), Err(Error::InvalidBitpix(12))));
    }

    #[test]
    fn bitpix_widths() {
        assert_eq!(Bitpix::I16.bits(), 16);
        assert_eq!(Bitpix::F64.bytes_per_sample(), 8);
        assert!(Bitpix::F32.is_float());
        assert!(!Bitpix::I32.is_float());
        assert_eq!(Bitpix::I64.name(), "LONGLONG_IMG");
    }

    #[test]
    fn decode_i16_with_scaling() {
        let raw = [0x00, 0x02, 0xFF, 0xFE];
        let mut out = [0f32; 2];
        let scaling = Scaling {
            bscale: 0.5,
            bzero: 10.0,
        };
        decode_f32(Bitpix::I16, &raw, scaling, &mut out).unwrap();
        assert_eq!(out, [11.0, 9.0]);
    }

    #[test]
    fn decode_f64_identity() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1.25f64.to_be_bytes());
        raw.extend_from_slice(&(-3.0f64).to_be_bytes());
        let mut out = [0f32; 2];
        decode_f32(Bitpix::F64, &raw, Scaling::IDENTITY, &mut out).unwrap();
        assert_eq!(out, [1.25, -3.0]);
    }

    #[test]
    fn decode_length_mismatch() {
        let mut out = [0f32; 3];
        assert!(decode_f32(Bitpix::I32, &[0u8; 8], Scaling::IDENTITY, &mut out).is_err());
    }

    #[test]
    fn encode_f32_is_big_endian() {
        let bytes = encode_f32(&[1.0, -2.0]);
        assert_eq!(&bytes[..4], &1.0f32.to_be_bytes());
        assert_eq!(&bytes[4..], &(-2.0f32).to_be_bytes());
    }

    #[test]
    fn encode_u16_offsets_by_bzero() {
        let bytes = encode_u16(&[0, 32768, 65535]);
        let stored: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(stored, vec![-32768, 0, 32767]);

        let mut out = [0f32; 3];
        let scaling = Scaling {
            bscale: 1.0,
            bzero: U16_BZERO,
        };
        decode_f32(Bitpix::I16, &bytes, scaling, &mut out).unwrap();
        assert_eq!(out, [0.0, 32768.0, 65535.0]);
    }
}
