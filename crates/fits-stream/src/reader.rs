//! Sequential reader for the primary image of a FITS stream.

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::block::{checked_padded_byte_len, BLOCK_SIZE, CARD_SIZE};
use crate::card::{parse_card, Card};
use crate::error::{eof_aware, Error, Result};
use crate::sample::{decode_f32, Bitpix, Scaling};
use crate::value::Value;

/// Shape and sample encoding of the primary image, as declared by its header.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    /// Raw BITPIX code. Not validated here so callers can report unsupported
    /// codes in their own terms.
    pub bitpix: i64,
    /// Axis lengths NAXIS1..NAXISn; empty when the primary HDU has no image.
    pub naxes: Vec<usize>,
    pub scaling: Scaling,
}

impl ImageHeader {
    /// Number of samples in the image; 0 when there are no axes.
    pub fn pixel_count(&self) -> Result<usize> {
        if self.naxes.is_empty() {
            return Ok(0);
        }
        self.naxes
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(Error::InvalidHeader("pixel count overflow"))
    }
}

fn integer(cards: &[Card], name: &str) -> Option<i64> {
    cards.iter().find_map(|c| match &c.value {
        Some(Value::Integer(n)) if c.name() == name => Some(*n),
        _ => None,
    })
}

fn number(cards: &[Card], name: &str) -> Option<f64> {
    cards
        .iter()
        .find(|c| c.name() == name)
        .and_then(|c| c.value.as_ref())
        .and_then(Value::as_f64)
}

fn string(cards: &[Card], name: &str) -> Option<String> {
    cards.iter().find_map(|c| match &c.value {
        Some(Value::String(s)) if c.name() == name => Some(s.trim().to_string()),
        _ => None,
    })
}

fn logical(cards: &[Card], name: &str) -> Option<bool> {
    cards.iter().find_map(|c| match &c.value {
        Some(Value::Logical(b)) if c.name() == name => Some(*b),
        _ => None,
    })
}

fn axes(cards: &[Card]) -> Result<Vec<usize>> {
    let naxis = integer(cards, "NAXIS").ok_or(Error::MissingKeyword("NAXIS"))?;
    if naxis < 0 {
        return Err(Error::InvalidHeader("negative NAXIS"));
    }
    (1..=naxis)
        .map(|i| {
            let dim = integer(cards, &format!("NAXIS{i}")).ok_or(Error::MissingKeyword("NAXISn"))?;
            usize::try_from(dim).map_err(|_| Error::InvalidHeader("negative NAXISn"))
        })
        .collect()
}

/// Check the mandatory SIMPLE / BITPIX / NAXIS sequence of a primary header.
fn validate_primary(cards: &[Card]) -> Result<()> {
    let expect = |index: usize, name: &'static str| match cards.get(index) {
        Some(c) if c.name() == name => Ok(c),
        _ => Err(Error::MissingKeyword(name)),
    };
    let simple = expect(0, "SIMPLE")?;
    if simple.value != Some(Value::Logical(true)) {
        return Err(Error::InvalidHeader("SIMPLE must be T"));
    }
    if !matches!(expect(1, "BITPIX")?.value, Some(Value::Integer(_))) {
        return Err(Error::InvalidHeader("BITPIX must be an integer"));
    }
    expect(2, "NAXIS")?;
    Ok(())
}

/// Byte length of the data segment described by `cards` (unpadded):
/// `|BITPIX|/8 * GCOUNT * (PCOUNT + NAXIS1 * ... * NAXISn)`.
fn data_byte_len(cards: &[Card], is_primary: bool) -> Result<usize> {
    let bitpix = integer(cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?;
    let dims = axes(cards)?;
    if dims.is_empty() {
        return Ok(0);
    }
    // Random groups set NAXIS1 = 0 and leave it out of the product.
    let groups = is_primary && dims[0] == 0 && logical(cards, "GROUPS") == Some(true);
    let dims = if groups { &dims[1..] } else { &dims[..] };
    let product = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(Error::InvalidHeader("data size overflow"))?;

    let (pcount, gcount) = if is_primary && !groups {
        (0, 1)
    } else {
        let pcount = integer(cards, "PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = integer(cards, "GCOUNT").unwrap_or(1).max(1) as usize;
        (pcount, gcount)
    };

    let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
    pcount
        .checked_add(product)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or(Error::InvalidHeader("data size overflow"))
}

/// On-disk length of the data segment described by `cards`, padded to whole
/// blocks.
fn padded_data_len(cards: &[Card], is_primary: bool) -> Result<u64> {
    checked_padded_byte_len(data_byte_len(cards, is_primary)?)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(Error::InvalidHeader("data size overflow"))
}

/// Fill `buf` from `r`, stopping early only at end of stream. Returns the
/// number of bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read header blocks until the END card. Returns the cards (END excluded)
/// and the header length in bytes.
fn read_header<R: Read>(r: &mut R, first_block: &[u8; BLOCK_SIZE]) -> Result<(Vec<Card>, usize)> {
    let mut cards = Vec::new();
    let mut block = *first_block;
    let mut len = 0;
    loop {
        len += BLOCK_SIZE;
        for chunk in block.chunks_exact(CARD_SIZE) {
            let bytes: &[u8; CARD_SIZE] = chunk
                .try_into()
                .map_err(|_| Error::InvalidHeader("short card"))?;
            let card = parse_card(bytes)?;
            if card.is_end() {
                return Ok((cards, len));
            }
            cards.push(card);
        }
        r.read_exact(&mut block).map_err(eof_aware)?;
    }
}

/// A FITS stream opened at its primary header.
///
/// Reads are positioned by absolute pixel index; the reader only seeks when
/// the requested offset differs from where the last read left the stream, so
/// a caller walking the image in order produces purely sequential I/O.
pub struct FitsReader<R> {
    inner: R,
    cards: Vec<Card>,
    image: ImageHeader,
    data_start: u64,
    pos: Option<u64>,
    scratch: Vec<u8>,
}

impl<R: Read + Seek> FitsReader<R> {
    /// Rewind `inner` and parse the primary header.
    pub fn open(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let mut block = [0u8; BLOCK_SIZE];
        inner.read_exact(&mut block).map_err(eof_aware)?;
        let (cards, header_len) = read_header(&mut inner, &block)?;
        validate_primary(&cards)?;

        let image = ImageHeader {
            bitpix: integer(&cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?,
            naxes: axes(&cards)?,
            scaling: Scaling {
                bscale: number(&cards, "BSCALE").unwrap_or(1.0),
                bzero: number(&cards, "BZERO").unwrap_or(0.0),
            },
        };
        debug!(
            bitpix = image.bitpix,
            naxes = ?image.naxes,
            cards = cards.len(),
            header_len,
            "opened FITS primary header"
        );

        Ok(FitsReader {
            inner,
            cards,
            image,
            data_start: header_len as u64,
            pos: Some(header_len as u64),
            scratch: Vec::new(),
        })
    }

    /// Every card of the primary header except END, in file order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn image(&self) -> &ImageHeader {
        &self.image
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        if self.pos != Some(offset) {
            trace!(offset, "seek");
            self.inner.seek(SeekFrom::Start(offset))?;
        }
        self.pos = Some(offset);
        Ok(())
    }

    /// Names of every extension HDU following the primary, in file order.
    ///
    /// Only headers are read; each data segment is skipped by seeking past
    /// it. Extensions without EXTNAME are reported as `HDU n`. Trailing bytes
    /// that do not form an XTENSION header end the walk.
    pub fn extension_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut offset = self
            .data_start
            .checked_add(padded_data_len(&self.cards, true)?)
            .ok_or(Error::InvalidHeader("data size overflow"))?;
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            self.seek_to(offset)?;
            let got = read_full(&mut self.inner, &mut block)?;
            self.pos = None;
            if got < BLOCK_SIZE || &block[..8] != b"XTENSION" {
                if got > 0 {
                    debug!(offset, got, "ignoring trailing bytes after last HDU");
                }
                break;
            }
            let (cards, header_len) = read_header(&mut self.inner, &block)?;
            let index = names.len() + 1;
            let name = string(&cards, "EXTNAME").unwrap_or_else(|| format!("HDU {index}"));
            debug!(index, name = %name, "found extension");
            names.push(name);
            let data_len = padded_data_len(&cards, false)?;
            offset = offset
                .checked_add(header_len as u64)
                .and_then(|o| o.checked_add(data_len))
                .ok_or(Error::InvalidHeader("data size overflow"))?;
        }
        Ok(names)
    }

    /// Read `out.len()` samples starting at pixel `first`, as physical
    /// values (BSCALE/BZERO applied).
    pub fn read_f32(&mut self, first: usize, out: &mut [f32]) -> Result<()> {
        let bitpix = Bitpix::from_code(self.image.bitpix)?;
        let len = self.checked_range(first, out.len())?;
        let width = bitpix.bytes_per_sample();
        self.read_raw(first * width, len * width)?;
        decode_f32(bitpix, &self.scratch, self.image.scaling, out)
    }

    /// Read raw 8-bit samples starting at pixel `first`, without scaling.
    pub fn read_u8(&mut self, first: usize, out: &mut [u8]) -> Result<()> {
        if self.image.bitpix != Bitpix::U8.code() {
            return Err(Error::StorageMismatch(Bitpix::U8.name()));
        }
        let len = self.checked_range(first, out.len())?;
        self.read_raw(first, len)?;
        out.copy_from_slice(&self.scratch);
        Ok(())
    }

    fn checked_range(&self, first: usize, len: usize) -> Result<usize> {
        let total = self.image.pixel_count()?;
        let end = first.saturating_add(len);
        if end > total {
            return Err(Error::OutOfRange {
                start: first,
                end,
                total,
            });
        }
        Ok(len)
    }

    fn read_raw(&mut self, byte_offset: usize, byte_len: usize) -> Result<()> {
        let offset = self.data_start + byte_offset as u64;
        self.seek_to(offset)?;
        self.scratch.resize(byte_len, 0);
        if let Err(e) = self.inner.read_exact(&mut self.scratch) {
            self.pos = None;
            return Err(eof_aware(e));
        }
        self.pos = Some(offset + byte_len as u64);
        Ok(())
    }

    /// Give the stream back to the caller.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
