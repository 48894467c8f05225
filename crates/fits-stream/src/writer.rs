//! Sequential writer for a single primary image.

use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::block::{write_padding, DATA_PAD_BYTE};
use crate::card::{serialize_header, Card};
use crate::error::{Error, Result};
use crate::sample::{encode_f32, encode_u16, Bitpix, U16_BZERO};
use crate::value::{parse_value_text, Value};

/// Keywords the writer derives from the image itself.
const RESERVED: [&str; 10] = [
    "SIMPLE", "BITPIX", "NAXIS", "EXTEND", "PCOUNT", "GCOUNT", "BSCALE", "BZERO", "BLANK", "END",
];

/// Returns `true` for keywords that describe the data layout (SIMPLE, BITPIX,
/// NAXIS, NAXISn, EXTEND, PCOUNT, GCOUNT, BSCALE, BZERO, BLANK, END) and
/// therefore cannot be set through [`FitsWriter::add_key`].
pub fn is_reserved_keyword(name: &str) -> bool {
    if RESERVED.contains(&name) || name == "XTENSION" {
        return true;
    }
    name.strip_prefix("NAXIS")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// On-disk sample type of a written image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStorage {
    /// BITPIX 8.
    Byte,
    /// BITPIX 16 with BZERO 32768.
    UnsignedShort,
    /// BITPIX -32.
    Float,
}

impl ImageStorage {
    pub fn bitpix(self) -> Bitpix {
        match self {
            ImageStorage::Byte => Bitpix::U8,
            ImageStorage::UnsignedShort => Bitpix::I16,
            ImageStorage::Float => Bitpix::F32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageStorage::Byte => "BYTE_IMG",
            ImageStorage::UnsignedShort => "USHORT_IMG",
            ImageStorage::Float => "FLOAT_IMG",
        }
    }
}

fn structural_cards(storage: ImageStorage, naxes: &[usize]) -> Result<Vec<Card>> {
    let mut cards = vec![
        Card::new("SIMPLE", Value::Logical(true), Some("conforms to FITS standard"))?,
        Card::new(
            "BITPIX",
            Value::Integer(storage.bitpix().code()),
            Some("bits per data value"),
        )?,
        Card::new("NAXIS", Value::Integer(naxes.len() as i64), Some("number of axes"))?,
    ];
    for (i, &dim) in naxes.iter().enumerate() {
        cards.push(Card::new(&format!("NAXIS{}", i + 1), Value::Integer(dim as i64), None)?);
    }
    cards.push(Card::new(
        "EXTEND",
        Value::Logical(true),
        Some("FITS dataset may contain extensions"),
    )?);
    if storage == ImageStorage::UnsignedShort {
        cards.push(Card::new("BZERO", Value::Float(U16_BZERO), Some("offset data range to that of unsigned short"))?);
        cards.push(Card::new("BSCALE", Value::Float(1.0), Some("default scaling factor"))?);
    }
    Ok(cards)
}

/// Creates a FITS file holding one primary image, written row by row.
///
/// Keywords are buffered until the first pixel is written; the header is
/// then flushed and closed. [`FitsWriter::finish`] pads the data segment to a
/// whole block. Dropping the writer without finishing leaves whatever was
/// already written in the stream.
pub struct FitsWriter<W> {
    inner: W,
    storage: ImageStorage,
    cards: Vec<Card>,
    commentary: Vec<Card>,
    header_written: bool,
    written: usize,
    total: usize,
}

impl<W: Write + Seek> FitsWriter<W> {
    /// Rewind `inner` and prepare an image of the given storage and shape.
    pub fn create(mut inner: W, storage: ImageStorage, naxes: &[usize]) -> Result<Self> {
        let total = naxes
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(Error::InvalidHeader("pixel count overflow"))?;
        let cards = structural_cards(storage, naxes)?;
        inner.seek(SeekFrom::Start(0))?;
        debug!(storage = storage.name(), ?naxes, "creating FITS image");
        Ok(FitsWriter {
            inner,
            storage,
            cards,
            commentary: Vec::new(),
            header_written: false,
            written: 0,
            total,
        })
    }

    pub fn storage(&self) -> ImageStorage {
        self.storage
    }

    /// Set a keyword from its literal text (`T`, `42`, `'M31'`, ...).
    ///
    /// An existing keyword of the same name is replaced. Text that is not a
    /// valid literal is stored as a string.
    pub fn add_key(&mut self, name: &str, literal: &str, comment: Option<&str>) -> Result<()> {
        if self.header_written {
            return Err(Error::HeaderClosed);
        }
        if is_reserved_keyword(name) {
            return Err(Error::ReservedKeyword(name.to_string()));
        }
        let card = Card::new(name, parse_value_text(literal), comment)?;
        match self.cards.iter_mut().find(|c| c.keyword == card.keyword) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
        Ok(())
    }

    /// Append a COMMENT or HISTORY card. These follow all keyword cards.
    pub fn add_commentary(&mut self, name: &str, text: &str) -> Result<()> {
        if self.header_written {
            return Err(Error::HeaderClosed);
        }
        self.commentary.push(Card::commentary(name, text)?);
        Ok(())
    }

    fn ensure_header(&mut self) -> Result<()> {
        if !self.header_written {
            let mut cards = std::mem::take(&mut self.cards);
            cards.append(&mut self.commentary);
            let bytes = serialize_header(&cards);
            self.inner.write_all(&bytes)?;
            debug!(cards = cards.len(), bytes = bytes.len(), "header written");
            self.cards = cards;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_samples(&mut self, storage: ImageStorage, count: usize, bytes: &[u8]) -> Result<()> {
        if storage != self.storage {
            return Err(Error::StorageMismatch(self.storage.name()));
        }
        let end = self.written.saturating_add(count);
        if end > self.total {
            return Err(Error::OutOfRange {
                start: self.written,
                end,
                total: self.total,
            });
        }
        self.ensure_header()?;
        self.inner.write_all(bytes)?;
        self.written = end;
        Ok(())
    }

    /// Append 8-bit samples.
    pub fn write_u8(&mut self, pixels: &[u8]) -> Result<()> {
        self.write_samples(ImageStorage::Byte, pixels.len(), pixels)
    }

    /// Append unsigned 16-bit samples.
    pub fn write_u16(&mut self, pixels: &[u16]) -> Result<()> {
        self.write_samples(ImageStorage::UnsignedShort, pixels.len(), &encode_u16(pixels))
    }

    /// Append 32-bit float samples.
    pub fn write_f32(&mut self, pixels: &[f32]) -> Result<()> {
        self.write_samples(ImageStorage::Float, pixels.len(), &encode_f32(pixels))
    }

    /// Verify every pixel was written, pad the data segment, and flush.
    pub fn finish(mut self) -> Result<W> {
        if self.written != self.total {
            return Err(Error::IncompleteData {
                written: self.written,
                expected: self.total,
            });
        }
        self.ensure_header()?;
        let data_len = self.total * self.storage.bitpix().bytes_per_sample();
        write_padding(&mut self.inner, data_len, DATA_PAD_BYTE)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}
