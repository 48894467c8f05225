//! 80-byte header cards: parsing, formatting, and block serialization.

use core::str;

use crate::block::{padded_byte_len, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

/// Keywords whose bytes 8..80 are free text rather than a value.
pub const COMMENTARY_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// A parsed FITS header card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The value, if the card carries a value indicator (`= ` at bytes 8..10)
    /// and a literal this crate understands.
    pub value: Option<Value>,
    /// Comment text, or the free text of a commentary card.
    pub comment: Option<String>,
}

impl Card {
    /// Build a value card, validating the keyword name.
    pub fn new(name: &str, value: Value, comment: Option<&str>) -> Result<Self> {
        Ok(Card {
            keyword: keyword_bytes(name)?,
            value: Some(value),
            comment: comment.map(String::from),
        })
    }

    /// Build a COMMENT, HISTORY or blank-keyword card.
    pub fn commentary(name: &str, text: &str) -> Result<Self> {
        if !COMMENTARY_KEYWORDS.contains(&name) {
            return Err(Error::InvalidKeyword(name.to_string()));
        }
        Ok(Card {
            keyword: keyword_bytes(name)?,
            value: None,
            comment: Some(text.to_string()),
        })
    }

    /// The keyword as a trimmed string.
    pub fn name(&self) -> &str {
        str::from_utf8(&self.keyword).unwrap_or("").trim_end()
    }

    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    pub fn is_commentary(&self) -> bool {
        COMMENTARY_KEYWORDS.contains(&self.name())
    }
}

/// Validate a keyword name and pad it to 8 bytes.
pub fn keyword_bytes(name: &str) -> Result<[u8; 8]> {
    let valid = name.len() <= 8
        && name
            .bytes()
            .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_'));
    if !valid {
        return Err(Error::InvalidKeyword(name.to_string()));
    }
    let mut buf = [b' '; 8];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}

fn free_text(bytes: &[u8]) -> Result<Option<String>> {
    let text = str::from_utf8(bytes)
        .map_err(|_| Error::InvalidHeader("non-ASCII card text"))?
        .trim_end();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Parse a single 80-byte card.
pub fn parse_card(bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&bytes[..8]);
    if !keyword
        .iter()
        .all(|&b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Error::InvalidKeyword(
            String::from_utf8_lossy(&keyword).trim_end().to_string(),
        ));
    }

    let mut card = Card {
        keyword,
        value: None,
        comment: None,
    };
    if card.is_end() {
        return Ok(card);
    }

    if card.is_commentary() || &bytes[8..10] != b"= " {
        card.comment = free_text(&bytes[8..])?;
        return Ok(card);
    }

    if let Some((value, comment)) = parse_value(&bytes[10..]) {
        card.value = Some(value);
        card.comment = comment.map(String::from);
    }
    Ok(card)
}

/// Serialize a card into its 80-byte image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    match &card.value {
        Some(value) => {
            buf[8] = b'=';
            buf[9] = b' ';
            let mut field = format_value(value);
            if let Some(comment) = &card.comment {
                append_comment(&mut field, comment);
            }
            buf[10..].copy_from_slice(&field);
        }
        None => {
            if let Some(text) = &card.comment {
                let text = utf8_prefix(text, CARD_SIZE - 8);
                buf[8..8 + text.len()].copy_from_slice(text.as_bytes());
            }
        }
    }
    buf
}

/// Place ` / comment` after the value content, truncating to fit the field.
fn append_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        // Closing quote is the last quote not followed by another.
        field.iter().rposition(|&b| b == b'\'').map_or(70, |i| i + 1)
    } else {
        20
    };
    let start = content_end + 3;
    if start >= field.len() {
        return;
    }
    field[content_end + 1] = b'/';
    let comment = utf8_prefix(comment, field.len() - start);
    field[start..start + comment.len()].copy_from_slice(comment.as_bytes());
}

/// Longest prefix of `text` within `max` bytes that ends on a char boundary.
fn utf8_prefix(text: &str, max: usize) -> &str {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}

/// Serialize cards into whole header blocks, appending END and padding with
/// blank cards.
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let len = (cards.len() + 1) * CARD_SIZE;
    let mut buf = Vec::with_capacity(padded_byte_len(len));
    for card in cards {
        buf.extend_from_slice(&format_card(card));
    }
    buf.extend_from_slice(&end_card());
    buf.resize(padded_byte_len(len), HEADER_PAD_BYTE);
    buf
}
