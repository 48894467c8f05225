//! Header value literals: parsing from and formatting into the 70-byte value
//! field of a card.

use core::str;

/// Width of the value field (card bytes 10..80).
pub const VALUE_FIELD_LEN: usize = 70;

/// A typed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes, trailing blanks trimmed).
    String(String),
}

impl Value {
    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Render the value as a bare FITS literal, e.g. `T`, `42`, `'M31'`.
    ///
    /// [`parse_value_text`] accepts this form and yields an equal value.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Logical(true) => String::from("T"),
            Value::Logical(false) => String::from("F"),
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

/// Find ` /` in `bytes` and return the trimmed comment text following it.
///
/// Real-world writers (IDL among them) omit the space after the slash, so
/// only the leading space is required.
fn comment_after(bytes: &[u8]) -> (usize, Option<&str>) {
    let Some(idx) = bytes.windows(2).position(|w| w == b" /") else {
        return (bytes.len(), None);
    };
    let mut start = idx + 2;
    if bytes.get(start) == Some(&b' ') {
        start += 1;
    }
    let comment = str::from_utf8(&bytes[start..])
        .ok()
        .map(str::trim_end)
        .filter(|s| !s.is_empty());
    (idx, comment)
}

/// Parse a quoted string starting at `field[0] == '\''`. Returns the value and
/// the index just past the closing quote.
///
/// Content is decoded as UTF-8, the encoding [`format_value`] writes; bytes
/// that are not valid UTF-8 become U+FFFD.
fn parse_quoted(field: &[u8]) -> (String, usize) {
    let mut out = Vec::new();
    let mut i = 1;
    let mut end = None;
    while i < field.len() {
        match field[i] {
            b'\'' if field.get(i + 1) == Some(&b'\'') => {
                out.push(b'\'');
                i += 2;
            }
            b'\'' => {
                end = Some(i + 1);
                break;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    // Unterminated: keep what was there.
    let text = String::from_utf8_lossy(&out).trim_end().to_string();
    (text, end.unwrap_or(i))
}

fn parse_float(text: &str) -> Option<f64> {
    text.replace(['D', 'd'], "E").parse::<f64>().ok()
}

/// Parse a trimmed, non-string literal.
fn parse_scalar(text: &str) -> Option<Value> {
    match text {
        "T" => return Some(Value::Logical(true)),
        "F" => return Some(Value::Logical(false)),
        _ => {}
    }
    let looks_float = text.contains(['.', 'E', 'e', 'D', 'd']);
    if !looks_float {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::Integer(n));
        }
    }
    parse_float(text).map(Value::Float)
}

/// Parse a value field (card bytes 10..80).
///
/// Returns the value and an optional comment, or `None` when the field is
/// empty or holds a literal this crate does not model (complex numbers).
/// Other text that is not a valid literal is kept as a string, as in
/// [`parse_value_text`].
pub fn parse_value(field: &[u8]) -> Option<(Value, Option<&str>)> {
    let lead = field.iter().position(|&b| b != b' ')?;

    if field[lead] == b'\'' {
        let quoted = &field[lead..];
        let (s, end) = parse_quoted(quoted);
        let (_, comment) = comment_after(&quoted[end.saturating_sub(1)..]);
        return Some((Value::String(s), comment));
    }

    let (value_end, comment) = comment_after(field);
    let text = String::from_utf8_lossy(&field[..value_end]);
    let text = text.trim();
    if text.is_empty() || text.starts_with('(') {
        return None;
    }
    let value = parse_scalar(text).unwrap_or_else(|| Value::String(text.to_string()));
    Some((value, comment))
}

/// Parse a bare literal such as `T`, `-3`, `2.5E+01` or `'NGC 224'`.
///
/// Text that is not a valid literal becomes a string value, the way
/// cfitsio treats unparseable keyword text.
pub fn parse_value_text(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('\'') {
        return Value::String(parse_quoted(trimmed.as_bytes()).0);
    }
    parse_scalar(trimmed).unwrap_or_else(|| Value::String(trimmed.to_string()))
}

/// Serialize a value into a 70-byte field for card bytes 10..80.
///
/// Logical and numeric values are right-justified in the first 20 bytes
/// (columns 11-30); strings start at byte 0 with a quote.
pub fn format_value(value: &Value) -> [u8; VALUE_FIELD_LEN] {
    let mut buf = [b' '; VALUE_FIELD_LEN];
    match value {
        Value::String(s) => write_string(s, &mut buf),
        other => {
            let text = other.to_literal();
            right_justify(text.as_bytes(), &mut buf[..20]);
        }
    }
    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    // Shortest round-trip form if it fits, else shave precision.
    let plain = format!("{f:?}");
    if plain.len() <= 20 && (plain.contains('.') || plain.contains('e')) {
        return plain.replace('e', "E");
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; VALUE_FIELD_LEN]) {
    buf[0] = b'\'';
    let mut pos = 1;
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        let bytes: &[u8] = if c == '\'' { b"''" } else { c.encode_utf8(&mut utf8).as_bytes() };
        // Whole characters only, leaving room for the closing quote.
        if pos + bytes.len() >= VALUE_FIELD_LEN {
            break;
        }
        buf[pos..pos + bytes.len()].copy_from_slice(bytes);
        pos += bytes.len();
    }
    // Strings occupy at least 8 characters between the quotes.
    pos = pos.max(9);
    buf[pos] = b'\'';
}
