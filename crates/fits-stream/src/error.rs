use thiserror::Error;

/// All errors that can occur while streaming a FITS file.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed header block or card.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// The stream ended before a complete header or data segment was read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// Malformed keyword name.
    #[error("invalid keyword name: {0:?}")]
    InvalidKeyword(String),
    /// A required keyword was not found where the standard requires it.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// The keyword is maintained by the writer and cannot be set by callers.
    #[error("keyword {0} is reserved")]
    ReservedKeyword(String),
    /// A keyword was added after pixel data had started.
    #[error("header is closed; keywords must be added before pixel data")]
    HeaderClosed,
    /// Pixel data was written with a sample type that differs from the image storage.
    #[error("sample type does not match image storage {0}")]
    StorageMismatch(&'static str),
    /// A pixel range extends past the end of the image.
    #[error("pixels {start}..{end} are outside an image of {total} pixels")]
    OutOfRange {
        start: usize,
        end: usize,
        total: usize,
    },
    /// The writer was finished before every pixel was written.
    #[error("image incomplete: {written} of {expected} pixels written")]
    IncompleteData { written: usize, expected: usize },
    /// An I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Map a short read onto [`Error::UnexpectedEof`] instead of a generic I/O error.
pub(crate) fn eof_aware(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_header() {
        let e = Error::InvalidHeader("SIMPLE must be T");
        assert_eq!(e.to_string(), "invalid FITS header: SIMPLE must be T");
    }

    #[test]
    fn display_invalid_bitpix() {
        let e = Error::InvalidBitpix(-99);
        assert_eq!(e.to_string(), "invalid BITPIX value: -99");
    }

    #[test]
    fn display_out_of_range() {
        let e = Error::OutOfRange {
            start: 10,
            end: 20,
            total: 15,
        };
        assert_eq!(e.to_string(), "pixels 10..20 are outside an image of 15 pixels");
    }

    #[test]
    fn eof_kind_maps_to_unexpected_eof() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(eof_aware(io), Error::UnexpectedEof));

        let io = std::io::Error::other("disk gone");
        assert!(matches!(eof_aware(io), Error::Io(_)));
    }

    #[test]
    fn io_error_source_is_kept() {
        use std::error::Error as StdError;

        let e: Error = std::io::Error::other("inner").into();
        assert!(e.source().is_some());
        assert!(Error::HeaderClosed.source().is_none());
    }
}
