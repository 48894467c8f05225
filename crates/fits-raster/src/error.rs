use thiserror::Error;
use tracing::{debug, warn};

/// Longest diagnostic handed back to a host (a Pascal `Str255`).
pub const MAX_USER_MESSAGE_LEN: usize = 255;

/// Why a FITS image cannot be represented as a raster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    #[error("the FITS file does not contain a primary image")]
    NoImage,
    #[error("the primary FITS image has {0} axes, which is not supported")]
    Dimensionality(usize),
    #[error("FITS image has {0} planes, which is not supported")]
    Planes(usize),
    #[error("FITS image is of type {0}, which is not supported")]
    PixelType(String),
    #[error("the primary FITS image has an empty axis")]
    EmptyAxis,
    #[error("image mode must be RGB or Grayscale")]
    ImageMode,
}

/// Every way a codec operation can end other than success.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Bad axis count, plane count, or pixel type. The file is untouched.
    #[error(transparent)]
    UnsupportedFormat(#[from] Unsupported),

    /// The stream could not be used or the FITS header could not be opened.
    #[error("could not open FITS file: {reason}")]
    StreamOpenFailed {
        reason: String,
        #[source]
        source: Option<fits_stream::Error>,
    },

    /// I/O or parse failure while reading pixel data or extension headers.
    #[error("could not read FITS file: {source}")]
    Decode {
        #[source]
        source: fits_stream::Error,
    },

    /// Unsupported output depth, or a failure creating or writing the file.
    #[error("could not write FITS file: {reason}")]
    Write {
        reason: String,
        #[source]
        source: Option<fits_stream::Error>,
    },

    /// The user declined the lossy-save warning. Not a failure.
    #[error("save cancelled by user")]
    UserCancelled,

    /// The progress hook asked the operation to stop.
    #[error("operation cancelled")]
    Cancelled,

    /// A pixel buffer could not be allocated.
    #[error("not enough memory for a {bytes}-byte buffer")]
    OutOfMemory { bytes: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    pub(crate) fn open(source: fits_stream::Error) -> Self {
        CodecError::StreamOpenFailed {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn decode(source: fits_stream::Error) -> Self {
        CodecError::Decode { source }
    }

    pub(crate) fn write(source: fits_stream::Error) -> Self {
        CodecError::Write {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn write_reason(reason: impl Into<String>) -> Self {
        CodecError::Write {
            reason: reason.into(),
            source: None,
        }
    }

    /// `true` for outcomes the user asked for rather than failures.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CodecError::UserCancelled | CodecError::Cancelled)
    }

    /// The short diagnostic for the host, capped at [`MAX_USER_MESSAGE_LEN`] bytes.
    pub fn user_message(&self) -> String {
        self.user_message_within(MAX_USER_MESSAGE_LEN)
    }

    /// The short diagnostic, cut at a char boundary to at most `limit` bytes.
    pub fn user_message_within(&self, limit: usize) -> String {
        let mut msg = self.to_string();
        if msg.len() > limit {
            let mut cut = limit;
            while !msg.is_char_boundary(cut) {
                cut -= 1;
            }
            msg.truncate(cut);
        }
        msg
    }

    /// Send the full error chain to the trace sink.
    pub fn trace(&self) {
        if self.is_cancellation() {
            debug!(error = %self, "operation cancelled");
            return;
        }
        warn!(error = %self, "codec operation failed");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            debug!(cause = %cause, "caused by");
            source = cause.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_messages() {
        assert_eq!(
            CodecError::from(Unsupported::Dimensionality(4)).to_string(),
            "the primary FITS image has 4 axes, which is not supported"
        );
        assert_eq!(
            Unsupported::PixelType(String::from("LONGLONG_IMG")).to_string(),
            "FITS image is of type LONGLONG_IMG, which is not supported"
        );
    }

    #[test]
    fn open_error_keeps_library_source() {
        use std::error::Error as StdError;

        let e = CodecError::open(fits_stream::Error::UnexpectedEof);
        assert_eq!(e.to_string(), "could not open FITS file: unexpected end of file");
        assert!(e.source().is_some());
    }

    #[test]
    fn user_message_is_capped_on_char_boundary() {
        let e = CodecError::write_reason("é".repeat(200));
        let msg = e.user_message();
        assert!(msg.len() <= MAX_USER_MESSAGE_LEN);
        assert!(msg.starts_with("could not write FITS file: "));
        assert!(e.user_message_within(28).len() <= 28);
    }

    #[test]
    fn cancellations_are_not_failures() {
        assert!(CodecError::UserCancelled.is_cancellation());
        assert!(CodecError::Cancelled.is_cancellation());
        assert!(!CodecError::OutOfMemory { bytes: 1 }.is_cancellation());
    }
}
