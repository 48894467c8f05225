//! The host-facing codec: filter, read, options, estimate, write.
//!
//! A [`Session`] holds the metadata of the last image it read so a later
//! write of the same document can carry the header over. Hosts that keep
//! metadata themselves use [`Session::take_metadata`] and
//! [`Session::attach_metadata`].

use std::io::{Read, Seek, Write};

use crate::classify::ColorMode;
use crate::decode::decode;
use crate::encode::{encode, estimated_size};
use crate::error::{CodecError, Result, Unsupported, MAX_USER_MESSAGE_LEN};
use crate::metadata::HeaderMetadata;
use crate::probe::{probe, Compatibility};
use crate::progress::Progress;
use crate::raster::{RasterImage, ScanlineSource};
use crate::warning::{confirm_lossy_save, SaveConfirm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ask before saving an image whose source was converted, normalized, or
    /// had extensions.
    pub confirm_lossy_saves: bool,
    /// Byte cap on [`Session::user_message`].
    pub message_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            confirm_lossy_saves: true,
            message_limit: MAX_USER_MESSAGE_LEN,
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    metadata: Option<HeaderMetadata>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session { config, metadata: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Header-only check of whether `stream` is a FITS image this codec opens.
    pub fn filter<R: Read + Seek>(&self, stream: R) -> Compatibility {
        probe(stream)
    }

    /// Decode `stream` and keep its metadata for a later [`Session::write`].
    ///
    /// Metadata from a previous read is discarded first, so a failed read
    /// leaves the session without metadata.
    pub fn read<R, P>(&mut self, stream: R, progress: &mut P) -> Result<RasterImage>
    where
        R: Read + Seek,
        P: Progress + ?Sized,
    {
        self.metadata = None;
        match decode(stream, progress) {
            Ok(decoded) => {
                self.metadata = Some(decoded.metadata);
                Ok(decoded.raster)
            }
            Err(e) => {
                e.trace();
                Err(e)
            }
        }
    }

    /// Pre-save check: the image mode must be grayscale or color, and a
    /// lossy save needs the user's consent.
    pub fn options<C: SaveConfirm + ?Sized>(&self, planes: usize, confirm: &mut C) -> Result<()> {
        ColorMode::from_planes(planes).map_err(|_| Unsupported::ImageMode)?;
        match &self.metadata {
            Some(meta) if self.config.confirm_lossy_saves => confirm_lossy_save(meta, confirm),
            _ => Ok(()),
        }
    }

    /// Sample bytes the save will produce, header and padding excluded.
    pub fn estimate<S: ScanlineSource + ?Sized>(&self, source: &S) -> u64 {
        estimated_size(source)
    }

    /// Encode `source`, carrying over the attached metadata if any.
    pub fn write<W, S, P>(&self, stream: W, source: &S, progress: &mut P) -> Result<W>
    where
        W: Write + Seek,
        S: ScanlineSource + ?Sized,
        P: Progress + ?Sized,
    {
        encode(stream, source, self.metadata.as_ref(), progress).inspect_err(CodecError::trace)
    }

    pub fn metadata(&self) -> Option<&HeaderMetadata> {
        self.metadata.as_ref()
    }

    pub fn attach_metadata(&mut self, metadata: HeaderMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn take_metadata(&mut self) -> Option<HeaderMetadata> {
        self.metadata.take()
    }

    /// Short diagnostic for `err`, capped at the configured length.
    pub fn user_message(&self, err: &CodecError) -> String {
        err.user_message_within(self.config.message_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_planes_is_not_an_image_mode() {
        let s = Session::default();
        let err = s.options(2, &mut |_: &str| true).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFormat(Unsupported::ImageMode)));
        s.options(1, &mut |_: &str| true).unwrap();
        s.options(4, &mut |_: &str| true).unwrap();
    }

    #[test]
    fn confirmation_can_be_disabled() {
        let mut s = Session::new(SessionConfig {
            confirm_lossy_saves: false,
            ..SessionConfig::default()
        });
        s.attach_metadata(HeaderMetadata {
            is_normalized: true,
            ..HeaderMetadata::default()
        });
        s.options(1, &mut |_: &str| false).unwrap();
    }

    #[test]
    fn metadata_can_be_moved_between_sessions() {
        let mut a = Session::default();
        a.attach_metadata(HeaderMetadata::default());
        let meta = a.take_metadata().unwrap();
        assert!(a.metadata().is_none());

        let mut b = Session::default();
        b.attach_metadata(meta);
        assert!(b.metadata().is_some());
    }

    #[test]
    fn message_limit_applies() {
        let s = Session::new(SessionConfig {
            message_limit: 10,
            ..SessionConfig::default()
        });
        assert_eq!(s.user_message(&CodecError::Cancelled).len(), 10);
    }
}
