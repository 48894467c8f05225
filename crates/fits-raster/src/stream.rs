//! Streams backed by host-owned file descriptors.
//!
//! The codec works over any `Read + Seek` or `Write + Seek` value; this
//! adapter covers hosts that hand over an already-open descriptor and keep
//! ownership of it.

#[cfg(unix)]
pub use self::unix::DescriptorStream;

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom, Write};
    use std::os::fd::BorrowedFd;

    use tracing::debug;

    use crate::error::{CodecError, Result};

    /// A `Read + Write + Seek` view of a descriptor the host owns.
    ///
    /// The descriptor is duplicated; dropping the stream closes only the
    /// duplicate. Both share one file offset, so the host sees the codec's
    /// position after each call.
    #[derive(Debug)]
    pub struct DescriptorStream {
        file: File,
    }

    impl DescriptorStream {
        pub fn new(fd: BorrowedFd<'_>) -> Result<Self> {
            let owned = fd.try_clone_to_owned().map_err(|e| CodecError::StreamOpenFailed {
                reason: format!("invalid file descriptor provided ({e})"),
                source: None,
            })?;
            debug!(?owned, "duplicated host descriptor");
            Ok(DescriptorStream { file: File::from(owned) })
        }
    }

    impl Read for DescriptorStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.file.read(buf)
        }
    }

    impl Write for DescriptorStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.file.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.file.flush()
        }
    }

    impl Seek for DescriptorStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.file.seek(pos)
        }
    }

}
