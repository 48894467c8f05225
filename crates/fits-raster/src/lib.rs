//! FITS image codec for raster hosts.
//!
//! Decodes the primary image of a FITS file into an 8-bit or 32-bit float
//! planar [`RasterImage`], keeps the header as [`HeaderMetadata`], and writes
//! rasters back out with that header replayed. Float images outside [0,1] are
//! normalized on the way in; [`save_warning`] tells the user what a save will
//! not preserve.
//!
//! ```no_run
//! use std::fs::File;
//! use fits_raster::{NoProgress, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::default();
//! let raster = session.read(File::open("m31.fits")?, &mut NoProgress)?;
//! println!("{}x{}x{}", raster.width(), raster.height(), raster.planes());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod decode;
pub mod encode;
pub mod error;
pub mod metadata;
pub mod probe;
pub mod progress;
pub mod raster;
pub mod session;
pub mod stream;
pub mod warning;

pub use classify::{classify, Classification, ColorMode, Depth};
pub use decode::{decode, Decoded, Normalization};
pub use encode::{encode, storage_for_depth};
pub use error::{CodecError, Result, Unsupported, MAX_USER_MESSAGE_LEN};
pub use metadata::{Commentary, HeaderMetadata, Keyword};
pub use probe::{probe, Compatibility};
pub use progress::{NoProgress, Progress};
pub use raster::{PixelBuffer, RasterImage, ScanlineSource};
pub use session::{Session, SessionConfig};
#[cfg(unix)]
pub use stream::DescriptorStream;
pub use warning::{confirm_lossy_save, save_warning, SaveConfirm};
