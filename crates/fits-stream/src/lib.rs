//! Streaming access to the primary image of a FITS file.
//!
//! [`FitsReader`] parses the primary header from any `Read + Seek` stream,
//! lists extension names without touching their data, and reads pixel rows
//! on demand. [`FitsWriter`] creates a single-image file over any
//! `Write + Seek` stream, one row at a time.

pub mod block;
pub mod card;
pub mod error;
pub mod reader;
pub mod sample;
pub mod value;
pub mod writer;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use card::Card;
pub use error::{Error, Result};
pub use reader::{FitsReader, ImageHeader};
pub use sample::{Bitpix, Scaling};
pub use value::Value;
pub use writer::{is_reserved_keyword, FitsWriter, ImageStorage};
