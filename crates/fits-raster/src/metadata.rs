//! Provenance of a decoded image: every primary-header keyword plus what the
//! decoder did to the samples.

use std::collections::BTreeMap;

use fits_stream::{is_reserved_keyword, Card, ImageHeader, Value};

/// One keyword's value and comment, owned independently of the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub value: Value,
    pub comment: Option<String>,
}

/// A COMMENT or HISTORY line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commentary {
    pub keyword: String,
    pub text: String,
}

/// Header keywords and format provenance captured at decode time.
///
/// Keywords are keyed by name and iterate alphabetically; the original card
/// order is not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMetadata {
    pub keywords: BTreeMap<String, Keyword>,
    /// COMMENT and HISTORY cards in file order.
    pub commentary: Vec<Commentary>,
    /// Original BITPIX code.
    pub bitpix: i64,
    pub bscale: f64,
    pub bzero: f64,
    /// `|bitpix|` in bits.
    pub input_depth: u32,
    /// Names of the extensions that followed the primary image, in file order.
    pub extension_names: Vec<String>,
    /// The decoder rescaled the samples into [0,1].
    pub is_normalized: bool,
    /// The source sample type was not 32-bit float, independent of normalization.
    pub is_converted: bool,
}

impl Default for HeaderMetadata {
    fn default() -> Self {
        HeaderMetadata {
            keywords: BTreeMap::new(),
            commentary: Vec::new(),
            bitpix: 0,
            bscale: 1.0,
            bzero: 0.0,
            input_depth: 0,
            extension_names: Vec::new(),
            is_normalized: false,
            is_converted: false,
        }
    }
}

impl HeaderMetadata {
    /// Clone the primary header into an owned store.
    ///
    /// Value-less cards (blank values, complex literals) are dropped. When a
    /// keyword repeats, the first occurrence wins.
    pub fn capture(cards: &[Card], image: &ImageHeader, extension_names: Vec<String>) -> Self {
        let mut meta = HeaderMetadata {
            bitpix: image.bitpix,
            bscale: image.scaling.bscale,
            bzero: image.scaling.bzero,
            input_depth: image.bitpix.unsigned_abs() as u32,
            extension_names,
            ..HeaderMetadata::default()
        };

        for card in cards {
            if card.is_commentary() {
                if let Some(text) = &card.comment {
                    meta.commentary.push(Commentary {
                        keyword: card.name().to_string(),
                        text: text.clone(),
                    });
                }
                continue;
            }
            let Some(value) = &card.value else {
                tracing::trace!(keyword = card.name(), "skipping keyword without a value");
                continue;
            };
            meta.keywords
                .entry(card.name().to_string())
                .or_insert_with(|| Keyword {
                    value: value.clone(),
                    comment: card.comment.clone(),
                });
        }
        meta
    }

    pub fn keyword(&self, name: &str) -> Option<&Keyword> {
        self.keywords.get(name)
    }

    /// Keywords a writer may carry over: everything except the layout
    /// keywords the writer derives from the image itself.
    pub fn replayable_keywords(&self) -> impl Iterator<Item = (&str, &Keyword)> {
        self.keywords
            .iter()
            .filter(|(name, _)| !is_reserved_keyword(name))
            .map(|(name, kw)| (name.as_str(), kw))
    }

    /// The original samples were floating point.
    pub fn source_is_float(&self) -> bool {
        self.bitpix < 0
    }

    /// Saving will not reproduce the original file.
    pub fn is_lossy(&self) -> bool {
        self.is_converted || self.is_normalized || !self.extension_names.is_empty()
    }
}
