//! The warning shown before saving an image that will not match its source.

use tracing::info;

use crate::error::{CodecError, Result};
use crate::metadata::HeaderMetadata;

/// Asks the user whether to go ahead with a lossy save.
pub trait SaveConfirm {
    /// `true` to save anyway, `false` to cancel.
    fn confirm_save(&mut self, message: &str) -> bool;
}

impl<F> SaveConfirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm_save(&mut self, message: &str) -> bool {
        self(message)
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The lossy-save warning for `meta`, or `None` when saving reproduces the
/// source.
pub fn save_warning(meta: &HeaderMetadata) -> Option<String> {
    let mut text = String::new();
    if meta.is_converted {
        let kind = if meta.source_is_float() {
            "floating-point"
        } else {
            "integer"
        };
        text.push_str(&format!(
            "The {}-bit {kind} data from the original FITS file has been converted to \
             32-bit floating-point data in the [0,1] range, and will be saved as a FITS FLOAT_IMG.",
            meta.input_depth
        ));
    } else if meta.is_normalized {
        text.push_str(
            "The floating-point data from the original FITS file has been normalized to the [0,1] range.",
        );
    }

    if !meta.extension_names.is_empty() {
        let noun = if meta.extension_names.len() == 1 {
            "an extension named"
        } else {
            "extensions named"
        };
        let extensions = format!(
            " original FITS file contained extra data in {noun} {}. This additional data will not be saved.",
            quoted_list(&meta.extension_names)
        );
        if text.is_empty() {
            text.push_str("The");
        } else {
            text.push_str("\nIn addition, the");
        }
        text.push_str(&extensions);
    }

    (!text.is_empty()).then_some(text)
}

/// Show the lossy-save warning, if any, and turn a "cancel" answer into
/// [`CodecError::UserCancelled`].
pub fn confirm_lossy_save<C: SaveConfirm + ?Sized>(meta: &HeaderMetadata, confirm: &mut C) -> Result<()> {
    let Some(message) = save_warning(meta) else {
        return Ok(());
    };
    if confirm.confirm_save(&message) {
        info!("lossy save confirmed");
        Ok(())
    } else {
        info!("lossy save declined");
        Err(CodecError::UserCancelled)
    }
}
