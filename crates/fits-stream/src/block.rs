use std::io::Write;

/// Every header and data segment is a whole number of these.
pub const BLOCK_SIZE: usize = 2880;

/// Length of one header card.
pub const CARD_SIZE: usize = 80;

pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Fill for the unused tail of the last header block.
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Fill for the unused tail of the last data block.
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Blocks spanned by `num_bytes`, rounded up.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// `num_bytes` rounded up to a block boundary.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Like [`padded_byte_len`], but `None` when the rounded length does not fit
/// in `usize`. Use this for lengths taken from a header.
pub const fn checked_padded_byte_len(num_bytes: usize) -> Option<usize> {
    blocks_needed(num_bytes).checked_mul(BLOCK_SIZE)
}

pub const fn padding_len(num_bytes: usize) -> usize {
    padded_byte_len(num_bytes) - num_bytes
}

/// Write the fill bytes that complete a segment of `written` bytes to a whole
/// number of blocks.
pub fn write_padding<W: Write>(out: &mut W, written: usize, pad_byte: u8) -> std::io::Result<()> {
    let fill = padding_len(written);
    if fill > 0 {
        out.write_all(&vec![pad_byte; fill])?;
    }
    Ok(())
}
