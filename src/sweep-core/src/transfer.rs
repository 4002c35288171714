// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Sweep-mode transfer layout.
//!
//! A transfer is a run of fixed-size blocks. Each block starts with a
//! two-byte `0x7F 0x7F` marker followed by the tuned frequency as a
//! little-endian `u64`; the interleaved signed 8-bit I/Q samples that get
//! analysed occupy the tail of the block.

/// Complex samples carried by one block.
pub const SAMPLES_PER_BLOCK: usize = 8192;

/// Bytes per block (two bytes per complex sample).
pub const BYTES_PER_BLOCK: usize = SAMPLES_PER_BLOCK * 2;

/// Blocks handed over per transfer.
pub const BLOCKS_PER_TRANSFER: usize = 16;

const MARKER: u8 = 0x7F;
/// Marker pair plus the little-endian frequency.
pub const HEADER_LEN: usize = 10;

/// One block of interleaved signed 8-bit I/Q samples and the frequency the
/// receiver reported while capturing it.
///
/// The bytes are borrowed; the engine copies what it needs before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBlock<'a> {
    pub frequency_hz: u64,
    pub iq: &'a [u8],
}

impl<'a> SampleBlock<'a> {
    pub fn new(frequency_hz: u64, iq: &'a [u8]) -> Self {
        Self { frequency_hz, iq }
    }

    pub fn sample_count(&self) -> usize {
        self.iq.len() / 2
    }
}

/// Read the tuned frequency from a block header, or `None` when the block
/// carries no marker.
pub fn parse_header(block: &[u8]) -> Option<u64> {
    if block.len() < HEADER_LEN || block[0] != MARKER || block[1] != MARKER {
        return None;
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&block[2..HEADER_LEN]);
    Some(u64::from_le_bytes(raw))
}

/// Decode a block into its frequency and the trailing `fft_size` samples.
pub fn decode_block(block: &[u8], fft_size: usize) -> Option<SampleBlock<'_>> {
    let frequency_hz = parse_header(block)?;
    let tail = fft_size * 2;
    if block.len() < HEADER_LEN + tail {
        return None;
    }
    Some(SampleBlock::new(frequency_hz, &block[block.len() - tail..]))
}

/// Write a header into `block` and place `iq` at its tail.
pub fn encode_block(block: &mut [u8], frequency_hz: u64, iq: &[u8]) -> Result<(), String> {
    if block.len() < HEADER_LEN + iq.len() {
        return Err(format!(
            "{} sample bytes do not fit a {}-byte block",
            iq.len(),
            block.len()
        ));
    }
    block[0] = MARKER;
    block[1] = MARKER;
    block[2..HEADER_LEN].copy_from_slice(&frequency_hz.to_le_bytes());
    let start = block.len() - iq.len();
    block[start..].copy_from_slice(iq);
    Ok(())
}

/// Split a transfer into whole blocks; a trailing partial block is ignored.
pub fn blocks(transfer: &[u8]) -> std::slice::ChunksExact<'_, u8> {
    transfer.chunks_exact(BYTES_PER_BLOCK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut block = vec![0u8; BYTES_PER_BLOCK];
        encode_block(&mut block, 2_412_000_000, &[]).unwrap();
        assert_eq!(&block[..2], &[0x7F, 0x7F]);
        assert_eq!(&block[2..10], &2_412_000_000u64.to_le_bytes());
        assert_eq!(parse_header(&block), Some(2_412_000_000));
    }

    #[test]
    fn test_missing_marker_is_rejected() {
        let mut block = vec![0u8; BYTES_PER_BLOCK];
        assert_eq!(parse_header(&block), None);
        block[0] = 0x7F;
        assert_eq!(parse_header(&block), None);
        assert_eq!(parse_header(&[0x7F, 0x7F, 1]), None);
    }

    #[test]
    fn test_decode_takes_block_tail() {
        let mut block = vec![0u8; BYTES_PER_BLOCK];
        let iq: Vec<u8> = (0..40u8).collect();
        encode_block(&mut block, 5_000_000, &iq).unwrap();

        let decoded = decode_block(&block, 20).unwrap();
        assert_eq!(decoded.frequency_hz, 5_000_000);
        assert_eq!(decoded.sample_count(), 20);
        assert_eq!(decoded.iq, iq.as_slice());
    }

    #[test]
    fn test_decode_rejects_oversized_fft() {
        let mut block = vec![0u8; 32];
        encode_block(&mut block, 1, &[]).unwrap();
        assert!(decode_block(&block, 12).is_none());
        assert!(decode_block(&block, 11).is_some());
    }

    #[test]
    fn test_encode_rejects_overlong_samples() {
        let mut block = vec![0u8; 16];
        assert!(encode_block(&mut block, 1, &[0u8; 7]).is_err());
        assert!(encode_block(&mut block, 1, &[0u8; 6]).is_ok());
    }

    #[test]
    fn test_blocks_ignores_partial_tail() {
        let transfer = vec![0u8; BYTES_PER_BLOCK * 3 + 100];
        assert_eq!(blocks(&transfer).count(), 3);
    }
}
