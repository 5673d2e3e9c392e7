//! Per-column null bitmap.

/// Null flags of one wire column, packed into 64-bit words.
///
/// Bit `i` is read LSB-first from byte `i / 8` of the wire mask. Rows past
/// the end of the mask are not null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NullBitmap {
    words: Vec<u64>,
    len: usize,
}

impl NullBitmap {
    pub fn from_bytes(mask: &[u8]) -> Self {
        let words = mask
            .chunks(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(bytes)
            })
            .collect();
        Self {
            words,
            len: mask.len() * 8,
        }
    }

    /// Whether row `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Number of null rows among the first `rows`.
    pub fn count_nulls(&self, rows: usize) -> usize {
        (0..rows.min(self.len)).filter(|&i| self.is_null(i)).count()
    }

    /// Number of bits covered by the mask.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
