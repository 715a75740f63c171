use crate::error::{Result, XFastError};

/// Widest universe supported; values are stored as `u128`.
pub const MAX_SUPPORTED_BITS: u32 = u128::BITS;

/// One bit wider than the native signed integer, so every `isize` and
/// `usize` value fits.
pub const DEFAULT_MAX_BITS: u32 = isize::BITS + 1;

/// Configuration for an [`XFastTrie`](crate::XFastTrie).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bit width of the universe: values must lie in `0..2^max_bits`.
    pub max_bits: u32,
    /// Expected number of stored values, used to pre-size the leaf table
    /// and node arena.
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bits: DEFAULT_MAX_BITS,
            initial_capacity: 0,
        }
    }
}

impl Config {
    pub fn with_max_bits(max_bits: u32) -> Self {
        Self {
            max_bits,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bits == 0 || self.max_bits > MAX_SUPPORTED_BITS {
            return Err(XFastError::InvalidMaxBits(self.max_bits));
        }
        Ok(())
    }
}
