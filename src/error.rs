use thiserror::Error;

/// Errors returned by [`XFastTrie`](crate::XFastTrie) operations.
///
/// A failing call never mutates the trie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XFastError {
    /// The value does not fit in the configured universe.
    #[error("value needs {bits} bits but the trie holds at most {max_bits}")]
    ValueTooLarge {
        /// Bits required by the supplied value (bit length for integers,
        /// `8 * len` for byte sequences).
        bits: u32,
        /// Configured universe width.
        max_bits: u32,
    },

    /// A signed integer below zero was supplied.
    #[error("value is negative")]
    NegativeValue,

    /// `remove` was called for a value that is not stored.
    #[error("value {0} is not in the trie")]
    NotFound(u128),

    /// `predecessor` or `successor` was called on an empty trie.
    #[error("trie is empty")]
    EmptyTrie,

    /// The configured universe width is outside `1..=128`.
    #[error("max_bits must be in 1..=128, got {0}")]
    InvalidMaxBits(u32),
}

pub type Result<T> = std::result::Result<T, XFastError>;
