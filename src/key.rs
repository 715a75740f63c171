//! Normalization of caller-supplied values into the canonical `u128` form.

use crate::error::{Result, XFastError};

/// A value that can be stored in or looked up in an [`XFastTrie`](crate::XFastTrie).
///
/// Integers pass through unchanged once they are known to be non-negative and
/// to fit in `max_bits`. Byte sequences are read as big-endian unsigned
/// integers and are rejected when `8 * len` exceeds `max_bits`, whatever their
/// numeric value.
pub trait IntoKey {
    fn into_key(self, max_bits: u32) -> Result<u128>;
}

#[inline]
pub(crate) fn bit_length(value: u128) -> u32 {
    u128::BITS - value.leading_zeros()
}

#[inline]
fn check_bits(value: u128, max_bits: u32) -> Result<u128> {
    let bits = bit_length(value);
    if bits > max_bits {
        return Err(XFastError::ValueTooLarge { bits, max_bits });
    }
    Ok(value)
}

fn from_be_bytes(bytes: &[u8], max_bits: u32) -> Result<u128> {
    let bits = u32::try_from(bytes.len())
        .ok()
        .and_then(|len| len.checked_mul(8))
        .unwrap_or(u32::MAX);
    if bits > max_bits {
        return Err(XFastError::ValueTooLarge { bits, max_bits });
    }
    // max_bits <= 128, so at most 16 bytes reach this point.
    Ok(bytes
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl IntoKey for $t {
            #[inline]
            fn into_key(self, max_bits: u32) -> Result<u128> {
                check_bits(self as u128, max_bits)
            }
        }

        impl IntoKey for &$t {
            #[inline]
            fn into_key(self, max_bits: u32) -> Result<u128> {
                (*self).into_key(max_bits)
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl IntoKey for $t {
            #[inline]
            fn into_key(self, max_bits: u32) -> Result<u128> {
                // Size is checked on the magnitude before the sign.
                let magnitude = self.unsigned_abs() as u128;
                let bits = bit_length(magnitude);
                if bits > max_bits {
                    return Err(XFastError::ValueTooLarge { bits, max_bits });
                }
                if self < 0 {
                    return Err(XFastError::NegativeValue);
                }
                Ok(magnitude)
            }
        }

        impl IntoKey for &$t {
            #[inline]
            fn into_key(self, max_bits: u32) -> Result<u128> {
                (*self).into_key(max_bits)
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, u128, usize);
impl_signed!(i8, i16, i32, i64, i128, isize);

impl IntoKey for &[u8] {
    fn into_key(self, max_bits: u32) -> Result<u128> {
        from_be_bytes(self, max_bits)
    }
}

impl IntoKey for Vec<u8> {
    fn into_key(self, max_bits: u32) -> Result<u128> {
        from_be_bytes(&self, max_bits)
    }
}

impl IntoKey for &Vec<u8> {
    fn into_key(self, max_bits: u32) -> Result<u128> {
        from_be_bytes(self, max_bits)
    }
}

impl<const N: usize> IntoKey for [u8; N] {
    fn into_key(self, max_bits: u32) -> Result<u128> {
        from_be_bytes(&self, max_bits)
    }
}

impl<const N: usize> IntoKey for &[u8; N] {
    fn into_key(self, max_bits: u32) -> Result<u128> {
        from_be_bytes(self, max_bits)
    }
}
