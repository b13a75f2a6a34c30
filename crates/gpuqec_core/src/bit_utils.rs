use gpuqec_common::wire::MAX_PACKED_BITS;
use thiserror::Error;

/// Failure to pack or unpack a transport word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The requested width does not fit in one transport word.
    #[error("invalid array size for decoder: {requested} bits requested, limit is {limit}")]
    SizeLimitExceeded { requested: usize, limit: usize },
}

/// Big-endian packing between bit vectors and 64-bit transport words.
///
/// Bit `0` of a vector of length `N` is the most significant of the `N`
/// populated bits of the word; bit `N - 1` lands in bit position 0.
pub struct BitPack;

impl BitPack {
    #[inline(always)]
    pub fn check_width(n: usize) -> Result<(), CodecError> {
        if n > MAX_PACKED_BITS {
            return Err(CodecError::SizeLimitExceeded {
                requested: n,
                limit: MAX_PACKED_BITS,
            });
        }
        Ok(())
    }

    /// Low-`n` bit mask, saturating at the full word.
    #[inline(always)]
    pub fn mask(n: usize) -> u64 {
        if n >= MAX_PACKED_BITS {
            u64::MAX
        } else {
            (1u64 << n) - 1
        }
    }

    /// Packs `bits` into a word, first bit most significant.
    pub fn pack(bits: &[bool]) -> Result<u64, CodecError> {
        Self::check_width(bits.len())?;
        Ok(Self::fold(bits.iter().copied()))
    }

    /// Unpacks the low `n` bits of `data`, most significant first.
    ///
    /// Bits of `data` above position `n - 1` are ignored.
    pub fn unpack(data: u64, n: usize) -> Result<Vec<bool>, CodecError> {
        Self::check_width(n)?;
        let mut out = vec![false; n];
        Self::spread(data, &mut out);
        Ok(out)
    }

    /// Unpacks into a caller-provided buffer whose length is the width.
    pub fn unpack_into(data: u64, out: &mut [bool]) -> Result<(), CodecError> {
        Self::check_width(out.len())?;
        Self::spread(data, out);
        Ok(())
    }

    /// Packs a statically sized vector. Widths above the ceiling fail to compile.
    #[inline(always)]
    pub fn pack_array<const N: usize>(bits: [bool; N]) -> u64 {
        const { assert!(N <= MAX_PACKED_BITS, "invalid array size for decoder") };
        Self::fold(bits.into_iter())
    }

    /// Unpacks into a statically sized vector. Widths above the ceiling fail to compile.
    #[inline(always)]
    pub fn unpack_array<const N: usize>(data: u64) -> [bool; N] {
        const { assert!(N <= MAX_PACKED_BITS, "invalid array size for decoder") };
        let mut out = [false; N];
        Self::spread(data, &mut out);
        out
    }

    #[inline(always)]
    fn fold(bits: impl Iterator<Item = bool>) -> u64 {
        bits.fold(0u64, |acc, bit| (acc << 1) | bit as u64)
    }

    #[inline(always)]
    fn spread(data: u64, out: &mut [bool]) {
        let n = out.len();
        for (i, bit) in out.iter_mut().enumerate() {
            *bit = (data >> (n - i - 1)) & 1 == 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_first_bit_most_significant() {
        assert_eq!(BitPack::pack(&[true, false, true, true]), Ok(0b1011));
        assert_eq!(BitPack::pack_array([true, false, true, true]), 11);
    }

    #[test]
    fn unpacks_most_significant_first() {
        assert_eq!(
            BitPack::unpack(11, 4).unwrap(),
            vec![true, false, true, true]
        );
        assert_eq!(BitPack::unpack_array::<4>(11), [true, false, true, true]);
    }

    #[test]
    fn empty_vector_packs_to_zero() {
        assert_eq!(BitPack::pack(&[]), Ok(0));
        assert!(BitPack::unpack(u64::MAX, 0).unwrap().is_empty());
    }

    #[test]
    fn rejects_widths_above_the_word() {
        let err = CodecError::SizeLimitExceeded {
            requested: 65,
            limit: 64,
        };
        assert_eq!(BitPack::pack(&[true; 65]), Err(err));
        assert_eq!(BitPack::unpack(0, 65), Err(err));
        let mut buf = [false; 65];
        assert_eq!(BitPack::unpack_into(0, &mut buf), Err(err));
    }

    #[test]
    fn full_word_is_accepted() {
        assert_eq!(BitPack::pack(&[true; 64]), Ok(u64::MAX));
        assert_eq!(BitPack::unpack(u64::MAX, 64).unwrap(), vec![true; 64]);

        let mut bits = [false; 64];
        bits[0] = true;
        assert_eq!(BitPack::pack_array(bits), 1 << 63);
    }

    #[test]
    fn unpack_ignores_high_bits() {
        assert_eq!(
            BitPack::unpack(0xF0 | 0b0110, 4).unwrap(),
            vec![false, true, true, false]
        );
    }

    #[test]
    fn mask_saturates() {
        assert_eq!(BitPack::mask(0), 0);
        assert_eq!(BitPack::mask(4), 0b1111);
        assert_eq!(BitPack::mask(64), u64::MAX);
    }
}
