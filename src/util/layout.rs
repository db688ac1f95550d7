//! Alignment utilities.

/// Align a device offset up to the given power-of-two alignment.
///
/// Returns `None` on overflow.
#[inline]
pub fn align_up_u64(offset: u64, align: u64) -> Option<u64> {
    debug_assert!(align.is_power_of_two());
    offset.checked_add(align - 1).map(|v| v & !(align - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_u64() {
        assert_eq!(align_up_u64(0, 8), Some(0));
        assert_eq!(align_up_u64(9, 8), Some(16));
        assert_eq!(align_up_u64(17, 16), Some(32));
        assert_eq!(align_up_u64(2048, 16), Some(2048));
        assert_eq!(align_up_u64(u64::MAX, 16), None);
    }
}
