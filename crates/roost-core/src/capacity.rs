//! Power-of-two growth for buffers reused across frames.
//!
//! Every per-frame buffer in Roost (tree nodes, payloads, grid counts,
//! offsets, group sums, agent records) follows the same policy: it is
//! grown to the next power of two at or above the requested size when a
//! request does not fit, and it is never shrunk. Steady-state frames
//! therefore do not allocate.

use crate::error::CapacityError;

/// Smallest capacity any buffer is grown to.
pub const MIN_CAPACITY: usize = 16;

/// Largest element count addressable with `u32` indices.
pub const U32_INDEX_LIMIT: usize = u32::MAX as usize;

/// The capacity a buffer must have to hold `required` elements.
///
/// Returns the next power of two at or above `required`, and never less
/// than [`MIN_CAPACITY`].
pub fn pow2_capacity(required: usize) -> Result<usize, CapacityError> {
    required
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .ok_or(CapacityError::Overflow { requested: required })
}

/// Check that `required` elements can be addressed with `u32` indices.
pub fn check_u32_index(required: usize) -> Result<(), CapacityError> {
    if required > U32_INDEX_LIMIT {
        return Err(CapacityError::IndexLimit {
            requested: required,
            limit: U32_INDEX_LIMIT,
        });
    }
    Ok(())
}

/// Grow `buf` so that its length is at least `required`.
///
/// When growth is needed the new length is [`pow2_capacity`] of
/// `required` and the new tail is filled with `fill`. Existing contents
/// are kept. Returns `true` if the buffer grew.
pub fn grow_len<T>(
    buf: &mut Vec<T>,
    required: usize,
    fill: impl FnMut() -> T,
) -> Result<bool, CapacityError> {
    if buf.len() >= required {
        return Ok(false);
    }
    let new_len = pow2_capacity(required)?;
    buf.resize_with(new_len, fill);
    Ok(true)
}

/// Reserve so that `buf` can hold `required` elements without reallocating.
///
/// Only the allocation grows; the length is untouched. Returns `true` if
/// a reallocation happened.
pub fn reserve_pow2<T>(buf: &mut Vec<T>, required: usize) -> Result<bool, CapacityError> {
    if buf.capacity() >= required {
        return Ok(false);
    }
    let target = pow2_capacity(required)?;
    buf.reserve_exact(target - buf.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pow2_capacity_has_a_floor() {
        assert_eq!(pow2_capacity(0).unwrap(), MIN_CAPACITY);
        assert_eq!(pow2_capacity(1).unwrap(), MIN_CAPACITY);
        assert_eq!(pow2_capacity(16).unwrap(), 16);
        assert_eq!(pow2_capacity(17).unwrap(), 32);
        assert_eq!(pow2_capacity(1000).unwrap(), 1024);
    }

    #[test]
    fn pow2_capacity_overflow() {
        let err = pow2_capacity(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            CapacityError::Overflow {
                requested: usize::MAX
            }
        );
    }

    #[test]
    fn u32_index_limit() {
        assert!(check_u32_index(1 << 20).is_ok());
        assert!(matches!(
            check_u32_index(U32_INDEX_LIMIT + 1),
            Err(CapacityError::IndexLimit { .. })
        ));
    }

    #[test]
    fn grow_len_keeps_contents_and_never_shrinks() {
        let mut buf = vec![7u32; 3];
        assert!(grow_len(&mut buf, 20, || 0).unwrap());
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[..3], &[7, 7, 7]);
        assert!(buf[3..].iter().all(|&v| v == 0));

        assert!(!grow_len(&mut buf, 5, || 0).unwrap());
        assert_eq!(buf.len(), 32);
    }

    #[test]
    fn reserve_pow2_grows_capacity_only() {
        let mut buf: Vec<u8> = Vec::new();
        assert!(reserve_pow2(&mut buf, 100).unwrap());
        assert!(buf.capacity() >= 128);
        assert!(buf.is_empty());
        assert!(!reserve_pow2(&mut buf, 50).unwrap());
    }

    proptest! {
        #[test]
        fn pow2_capacity_is_power_of_two_and_fits(n in 0usize..1_000_000) {
            let cap = pow2_capacity(n).unwrap();
            prop_assert!(cap.is_power_of_two());
            prop_assert!(cap >= n);
            prop_assert!(cap >= MIN_CAPACITY);
            prop_assert!(cap < 2 * n.max(MIN_CAPACITY));
        }
    }
}
