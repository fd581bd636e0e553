// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Backing memory shared by the buffered input and output, together with the algorithm that
//! decides how to make room for more bytes behind the occupied window.
//!
//! Both buffers describe their contents as an occupied window `[start, end)` inside the storage.
//! For the input the window holds unconsumed data; for the output it holds unflushed data. Free
//! space for new bytes always follows the window.

use tracing::{Level, event};

use crate::{Error, Result};

/// How room for `required` trailing bytes is going to be made.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Plan {
    /// The trailing free space is already sufficient.
    Ready,

    /// The window is empty; both cursors move back to the start without copying.
    Rewind,

    /// The window moves to the start of the storage, reclaiming the space in front of it.
    Compact,

    /// The storage is replaced with a larger allocation of the given capacity.
    Grow(usize),
}

/// Decides how to make `required` bytes of trailing free space available behind `[start, end)`.
pub(crate) fn plan(capacity: usize, start: usize, end: usize, required: usize) -> Result<Plan> {
    debug_assert!(start <= end && end <= capacity);

    let used = end - start;

    if used == 0 && start != 0 {
        return if capacity < required {
            Ok(Plan::Grow(grown_capacity(capacity, required)?))
        } else {
            Ok(Plan::Rewind)
        };
    }

    let needed = used.checked_add(required).ok_or(Error::BadAllocation { requested: usize::MAX })?;

    if needed > capacity {
        return Ok(Plan::Grow(grown_capacity(capacity, needed)?));
    }

    let trailing = capacity - end;

    if trailing < required {
        return Ok(Plan::Compact);
    }

    // Small compactions are only worth their copy if they at least double the trailing room.
    if start != 0 && trailing < capacity / 2 && capacity - used >= trailing.saturating_mul(2) {
        return Ok(Plan::Compact);
    }

    Ok(Plan::Ready)
}

/// The smallest multiple of `capacity` that holds `needed` bytes.
///
/// A zero capacity buffer was never sized, so it gets exactly what is needed.
pub(crate) fn grown_capacity(capacity: usize, needed: usize) -> Result<usize> {
    if capacity == 0 {
        return Ok(needed);
    }

    needed
        .div_ceil(capacity)
        .checked_mul(capacity)
        .ok_or(Error::BadAllocation { requested: needed })
}

/// The memory behind a buffer.
#[derive(Debug)]
pub(crate) enum Storage<'a> {
    /// Owned heap memory that may be reallocated.
    Owned(Vec<u8>),

    /// Caller-supplied writable memory of fixed size.
    Fixed(&'a mut [u8]),

    /// Caller-supplied read-only memory of fixed size.
    Frozen(&'a [u8]),
}

impl Storage<'_> {
    /// Allocates owned storage of exactly `capacity` bytes.
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::Owned(allocate(capacity)?))
    }

    pub(crate) fn capacity(&self) -> usize {
        self.as_slice().len()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes.as_slice(),
            Self::Fixed(bytes) => &**bytes,
            Self::Frozen(bytes) => *bytes,
        }
    }

    /// The writable view of the storage, if the storage is writable at all.
    pub(crate) fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Owned(bytes) => Some(bytes.as_mut_slice()),
            Self::Fixed(bytes) => Some(&mut **bytes),
            Self::Frozen(_) => None,
        }
    }

    /// Makes at least `required` bytes of free space available after the window `[start, end)`.
    ///
    /// Returns the new window bounds. The window contents are preserved on every path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAllocation`] if the storage must grow but cannot, because it is
    /// caller-supplied or because the allocator refused.
    pub(crate) fn make_room(&mut self, start: usize, end: usize, required: usize) -> Result<(usize, usize)> {
        let capacity = self.capacity();

        match plan(capacity, start, end, required)? {
            Plan::Ready => Ok((start, end)),
            Plan::Rewind => Ok((0, 0)),
            Plan::Compact => {
                let bytes = self.as_mut_slice().ok_or(Error::BadAllocation { requested: capacity })?;
                bytes.copy_within(start..end, 0);

                event!(Level::TRACE, message = "compacted", moved = end - start, from = start, capacity);

                Ok((0, end - start))
            }
            Plan::Grow(new_capacity) => {
                let Self::Owned(bytes) = self else {
                    return Err(Error::BadAllocation { requested: new_capacity });
                };

                let mut grown = allocate(new_capacity)?;
                grown[..end - start].copy_from_slice(&bytes[start..end]);
                *bytes = grown;

                event!(Level::TRACE, message = "reallocated", old_capacity = capacity, new_capacity, moved = end - start);

                Ok((0, end - start))
            }
        }
    }
}

fn allocate(capacity: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(capacity)
        .map_err(|_alloc_error| Error::BadAllocation { requested: capacity })?;
    bytes.resize(capacity, 0);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::fits_behind_window(16, 0, 4, 8, Plan::Ready)]
    #[case::zero_request(16, 4, 8, 0, Plan::Ready)]
    #[case::empty_window_rewinds(16, 10, 10, 12, Plan::Rewind)]
    #[case::fragmented_free_space(16, 8, 12, 8, Plan::Compact)]
    #[case::small_trailing_room_doubles(16, 10, 14, 1, Plan::Compact)]
    #[case::compaction_would_not_double(16, 2, 12, 1, Plan::Ready)]
    #[case::one_byte_left_full_request(16, 15, 16, 16, Plan::Grow(32))]
    #[case::large_request(16, 0, 10, 40, Plan::Grow(64))]
    #[case::unsized_buffer(0, 0, 0, 5, Plan::Grow(5))]
    #[case::empty_window_too_small(8, 3, 3, 9, Plan::Grow(16))]
    fn plans(#[case] capacity: usize, #[case] start: usize, #[case] end: usize, #[case] required: usize, #[case] expected: Plan) {
        assert_eq!(plan(capacity, start, end, required).unwrap(), expected);
    }

    #[test]
    fn grown_capacity_is_a_multiple_of_current() {
        assert_eq!(grown_capacity(16, 17).unwrap(), 32);
        assert_eq!(grown_capacity(16, 32).unwrap(), 32);
        assert_eq!(grown_capacity(10, 95).unwrap(), 100);
        assert_eq!(grown_capacity(0, 7).unwrap(), 7);
    }

    #[test]
    fn grown_capacity_overflow_is_bad_allocation() {
        let e = grown_capacity(usize::MAX / 2 + 1, usize::MAX).unwrap_err();
        assert!(matches!(e, Error::BadAllocation { .. }));
    }

    #[test]
    fn compaction_preserves_window() {
        let mut storage = Storage::Owned(b"xxxxabcd".to_vec());

        let (start, end) = storage.make_room(4, 8, 3).unwrap();

        assert_eq!((start, end), (0, 4));
        assert_eq!(&storage.as_slice()[start..end], b"abcd");
        assert_eq!(storage.capacity(), 8);
    }

    #[test]
    fn growth_preserves_window() {
        let mut storage = Storage::Owned(b"xxxxabcd".to_vec());

        let (start, end) = storage.make_room(4, 8, 8).unwrap();

        assert_eq!((start, end), (0, 4));
        assert_eq!(&storage.as_slice()[start..end], b"abcd");
        assert_eq!(storage.capacity(), 16);
    }

    #[test]
    fn fixed_storage_does_not_grow() {
        let mut memory = [0_u8; 4];
        let mut storage = Storage::Fixed(&mut memory);

        let e = storage.make_room(0, 2, 4).unwrap_err();

        assert!(matches!(e, Error::BadAllocation { requested: 8 }));
    }

    #[test]
    fn fixed_storage_compacts() {
        let mut memory = *b"..ab";
        let mut storage = Storage::Fixed(&mut memory);

        let (start, end) = storage.make_room(2, 4, 2).unwrap();

        assert_eq!(&storage.as_slice()[start..end], b"ab");
    }

    #[test]
    fn frozen_storage_is_read_only() {
        let mut storage = Storage::Frozen(b"abc");

        assert!(storage.as_mut_slice().is_none());
        assert_eq!(storage.as_slice(), b"abc");
    }
}
