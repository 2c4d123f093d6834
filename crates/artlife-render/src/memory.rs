//! Zero-copy bridge from a universe's memory to the renderer.
//!
//! [`acquire_view`] turns the universe's current `(pointer, count)` pair into
//! an [`EntityView`]: a borrowed slice of the universe's own memory plus the
//! record count. Nothing is copied and nothing is cached. The pointer is read
//! afresh on every call because the universe may have moved its entity
//! buffer since the last one.
//!
//! An [`EntityView`] borrows the universe, so it cannot outlive the draw call
//! that acquired it: holding one across a step would need `&mut` access to
//! the universe while the view still borrows it, which does not compile.

use artlife_universe::record::{read_position, LIFE_RECORD_STRIDE};
use artlife_universe::Universe;

use crate::RenderError;

/// Location of a view within the universe's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSpan {
    /// Byte offset of the first record.
    pub offset: usize,
    /// Records the universe reported.
    pub count: usize,
}

/// A frame-scoped window onto the entity buffer.
#[derive(Debug, Clone, Copy)]
pub struct EntityView<'frame> {
    /// The bytes starting at the buffer pointer, cut to the reported length
    /// or to the end of memory, whichever comes first.
    bytes: &'frame [u8],
    offset: usize,
    count: usize,
}

impl<'frame> EntityView<'frame> {
    /// A view with no records.
    pub fn empty() -> Self {
        Self {
            bytes: &[],
            offset: 0,
            count: 0,
        }
    }

    /// Byte offset of the first record in the universe's memory.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Records the universe reported for this frame.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the universe reported no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Records fully backed by memory. Equal to [`len`](Self::len) unless
    /// the universe reported a buffer running past the end of its memory.
    pub fn available(&self) -> usize {
        self.bytes.len() / LIFE_RECORD_STRIDE
    }

    /// Offset and count, for comparing acquisitions.
    pub fn span(&self) -> ViewSpan {
        ViewSpan {
            offset: self.offset,
            count: self.count,
        }
    }

    /// Raw bytes of record `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::OutOfBoundsRecord`] if the record is past the
    /// reported count or not fully backed by memory.
    pub fn record_bytes(&self, index: usize) -> Result<&'frame [u8], RenderError> {
        let out_of_bounds = || RenderError::OutOfBoundsRecord {
            index,
            count: self.count,
            available: self.available(),
        };
        if index >= self.count {
            return Err(out_of_bounds());
        }
        let start = index
            .checked_mul(LIFE_RECORD_STRIDE)
            .ok_or_else(out_of_bounds)?;
        self.bytes
            .get(start..start.saturating_add(LIFE_RECORD_STRIDE))
            .ok_or_else(out_of_bounds)
    }

    /// Position of record `index`, read by stride and field offset.
    ///
    /// # Errors
    ///
    /// Same as [`record_bytes`](Self::record_bytes).
    pub fn position(&self, index: usize) -> Result<(f32, f32), RenderError> {
        let bytes = self.record_bytes(index)?;
        read_position(bytes).ok_or(RenderError::OutOfBoundsRecord {
            index,
            count: self.count,
            available: self.available(),
        })
    }
}

/// Build a view over the universe's current entity buffer.
///
/// Reads the count first; when it is zero the buffer pointer is not even
/// consulted and an empty view comes back.
///
/// # Errors
///
/// Returns [`RenderError::Universe`] if the universe fails to report its
/// count or pointer.
pub fn acquire_view<U: Universe + ?Sized>(
    universe: &mut U,
) -> Result<EntityView<'_>, RenderError> {
    let count = universe.entity_count()?;
    if count == 0 {
        return Ok(EntityView::empty());
    }
    let offset = universe.entity_buffer_ptr()?;

    // Path call: method syntax would pick the `&mut U` blanket impl and
    // borrow the local parameter instead of the universe.
    let memory: &[u8] = U::memory(universe);
    let wanted = count.saturating_mul(LIFE_RECORD_STRIDE);
    let tail = memory.get(offset..).unwrap_or(&[]);
    let bytes = &tail[..wanted.min(tail.len())];

    if bytes.len() < wanted {
        tracing::debug!(
            offset,
            count,
            memory_len = memory.len(),
            "entity buffer runs past the end of universe memory"
        );
    }

    Ok(EntityView {
        bytes,
        offset,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artlife_universe::prelude::*;

    /// A universe whose pointer, count, and memory are set by hand.
    struct FixedUniverse {
        memory: Vec<u8>,
        ptr: usize,
        count: usize,
        ptr_reads: usize,
    }

    impl Universe for FixedUniverse {
        fn width(&mut self) -> Result<u32, UniverseError> {
            Ok(10)
        }
        fn height(&mut self) -> Result<u32, UniverseError> {
            Ok(10)
        }
        fn entity_count(&mut self) -> Result<usize, UniverseError> {
            Ok(self.count)
        }
        fn entity_buffer_ptr(&mut self) -> Result<usize, UniverseError> {
            self.ptr_reads += 1;
            Ok(self.ptr)
        }
        fn memory(&self) -> &[u8] {
            &self.memory
        }
    }

    fn universe_with(records: &[(f32, f32)], ptr: usize) -> FixedUniverse {
        let mut memory = vec![0u8; ptr + records.len() * LIFE_RECORD_STRIDE];
        for (i, (x, y)) in records.iter().enumerate() {
            let at = ptr + i * LIFE_RECORD_STRIDE;
            LifeRecord::new(Species::Plant, *x, *y).encode_into(&mut memory[at..]);
        }
        FixedUniverse {
            memory,
            ptr,
            count: records.len(),
            ptr_reads: 0,
        }
    }

    #[test]
    fn view_covers_reported_records() {
        let mut universe = universe_with(&[(1.0, 2.0), (3.0, 4.0)], 37);
        let view = acquire_view(&mut universe).unwrap();
        assert_eq!(view.span(), ViewSpan { offset: 37, count: 2 });
        assert_eq!(view.available(), 2);
        assert_eq!(view.position(0).unwrap(), (1.0, 2.0));
        assert_eq!(view.position(1).unwrap(), (3.0, 4.0));
    }

    #[test]
    fn zero_entities_yield_empty_view() {
        let mut universe = universe_with(&[], 64);
        let view = acquire_view(&mut universe).unwrap();
        assert!(view.is_empty());
        assert_eq!(universe.ptr_reads, 0);
    }

    #[test]
    fn pointer_is_reread_every_acquisition() {
        let mut universe = universe_with(&[(5.0, 6.0)], 16);
        acquire_view(&mut universe).unwrap();
        acquire_view(&mut universe).unwrap();
        assert_eq!(universe.ptr_reads, 2);
    }

    #[test]
    fn index_past_count_is_out_of_bounds() {
        let mut universe = universe_with(&[(5.0, 6.0)], 0);
        let view = acquire_view(&mut universe).unwrap();
        assert!(matches!(
            view.position(1),
            Err(RenderError::OutOfBoundsRecord {
                index: 1,
                count: 1,
                available: 1
            })
        ));
    }

    #[test]
    fn buffer_past_end_of_memory_is_truncated() {
        let mut universe = universe_with(&[(1.0, 1.0), (2.0, 2.0)], 8);
        universe.count = 5;
        let view = acquire_view(&mut universe).unwrap();

        assert_eq!(view.len(), 5);
        assert_eq!(view.available(), 2);
        assert!(view.position(1).is_ok());
        assert!(matches!(
            view.position(2),
            Err(RenderError::OutOfBoundsRecord { index: 2, .. })
        ));
    }

    /// Acquire through a generic caller so the view's lifetime is tied to
    /// the caller's borrow, not to a local inside `acquire_view`.
    fn first_position<U: Universe + ?Sized>(universe: &mut U) -> Option<(f32, f32)> {
        let view = acquire_view(universe).ok()?;
        view.position(0).ok()
    }

    #[test]
    fn view_outlives_generic_and_reborrowed_callers() {
        let mut universe = universe_with(&[(7.0, 8.0)], 24);
        assert_eq!(first_position(&mut universe), Some((7.0, 8.0)));

        let mut by_ref = &mut universe;
        let view = acquire_view(&mut by_ref).unwrap();
        assert_eq!(view.position(0).unwrap(), (7.0, 8.0));

        let dynamic: &mut dyn Universe = &mut universe;
        let bytes = acquire_view(dynamic).unwrap().record_bytes(0).unwrap();
        assert_eq!(bytes.len(), LIFE_RECORD_STRIDE);
    }

    #[test]
    fn pointer_beyond_memory_gives_no_bytes() {
        let mut universe = universe_with(&[(1.0, 1.0)], 0);
        universe.ptr = 10_000;
        let view = acquire_view(&mut universe).unwrap();
        assert_eq!(view.available(), 0);
        assert!(view.position(0).is_err());
    }
}
