//! Raw cell storage for a pool (internal).

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// One contiguous allocation of `len` uninitialized cells of `T`.
///
/// Memory is released when dropped. The chunk never reads or drops the
/// cells themselves; whoever hands them out owns their contents.
pub(crate) struct Chunk<T> {
    ptr: NonNull<T>,
    len: usize,
}

impl<T> Chunk<T> {
    /// Returns the layout of a chunk of `len` cells, or `None` if it
    /// would overflow `isize::MAX` bytes.
    pub(crate) fn layout(len: usize) -> Option<Layout> {
        Layout::array::<T>(len).ok()
    }

    /// Allocate `len` cells.
    ///
    /// Aborts through [`alloc::handle_alloc_error`] if the system allocator
    /// cannot satisfy the request.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero or the layout overflows. The pool validates
    /// both at construction, so this only fires on internal misuse.
    pub(crate) fn alloc(len: usize) -> Self {
        assert!(len > 0, "chunk length must be non-zero");
        let layout = Self::layout(len).expect("chunk layout overflow");

        if layout.size() == 0 {
            // Zero-sized T: every cell lives at the same dangling address.
            return Self {
                ptr: NonNull::dangling(),
                len,
            };
        }

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<T>()) else {
            alloc::handle_alloc_error(layout);
        };

        Self { ptr, len }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns a pointer to cell `index`.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len`.
    #[inline]
    pub(crate) unsafe fn cell(&self, index: usize) -> NonNull<T> {
        debug_assert!(index < self.len);
        // SAFETY: caller keeps index in bounds of the allocation.
        unsafe { self.ptr.add(index) }
    }
}

// Cells are plain memory; sending the region is sound when T is Send.
unsafe impl<T: Send> Send for Chunk<T> {}

impl<T> Drop for Chunk<T> {
    fn drop(&mut self) {
        // `alloc` already proved this layout valid.
        let Some(layout) = Self::layout(self.len) else {
            return;
        };
        if layout.size() != 0 {
            // SAFETY: ptr came from `alloc::alloc` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
        }
    }
}
