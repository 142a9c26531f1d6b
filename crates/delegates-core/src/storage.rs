//! Inline storage for one type-erased callable
//!
//! Small callables (fn pointers, method bindings, closures capturing a couple
//! of words) live in an embedded buffer. Anything larger, or more strictly
//! aligned, than the buffer gets a single heap block instead.
//!
//! The storage records how to destroy the object it holds, so `release`,
//! `Drop` and moves need no outside help. Copying needs the concrete type's
//! `Clone`, which only the owning delegate knows; see `delegate::CallableVTable`.
//!
//! Layout of an `InlineStorage` on 64-bit targets:
//! ```text
//! 0x00: inline    (32 bytes, 16-aligned) - embedded buffer
//! 0x20: heap      (8 bytes)  - heap block, None when inline
//! 0x28: layout    (16 bytes) - layout of the held object
//! 0x38: drop_fn   (8 bytes)  - destructor of the held object
//! ```

use core::alloc::Layout;
use core::fmt;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;
use std::alloc;

use crate::klog_trace;

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// Bytes available in the embedded buffer (four machine words)
        pub const INLINE_CAPACITY: usize = 32;
    } else if #[cfg(target_pointer_width = "32")] {
        /// Bytes available in the embedded buffer (four machine words)
        pub const INLINE_CAPACITY: usize = 16;
    } else {
        /// Bytes available in the embedded buffer (four machine words)
        pub const INLINE_CAPACITY: usize = 4 * mem::size_of::<usize>();
    }
}

/// Strictest alignment the embedded buffer can satisfy
pub const INLINE_ALIGN: usize = 16;

#[repr(C, align(16))]
struct InlineBuffer([MaybeUninit<u8>; INLINE_CAPACITY]);

const _: () = assert!(mem::align_of::<InlineBuffer>() == INLINE_ALIGN);

/// Hybrid inline/heap buffer owning at most one typed object
pub struct InlineStorage {
    inline: InlineBuffer,
    /// Heap block when the object did not fit inline
    heap: Option<NonNull<u8>>,
    /// Layout of the current allocation; size 0 when empty
    layout: Layout,
    /// Destructor of the object in place, `None` when no object is held
    drop_fn: Option<unsafe fn(*mut u8)>,
}

unsafe fn drop_erased<T>(ptr: *mut u8) {
    core::ptr::drop_in_place(ptr.cast::<T>());
}

impl InlineStorage {
    pub const fn new() -> Self {
        Self {
            inline: InlineBuffer([MaybeUninit::uninit(); INLINE_CAPACITY]),
            heap: None,
            layout: Layout::new::<()>(),
            drop_fn: None,
        }
    }

    /// Whether an object of `layout` is stored in the embedded buffer
    #[inline]
    pub const fn fits_inline(layout: Layout) -> bool {
        layout.size() <= INLINE_CAPACITY && layout.align() <= INLINE_ALIGN
    }

    /// Release whatever is held, then reserve room for `layout`.
    ///
    /// Returns the embedded buffer when the layout fits, a fresh heap block
    /// otherwise. The memory is uninitialised and no destructor is
    /// registered: the caller constructs the object in place and must not
    /// expect `release` to drop it. [`emplace`](Self::emplace) does both
    /// steps safely.
    pub fn allocate(&mut self, layout: Layout) -> NonNull<u8> {
        self.release();

        if layout.size() != 0 && !Self::fits_inline(layout) {
            // SAFETY: layout has a non-zero size.
            let raw = unsafe { alloc::alloc(layout) };
            let block = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
            klog_trace!(
                "storage",
                "{} bytes (align {}) spilled to heap",
                layout.size(),
                layout.align()
            );
            self.heap = Some(block);
        }

        self.layout = layout;
        self.location()
    }

    /// Move `value` into the storage, releasing any previous object.
    pub fn emplace<T>(&mut self, value: T) -> NonNull<T> {
        let ptr = self.allocate(Layout::new::<T>()).cast::<T>();
        // SAFETY: allocate returned memory sized and aligned for T.
        unsafe { ptr.as_ptr().write(value) };
        self.drop_fn = Some(drop_erased::<T>);
        ptr
    }

    /// Destroy the held object (if any) and free its heap block (if any).
    ///
    /// The storage is empty afterwards even if the destructor panics; in
    /// that case a heap block is leaked rather than freed.
    pub fn release(&mut self) {
        let location = self.location();
        let drop_fn = self.drop_fn.take();
        let heap = self.heap.take();
        let layout = mem::replace(&mut self.layout, Layout::new::<()>());

        if let Some(drop_fn) = drop_fn {
            // SAFETY: drop_fn was registered by emplace for the object that
            // lives at `location`, and it has not been dropped since.
            unsafe { drop_fn(location.as_ptr()) };
        }

        if let Some(block) = heap {
            // SAFETY: block was allocated in `allocate` with this layout.
            unsafe { alloc::dealloc(block.as_ptr(), layout) };
        }
    }

    /// Whether an object is currently held
    #[inline]
    pub fn occupied(&self) -> bool {
        self.drop_fn.is_some()
    }

    /// Bytes used by the held object (0 when empty or zero-sized)
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Whether the current allocation lives in a heap block
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.heap.is_some()
    }

    /// Move the held object out, leaving this storage empty.
    ///
    /// A heap block changes owner without reallocating; an inline object is
    /// copied byte for byte, which is sound because Rust values are always
    /// relocatable.
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match self.heap {
            Some(block) => block.as_ptr() as *const u8,
            None if self.layout.size() == 0 => dangling(self.layout) as *const u8,
            None => self.inline.0.as_ptr().cast::<u8>(),
        }
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.location().as_ptr()
    }

    /// # Safety
    ///
    /// The storage must hold an initialised `T` (placed by `emplace::<T>` or
    /// constructed in place after `allocate(Layout::new::<T>())`).
    #[inline]
    pub unsafe fn get<T>(&self) -> &T {
        &*self.as_ptr().cast::<T>()
    }

    /// # Safety
    ///
    /// Same contract as [`get`](Self::get).
    #[inline]
    pub unsafe fn get_mut<T>(&mut self) -> &mut T {
        &mut *self.as_mut_ptr().cast::<T>()
    }

    fn location(&mut self) -> NonNull<u8> {
        match self.heap {
            Some(block) => block,
            None if self.layout.size() == 0 => {
                // SAFETY: an alignment is never zero.
                unsafe { NonNull::new_unchecked(dangling(self.layout)) }
            }
            // SAFETY: a field address is never null.
            None => unsafe { NonNull::new_unchecked(self.inline.0.as_mut_ptr().cast::<u8>()) },
        }
    }
}

/// Well-aligned address for zero-sized objects
#[inline]
fn dangling(layout: Layout) -> *mut u8 {
    layout.align() as *mut u8
}

impl Default for InlineStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InlineStorage {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for InlineStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineStorage")
            .field("occupied", &self.occupied())
            .field("size", &self.size())
            .field("heap", &self.is_heap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Bumps a shared counter when dropped
    struct DropProbe<const N: usize> {
        drops: Rc<Cell<usize>>,
        payload: [u8; N],
    }

    impl<const N: usize> DropProbe<N> {
        fn new(drops: &Rc<Cell<usize>>, fill: u8) -> Self {
            Self {
                drops: Rc::clone(drops),
                payload: [fill; N],
            }
        }
    }

    impl<const N: usize> Drop for DropProbe<N> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn test_new_is_empty() {
        let storage = InlineStorage::new();
        assert!(!storage.occupied());
        assert_eq!(storage.size(), 0);
        assert!(!storage.is_heap());
    }

    #[test]
    fn test_small_value_stays_inline() {
        let mut storage = InlineStorage::new();
        storage.emplace(0xdead_beef_u64);

        assert!(storage.occupied());
        assert!(!storage.is_heap());
        assert_eq!(storage.size(), 8);
        assert_eq!(unsafe { *storage.get::<u64>() }, 0xdead_beef);
    }

    #[test]
    fn test_large_value_spills_to_heap() {
        let mut storage = InlineStorage::new();
        let mut big = [0u8; 1024];
        big[0] = 10;
        big[1023] = 20;
        storage.emplace(big);

        assert!(storage.is_heap());
        assert_eq!(storage.size(), 1024);
        let held = unsafe { storage.get::<[u8; 1024]>() };
        assert_eq!(held[0], 10);
        assert_eq!(held[1023], 20);
    }

    #[test]
    fn test_threshold_boundary() {
        let mut storage = InlineStorage::new();
        storage.emplace([1u8; INLINE_CAPACITY]);
        assert!(!storage.is_heap());

        storage.emplace([1u8; INLINE_CAPACITY + 1]);
        assert!(storage.is_heap());
    }

    #[test]
    fn test_over_aligned_value_goes_to_heap() {
        #[repr(align(64))]
        struct Wide(u8);

        let mut storage = InlineStorage::new();
        let ptr = storage.emplace(Wide(7));
        assert!(storage.is_heap());
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        assert_eq!(unsafe { storage.get::<Wide>() }.0, 7);
    }

    #[test]
    fn test_release_drops_inline_and_heap() {
        let drops = Rc::new(Cell::new(0));
        let mut storage = InlineStorage::new();

        storage.emplace(DropProbe::<4>::new(&drops, 1));
        assert!(!storage.is_heap());
        storage.release();
        assert_eq!(drops.get(), 1);
        assert!(!storage.occupied());

        storage.emplace(DropProbe::<512>::new(&drops, 2));
        assert!(storage.is_heap());
        storage.release();
        assert_eq!(drops.get(), 2);
        assert!(!storage.is_heap());
        assert_eq!(storage.size(), 0);
    }

    #[test]
    fn test_emplace_releases_previous() {
        let drops = Rc::new(Cell::new(0));
        let mut storage = InlineStorage::new();

        storage.emplace(DropProbe::<512>::new(&drops, 1));
        storage.emplace(DropProbe::<4>::new(&drops, 2));
        assert_eq!(drops.get(), 1);
        assert!(!storage.is_heap());
        assert_eq!(unsafe { storage.get::<DropProbe<4>>() }.payload, [2; 4]);

        drop(storage);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_take_moves_heap_block_without_copy() {
        let drops = Rc::new(Cell::new(0));
        let mut source = InlineStorage::new();
        source.emplace(DropProbe::<256>::new(&drops, 9));
        let block = source.as_ptr();

        let dest = source.take();
        assert!(!source.occupied());
        assert!(dest.is_heap());
        assert_eq!(dest.as_ptr(), block);
        assert_eq!(drops.get(), 0);

        drop(source);
        assert_eq!(drops.get(), 0);
        drop(dest);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_take_copies_inline_bytes() {
        let mut source = InlineStorage::new();
        source.emplace((1u32, 2u32, 3u64));

        let dest = source.take();
        assert!(!source.occupied());
        assert!(!dest.is_heap());
        assert_eq!(unsafe { *dest.get::<(u32, u32, u64)>() }, (1, 2, 3));
    }

    #[test]
    fn test_zero_sized_value_is_occupied() {
        let mut storage = InlineStorage::new();
        storage.emplace(());
        assert!(storage.occupied());
        assert_eq!(storage.size(), 0);
        assert!(!storage.is_heap());
        storage.release();
        assert!(!storage.occupied());
    }

    #[test]
    fn test_raw_allocate_has_no_destructor() {
        let mut storage = InlineStorage::new();
        let location = storage.allocate(Layout::new::<u32>());
        unsafe { location.cast::<u32>().as_ptr().write(5) };

        assert!(!storage.occupied());
        assert_eq!(storage.size(), 4);
        storage.release();
        assert_eq!(storage.size(), 0);
    }
}
