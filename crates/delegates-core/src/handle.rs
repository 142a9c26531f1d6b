//! Subscription handles and the process-wide handle allocator

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier naming one multicast subscription
///
/// Handles are issued by [`HandleAllocator::next`] when a subscription is
/// added and are never reused while the process runs. The maximum value
/// (`u64::MAX`) is reserved as the invalid sentinel.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DelegateHandle(u64);

impl DelegateHandle {
    /// Sentinel that never names a subscription
    pub const NONE: DelegateHandle = DelegateHandle(u64::MAX);

    /// Issue a fresh handle from the global allocator
    #[inline]
    pub fn next() -> Self {
        HANDLES.next()
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Forget which subscription this copy named.
    ///
    /// Only this copy is affected; the registry keeps its own record until
    /// the subscription is removed.
    #[inline]
    pub fn reset(&mut self) {
        *self = DelegateHandle::NONE;
    }

    #[inline]
    pub const fn to_option(self) -> Option<DelegateHandle> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for DelegateHandle {
    fn default() -> Self {
        DelegateHandle::NONE
    }
}

impl fmt::Debug for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "DelegateHandle(NONE)")
        } else {
            write!(f, "DelegateHandle({})", self.0)
        }
    }
}

impl fmt::Display for DelegateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Monotonic handle source
///
/// A relaxed `fetch_add` is enough: handles only need to be distinct, not
/// ordered with respect to other memory.
pub struct HandleAllocator {
    next_id: AtomicU64,
}

static HANDLES: HandleAllocator = HandleAllocator::new();

impl HandleAllocator {
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    /// Issue the next handle; each call returns a larger id than the last.
    #[inline]
    pub fn next(&self) -> DelegateHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // The sentinel is never issued.
        debug_assert!(id != u64::MAX, "delegate handle space exhausted");
        DelegateHandle(id)
    }

    /// Number of handles issued so far
    #[inline]
    pub fn issued(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles issued by the process-wide allocator so far
pub fn issued_handles() -> u64 {
    HANDLES.issued()
}
