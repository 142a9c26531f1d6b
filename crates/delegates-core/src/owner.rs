//! Receiver identity for method bindings

use core::fmt;

/// Address of the receiver a method binding is bound to
///
/// Used by `is_bound_to`, `clear_if_bound_to` and `remove_owner`. The value
/// is only compared, never dereferenced. Free-function and closure bindings
/// report [`OwnerId::NONE`], and `NONE` never matches anything, so passing it
/// to a removal operation cannot clear unrelated bindings.
///
/// Zero-sized values can share an address, so raw method bindings refuse
/// zero-sized receivers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OwnerId(usize);

impl OwnerId {
    /// No owner (null address)
    pub const NONE: OwnerId = OwnerId(0);

    /// Identity of the object behind `receiver`
    #[inline]
    pub fn of<T: ?Sized>(receiver: &T) -> Self {
        Self::from_ptr(receiver as *const T)
    }

    /// Identity of the object `ptr` points to; a null pointer yields `NONE`.
    #[inline]
    pub fn from_ptr<T: ?Sized>(ptr: *const T) -> Self {
        OwnerId(ptr.cast::<()>() as usize)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// True iff both identities are present and equal
    #[inline]
    pub fn matches(self, other: OwnerId) -> bool {
        self.is_some() && self == other
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        OwnerId::NONE
    }
}

impl<T: ?Sized> From<&T> for OwnerId {
    fn from(receiver: &T) -> Self {
        OwnerId::of(receiver)
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "OwnerId(NONE)")
        } else {
            write!(f, "OwnerId({:#x})", self.0)
        }
    }
}
