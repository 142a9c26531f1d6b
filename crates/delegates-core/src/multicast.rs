//! Multicast registry: ordered subscriptions with stable handles
//!
//! Each subscription is a [`Delegate`] tagged with the [`DelegateHandle`]
//! issued when it was added. Removal by handle or by owner uses a stable
//! erase, so the remaining subscriptions keep their relative order and
//! `broadcast` always calls them in the order they were added.
//!
//! `broadcast` takes `&mut self`. A callback therefore cannot add or remove
//! subscriptions on the registry that is calling it; sharing a registry
//! through `Rc<RefCell<..>>` turns such an attempt into a borrow panic
//! instead of silently skipping or repeating entries.

use core::fmt;

use crate::callable::{
    Callable, Closure, FreeFunction, RawMethod, RawMethodMut, SharedMethod, SharedReceiver,
};
use crate::delegate::Delegate;
use crate::error::{DelegateError, DelegateResult};
use crate::handle::DelegateHandle;
use crate::owner::OwnerId;
use crate::{klog_debug, klog_warn};

struct Subscription<Args, R> {
    handle: DelegateHandle,
    delegate: Delegate<Args, R>,
}

impl<Args, R> Clone for Subscription<Args, R> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            delegate: self.delegate.clone(),
        }
    }
}

/// Ordered set of independently removable delegates
pub struct MulticastDelegate<Args, R = ()> {
    subscriptions: Vec<Subscription<Args, R>>,
}

impl<Args, R> MulticastDelegate<Args, R> {
    pub const fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Register an already bound delegate.
    ///
    /// An unbound delegate is not registered and yields
    /// `DelegateHandle::NONE`.
    pub fn add(&mut self, delegate: Delegate<Args, R>) -> DelegateHandle {
        if !delegate.is_bound() {
            klog_warn!("multicast", "ignoring unbound delegate");
            return DelegateHandle::NONE;
        }

        let handle = DelegateHandle::next();
        self.subscriptions.push(Subscription { handle, delegate });
        klog_debug!(
            "multicast",
            "added subscription {} ({} total)",
            handle,
            self.subscriptions.len()
        );
        handle
    }

    pub fn add_fn<F, P>(&mut self, function: F, payload: P) -> DelegateHandle
    where
        F: Copy + 'static,
        P: Clone + 'static,
        FreeFunction<F, P>: Callable<Args, R>,
    {
        self.add(Delegate::from_fn(function, payload))
    }

    /// # Safety
    ///
    /// `receiver` must outlive the subscription (remove it, or drop the
    /// registry, before the receiver goes away). See
    /// [`Delegate::bind_raw`].
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized.
    pub unsafe fn add_raw<T, M, P>(&mut self, receiver: &T, method: M, payload: P) -> DelegateHandle
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethod<T, M, P>: Callable<Args, R>,
    {
        self.add(Delegate::from_raw(receiver, method, payload))
    }

    /// # Safety
    ///
    /// See [`Delegate::bind_raw_mut`].
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized.
    pub unsafe fn add_raw_mut<T, M, P>(
        &mut self,
        receiver: &mut T,
        method: M,
        payload: P,
    ) -> DelegateHandle
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethodMut<T, M, P>: Callable<Args, R>,
    {
        self.add(Delegate::from_raw_mut(receiver, method, payload))
    }

    pub fn add_shared<S, M, P>(&mut self, receiver: S, method: M, payload: P) -> DelegateHandle
    where
        S: SharedReceiver + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        SharedMethod<S, M, P>: Callable<Args, R>,
    {
        self.add(Delegate::from_shared(receiver, method, payload))
    }

    pub fn add_lambda<F, P>(&mut self, closure: F, payload: P) -> DelegateHandle
    where
        F: Clone + 'static,
        P: Clone + 'static,
        Closure<F, P>: Callable<Args, R>,
    {
        self.add(Delegate::from_lambda(closure, payload))
    }

    /// Remove the subscription named by `handle`; false if there is none.
    ///
    /// The caller's copy of the handle is left untouched, reset it with
    /// [`DelegateHandle::reset`] if it may be reused.
    pub fn remove(&mut self, handle: DelegateHandle) -> bool {
        if handle.is_none() {
            return false;
        }

        match self.subscriptions.iter().position(|s| s.handle == handle) {
            Some(index) => {
                self.subscriptions.remove(index);
                klog_debug!(
                    "multicast",
                    "removed subscription {} ({} left)",
                    handle,
                    self.subscriptions.len()
                );
                true
            }
            None => false,
        }
    }

    /// Like [`remove`](Self::remove), but reports the sentinel handle as an
    /// error instead of a miss.
    pub fn try_remove(&mut self, handle: DelegateHandle) -> DelegateResult<bool> {
        if handle.is_none() {
            return Err(DelegateError::InvalidHandle);
        }
        Ok(self.remove(handle))
    }

    /// Remove every method subscription bound to `owner`; returns how many
    /// were removed. `OwnerId::NONE` removes nothing.
    pub fn remove_owner(&mut self, owner: OwnerId) -> usize {
        if owner.is_none() {
            return 0;
        }

        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| !s.delegate.is_bound_to(owner));
        let removed = before - self.subscriptions.len();
        if removed > 0 {
            klog_debug!(
                "multicast",
                "removed {} subscription(s) of {:?}",
                removed,
                owner
            );
        }
        removed
    }

    pub fn remove_all(&mut self) {
        self.subscriptions.clear();
    }

    /// Call every subscription in order with a clone of `args`; results are
    /// discarded.
    pub fn broadcast(&mut self, args: Args)
    where
        Args: Clone,
    {
        for subscription in &mut self.subscriptions {
            // Only bound delegates are ever registered.
            let _ = subscription.delegate.execute_if_bound(args.clone());
        }
    }

    /// Number of subscriptions
    #[inline]
    pub fn size(&self) -> usize {
        self.subscriptions.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Whether `handle` names a live subscription in this registry
    pub fn is_bound(&self, handle: DelegateHandle) -> bool {
        handle.is_valid() && self.subscriptions.iter().any(|s| s.handle == handle)
    }

    /// Handles of the live subscriptions, in broadcast order
    pub fn handles(&self) -> impl Iterator<Item = DelegateHandle> + '_ {
        self.subscriptions.iter().map(|s| s.handle)
    }

    /// Move all subscriptions out, leaving this registry empty.
    pub fn take(&mut self) -> Self {
        Self {
            subscriptions: core::mem::take(&mut self.subscriptions),
        }
    }

    /// Restricted view that can subscribe and unsubscribe by owner, but
    /// cannot broadcast or remove other subscribers' entries.
    pub fn subscriber(&mut self) -> EventSubscriber<'_, Args, R> {
        EventSubscriber { registry: self }
    }
}

/// Clones every subscription; the copies keep their original handles.
impl<Args, R> Clone for MulticastDelegate<Args, R> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
        }
    }
}

impl<Args, R> Default for MulticastDelegate<Args, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, R> fmt::Debug for MulticastDelegate<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("handles", &self.handles().collect::<Vec<_>>())
            .finish()
    }
}

/// Subscribe-only access to an event's registry
pub struct EventSubscriber<'a, Args, R = ()> {
    registry: &'a mut MulticastDelegate<Args, R>,
}

impl<'a, Args, R> EventSubscriber<'a, Args, R> {
    pub fn add(&mut self, delegate: Delegate<Args, R>) -> DelegateHandle {
        self.registry.add(delegate)
    }

    pub fn add_fn<F, P>(&mut self, function: F, payload: P) -> DelegateHandle
    where
        F: Copy + 'static,
        P: Clone + 'static,
        FreeFunction<F, P>: Callable<Args, R>,
    {
        self.registry.add_fn(function, payload)
    }

    /// # Safety
    ///
    /// See [`MulticastDelegate::add_raw`].
    pub unsafe fn add_raw<T, M, P>(&mut self, receiver: &T, method: M, payload: P) -> DelegateHandle
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethod<T, M, P>: Callable<Args, R>,
    {
        self.registry.add_raw(receiver, method, payload)
    }

    /// # Safety
    ///
    /// See [`MulticastDelegate::add_raw_mut`].
    pub unsafe fn add_raw_mut<T, M, P>(
        &mut self,
        receiver: &mut T,
        method: M,
        payload: P,
    ) -> DelegateHandle
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethodMut<T, M, P>: Callable<Args, R>,
    {
        self.registry.add_raw_mut(receiver, method, payload)
    }

    pub fn add_shared<S, M, P>(&mut self, receiver: S, method: M, payload: P) -> DelegateHandle
    where
        S: SharedReceiver + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        SharedMethod<S, M, P>: Callable<Args, R>,
    {
        self.registry.add_shared(receiver, method, payload)
    }

    pub fn add_lambda<F, P>(&mut self, closure: F, payload: P) -> DelegateHandle
    where
        F: Clone + 'static,
        P: Clone + 'static,
        Closure<F, P>: Callable<Args, R>,
    {
        self.registry.add_lambda(closure, payload)
    }

    pub fn remove_owner(&mut self, owner: OwnerId) -> usize {
        self.registry.remove_owner(owner)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
