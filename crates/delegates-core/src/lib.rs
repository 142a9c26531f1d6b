//! # delegates-core
//!
//! Type-erased delegates: single-subscriber bindings and multicast events.
//!
//! A delegate stores one of several binding kinds (free function, method on
//! a borrowed receiver, method on an `Rc`/`Arc` receiver, closure) behind a
//! single call signature, optionally with extra arguments bound up front.
//! Small bindings live inline; larger ones spill to a single heap block.
//!
//! ## Modules
//!
//! - `args` - Tuple plumbing: appending payloads, invoking with tuples
//! - `callable` - The binding variants and the `Callable` contract
//! - `storage` - Inline/heap storage for one erased callable
//! - `delegate` - Single-subscriber `Delegate`
//! - `multicast` - `MulticastDelegate` registry and `EventSubscriber` view
//! - `handle` - Subscription handles and their allocator
//! - `owner` - Receiver identity for owner-based removal
//! - `error` - Error types
//! - `klog` - Level-filtered stderr logging macros
//! - `env` - Environment variable utilities

pub mod args;
pub mod callable;
pub mod delegate;
pub mod env;
pub mod error;
pub mod handle;
pub mod klog;
pub mod multicast;
pub mod owner;
pub mod storage;

// Re-exports for convenience
pub use args::{Append, Invoke, InvokeMethod, InvokeMethodMut, Joined};
pub use callable::{
    Callable, Closure, FreeFunction, RawMethod, RawMethodMut, SharedMethod, SharedReceiver,
};
pub use delegate::{CallableVTable, Delegate};
pub use env::{env_get, env_get_bool, env_get_opt};
pub use error::{DelegateError, DelegateResult};
pub use handle::{issued_handles, DelegateHandle, HandleAllocator};
pub use multicast::{EventSubscriber, MulticastDelegate};
pub use owner::OwnerId;
pub use storage::{InlineStorage, INLINE_ALIGN, INLINE_CAPACITY};
