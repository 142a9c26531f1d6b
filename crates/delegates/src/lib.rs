//! # delegates - type-erased callbacks and events
//!
//! Bind a free function, a method or a closure behind one call signature,
//! with optional pre-bound trailing arguments, and fire it later without
//! knowing what is on the other end.
//!
//! ## Quick Start
//!
//! ```
//! use delegates::{Delegate, MulticastDelegate, OwnerId};
//! use std::rc::Rc;
//!
//! struct Player {
//!     name: String,
//! }
//!
//! impl Player {
//!     fn greet(&self, greeting: &'static str) -> String {
//!         format!("{greeting}, {}", self.name)
//!     }
//! }
//!
//! // Single subscriber with a return value
//! let player = Rc::new(Player { name: "Ada".into() });
//! let mut greet: Delegate<(&'static str,), String> =
//!     Delegate::from_shared(Rc::clone(&player), Player::greet, ());
//! assert_eq!(greet.execute(("Hello",)), "Hello, Ada");
//!
//! // Multicast: subscribers are called in the order they were added
//! let mut on_damage: MulticastDelegate<(u32,)> = MulticastDelegate::new();
//! let handle = on_damage.add_lambda(|amount: u32, scale: u32| {
//!     assert_eq!(amount * scale, 20);
//! }, (2,));
//! on_damage.broadcast((10,));
//! assert!(on_damage.remove(handle));
//! assert_eq!(on_damage.remove_owner(OwnerId::of(&*player)), 0);
//! ```
//!
//! ## Binding kinds
//!
//! | Bind / add      | Target                          | Keeps receiver alive |
//! |-----------------|---------------------------------|----------------------|
//! | `*_fn`          | function item or pointer        | n/a                  |
//! | `*_raw`         | `Fn(&T, ..)` on a `&T`          | no (`unsafe`)        |
//! | `*_raw_mut`     | `Fn(&mut T, ..)` on a `&mut T`  | no (`unsafe`)        |
//! | `*_shared`      | `Fn(&T, ..)` on `Rc<T>`/`Arc<T>`| yes                  |
//! | `*_lambda`      | any `FnMut` closure             | n/a                  |
//!
//! Closure parameters need type annotations (`|a: i32| ..`): the signature
//! is matched through the delegate's argument tuple, not inferred from it.
//!
//! ## Logging
//!
//! Diagnostics go to stderr, filtered by `DELEGATES_LOG_LEVEL`
//! (`off`, `error`, `warn`, `info`, `debug`, `trace`; default `warn`).
//! Set `DELEGATES_LOG_FLUSH=1` to flush after every line.

mod macros;

// Re-export core types
pub use delegates_core::{
    Callable, CallableVTable, Closure, Delegate, DelegateError, DelegateHandle, DelegateResult,
    EventSubscriber, FreeFunction, MulticastDelegate, OwnerId, RawMethod, RawMethodMut,
    SharedMethod, SharedReceiver,
};

// Re-export storage configuration
pub use delegates_core::{InlineStorage, INLINE_ALIGN, INLINE_CAPACITY};

// Re-export klog macros for debug logging
pub use delegates_core::klog::{init as init_logging, set_flush_enabled, set_log_level, LogLevel};
pub use delegates_core::{klog_debug, klog_error, klog_info, klog_trace, klog_warn};

// Re-export env utilities
pub use delegates_core::{env_get, env_get_bool, env_get_opt};

/// Everything needed to declare, bind and fire delegates
pub mod prelude {
    pub use crate::{
        declare_delegate, declare_delegate_ret, declare_event, declare_multicast_delegate,
    };
    pub use crate::{Delegate, DelegateHandle, EventSubscriber, MulticastDelegate, OwnerId};
}
