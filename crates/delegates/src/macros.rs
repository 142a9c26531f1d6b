//! Declaration macros for delegate and event types
//!
//! The argument list is written as a plain comma-separated type list; the
//! macros build the tuple.

/// Declare a single-subscriber delegate type returning `()`.
///
/// ```
/// delegates::declare_delegate!(pub OnResized, u32, u32);
///
/// let mut on_resized = OnResized::from_lambda(|_w: u32, _h: u32| {}, ());
/// on_resized.execute((640, 480));
/// ```
#[macro_export]
macro_rules! declare_delegate {
    ($vis:vis $name:ident $(, $arg:ty)* $(,)?) => {
        $vis type $name = $crate::Delegate<($($arg,)*), ()>;
    };
}

/// Declare a single-subscriber delegate type with a return value.
///
/// ```
/// delegates::declare_delegate_ret!(Scale, f32, f32);
///
/// let mut scale = Scale::from_lambda(|v: f32, k: f32| v * k, (2.0,));
/// assert_eq!(scale.execute((1.5,)), 3.0);
/// ```
#[macro_export]
macro_rules! declare_delegate_ret {
    ($vis:vis $name:ident, $ret:ty $(, $arg:ty)* $(,)?) => {
        $vis type $name = $crate::Delegate<($($arg,)*), $ret>;
    };
}

/// Declare a multicast delegate type.
#[macro_export]
macro_rules! declare_multicast_delegate {
    ($vis:vis $name:ident $(, $arg:ty)* $(,)?) => {
        $vis type $name = $crate::MulticastDelegate<($($arg,)*)>;
    };
}

/// Declare an event type.
///
/// Anyone holding the event can subscribe through `subscribe()`, which hands
/// out an [`EventSubscriber`](crate::EventSubscriber), and remove their own
/// subscriptions by owner. `broadcast`, `remove` and `remove_all` are private to the
/// module that declares the event, so only its owner can fire or reset it.
/// The argument types must be `Clone`.
///
/// ```
/// mod window {
///     delegates::declare_event!(pub OnClosed, u32);
///
///     #[derive(Default)]
///     pub struct Window {
///         pub on_closed: OnClosed,
///     }
///
///     impl Window {
///         pub fn close(&mut self) {
///             self.on_closed.broadcast((0,));
///         }
///     }
/// }
///
/// let mut win = window::Window::default();
/// win.on_closed.subscribe().add_lambda(|code: u32| assert_eq!(code, 0), ());
/// win.close();
/// ```
#[macro_export]
macro_rules! declare_event {
    ($vis:vis $name:ident $(, $arg:ty)* $(,)?) => {
        #[derive(Clone, Default, Debug)]
        $vis struct $name {
            registry: $crate::MulticastDelegate<($($arg,)*)>,
        }

        #[allow(dead_code)]
        impl $name {
            pub const fn new() -> Self {
                Self {
                    registry: $crate::MulticastDelegate::new(),
                }
            }

            /// Subscribe-only access for outside code
            pub fn subscribe(&mut self) -> $crate::EventSubscriber<'_, ($($arg,)*)> {
                self.registry.subscriber()
            }

            pub fn len(&self) -> usize {
                self.registry.len()
            }

            pub fn is_empty(&self) -> bool {
                self.registry.is_empty()
            }

            pub fn is_bound(&self, handle: $crate::DelegateHandle) -> bool {
                self.registry.is_bound(handle)
            }

            fn broadcast(&mut self, args: ($($arg,)*)) {
                self.registry.broadcast(args)
            }

            fn remove(&mut self, handle: $crate::DelegateHandle) -> bool {
                self.registry.remove(handle)
            }

            fn remove_all(&mut self) {
                self.registry.remove_all()
            }
        }
    };
}
