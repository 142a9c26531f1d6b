//! Delegates walkthrough
//!
//! Binds every kind of callable, fires single-subscriber delegates and a
//! multicast event, and removes subscriptions by handle and by owner.
//!
//! # Environment Variables
//!
//! - `DELEGATES_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `DELEGATES_LOG_FLUSH=1` - Flush log output after every line
//! - `DELEGATES_DEMO_VISITORS=4` - Number of door openings in the events section (default: 2)

use delegates::prelude::*;
use delegates::{env_get, init_logging, klog_info, DelegateError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// DELEGATES_LOG_LEVEL=trace cargo run -p delegates-demo

declare_delegate_ret!(Transform, f32, f32);
declare_multicast_delegate!(OnHealthChanged, i32);

mod door {
    use delegates::declare_event;

    declare_event!(pub OnOpened, &'static str);

    #[derive(Default)]
    pub struct Door {
        pub on_opened: OnOpened,
    }

    impl Door {
        pub fn open(&mut self, who: &'static str) {
            self.on_opened.broadcast((who,));
        }

        pub fn demolish(&mut self) {
            self.on_opened.remove_all();
        }
    }
}

struct Gauge {
    readings: Cell<u32>,
}

impl Gauge {
    fn scale(&self, value: f32) -> f32 {
        self.readings.set(self.readings.get() + 1);
        value * 2.0
    }

    fn report(&self, health: i32) {
        self.readings.set(self.readings.get() + 1);
        println!("  gauge sees health {}", health);
    }
}

struct Tally {
    total: i32,
}

impl Tally {
    fn add(&mut self, health: i32) {
        self.total += health;
    }
}

fn halve(value: f32) -> f32 {
    value / 2.0
}

fn main() {
    println!("=== Delegates Demo ===\n");

    // Reads DELEGATES_LOG_LEVEL / DELEGATES_LOG_FLUSH. Or programmatically:
    // delegates::set_log_level(delegates::LogLevel::Debug);
    init_logging();

    single_subscriber();
    multicast();
    events();

    println!("\n=== Demo Complete ===");
}

fn single_subscriber() {
    println!("-- single subscriber --");

    let mut transform = Transform::from_fn(halve, ());
    println!("free fn:      {}", transform.execute((10.0,)));

    let gauge = Rc::new(Gauge {
        readings: Cell::new(0),
    });
    transform.bind_shared(Rc::clone(&gauge), Gauge::scale, ());
    println!(
        "shared:       {} (owner {:?})",
        transform.execute((10.0,)),
        transform.owner()
    );

    let offset = 1.5;
    transform.bind_lambda(move |v: f32, k: f32| v * k + offset, (3.0,));
    println!("lambda+bound: {}", transform.execute((10.0,)));

    let big = [0.25f32; 64];
    transform.bind_lambda(move |v: f32| v * big[63], ());
    println!(
        "large lambda: {} ({} bytes, heap: {})",
        transform.execute((10.0,)),
        transform.size(),
        transform.is_heap()
    );

    let mut copy = transform.clone();
    let moved = transform.take();
    println!(
        "after take:   source bound {}, moved bound {}, copy -> {}",
        transform.is_bound(),
        moved.is_bound(),
        copy.execute((4.0,))
    );

    match transform.try_execute((1.0,)) {
        Err(DelegateError::NotBound) => println!("try_execute:  {}", DelegateError::NotBound),
        other => println!("try_execute:  unexpected {:?}", other),
    }
    println!("if bound:     {:?}", transform.execute_if_bound((1.0,)));

    {
        let scoped = Gauge {
            readings: Cell::new(0),
        };
        // SAFETY: `scoped` outlives the delegate, which is dropped first.
        let mut raw = unsafe { Transform::from_raw(&scoped, Gauge::scale, ()) };
        println!("raw:          {}", raw.execute((7.0,)));
        raw.clear_if_bound_to(OwnerId::of(&scoped));
        println!("raw cleared:  {}", !raw.is_bound());
    }

    println!("gauge readings: {}", gauge.readings.get());
}

fn multicast() {
    println!("\n-- multicast --");

    let gauge = Rc::new(Gauge {
        readings: Cell::new(0),
    });
    let mut tally = Tally { total: 0 };
    let history = Rc::new(RefCell::new(Vec::new()));

    {
        let mut on_health: OnHealthChanged = MulticastDelegate::new();

        let recorder = Rc::clone(&history);
        let logger = on_health.add_lambda(move |h: i32| recorder.borrow_mut().push(h), ());
        on_health.add_shared(Rc::clone(&gauge), Gauge::report, ());
        // SAFETY: `tally` outlives `on_health`, which is dropped at the end of this block.
        unsafe { on_health.add_raw_mut(&mut tally, Tally::add, ()) };
        on_health.add_fn(|h: i32, tag: char| println!("  {} {}", tag, h), ('*',));
        klog_info!("demo", "{} subscriptions", on_health.size());

        on_health.broadcast((90,));

        let removed = on_health.remove_owner(OwnerId::of(&*gauge));
        println!("removed {} gauge subscription(s)", removed);
        println!("remove logger: {}", on_health.remove(logger));
        println!("remove logger again: {}", on_health.remove(logger));

        on_health.broadcast((75,));
        println!("{} subscription(s) left", on_health.size());
    }

    println!(
        "history {:?}, tally {}, gauge readings {}",
        history.borrow(),
        tally.total,
        gauge.readings.get()
    );
}

fn events() {
    println!("\n-- events --");

    let mut door = door::Door::default();
    let visits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&visits);

    let handle = door.on_opened.subscribe().add_lambda(
        move |who: &'static str| {
            counter.set(counter.get() + 1);
            println!("  door opened by {}", who);
        },
        (),
    );

    const VISITORS: [&str; 4] = ["alice", "bob", "carol", "dave"];
    let openings: usize = env_get("DELEGATES_DEMO_VISITORS", 2);
    for &who in VISITORS.iter().cycle().take(openings) {
        door.open(who);
    }
    println!(
        "visits {}, subscribed {}",
        visits.get(),
        door.on_opened.is_bound(handle)
    );

    door.demolish();
    println!("after demolish: {} subscriber(s)", door.on_opened.len());
}
