//! # Example: water_control
//!
//! The classic hot/cold water scenario: two threads each pour three doses,
//! and an interleaving thread forces them to strictly alternate — without
//! either pourer knowing the other exists.
//!
//! Demonstrates how to:
//! - Shape a global ordering with `block` alone.
//! - Watch each super-step through the snapshot channel.
//! - Bridge external state into the program with a [`Signal`].
//!
//! ## Flow
//! ```text
//! trigger(start) ──► BProgram::run()
//!     ├─► add-hot requests hot, add-cold requests cold
//!     ├─► interleave: block cold until hot, then block hot until cold, ...
//!     └─► selected: hot, cold, hot, cold, hot, cold
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example water_control
//! ```

use behavisor::{
    b_sync, b_thread, BProgram, Event, EventTemplate, Handlers, Idiom, Listener, Repeat, Rules,
    Signal,
};
use serde_json::json;

fn pour_three(event_type: &'static str) -> Rules {
    b_thread(
        vec![
            b_sync(Idiom::new().request(Event::new(event_type))),
            b_sync(Idiom::new().request(Event::new(event_type))),
            b_sync(Idiom::new().request(Event::new(event_type))),
        ],
        Repeat::No,
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 1. Two independent pourers plus the interleaving constraint
    let program = BProgram::new();
    program.register(vec![
        ("add-hot", pour_three("hot")),
        ("add-cold", pour_three("cold")),
        (
            "interleave",
            b_thread(
                vec![
                    b_sync(Idiom::new().wait_for("hot").block("cold")),
                    b_sync(Idiom::new().wait_for("cold").block("hot")),
                ],
                Repeat::Forever,
            ),
        ),
    ]);

    // 2. Observe each step before it is delivered
    let _snap = program.use_snapshot(|report| {
        for entry in report {
            let mark = if entry.selected { ">" } else { " " };
            let veto = entry
                .blocked_by
                .as_deref()
                .map(|t| format!("  (blocked by {t})"))
                .unwrap_or_default();
            println!(
                "[snapshot] {mark} p{} {} requests {}{veto}",
                entry.priority, entry.thread, entry.event_type
            );
        }
    });

    let _sub = program.use_feedback(
        Handlers::new()
            .on("hot", |_| println!("[valve] hot water"))
            .on("cold", |_| println!("[valve] cold water"))
            .on("overheat", |detail| println!("[valve] OVERHEAT at {detail}")),
    );

    // 3. One nudge drives the whole cascade to quiescence
    program.trigger(Event::new("start"));

    // 4. External temperature readings enter the program as events
    let temperature = Signal::new(20u32);
    let _wire = temperature.listen("temperature", &program.handle(), false);
    program.register(vec![(
        "overheat-guard",
        b_thread(
            vec![
                b_sync(Idiom::new().wait_for(Listener::matching(|ev| {
                    ev.event_type == "temperature"
                        && ev
                            .detail
                            .as_ref()
                            .is_some_and(|d| d.as_u64().is_some_and(|t| t > 90))
                }))),
                b_sync(Idiom::new().request(EventTemplate::new({
                    let temperature = temperature.clone();
                    move || Event::new("overheat").with_detail(json!(temperature.get()))
                }))),
            ],
            Repeat::No,
        ),
    )]);

    temperature.set(60); // below threshold: guard stays parked
    temperature.set(95); // guard wakes and raises the alarm
}
