//! # Example: tic_tac_toe
//!
//! Tic-tac-toe rules expressed as independent b-threads: no thread knows the
//! whole game, yet together they enforce it.
//!
//! Demonstrates how to:
//! - Enforce turn taking with `waitFor` + `block`.
//! - Retire a square after it is taken (one-shot blocking threads).
//! - Detect wins by waiting for three matching moves, then requesting.
//! - Freeze the board after a win by blocking all further moves.
//! - Restrict external injection to `X`/`O` with a [`PublicTrigger`].
//!
//! ## Flow
//! ```text
//! trigger(X{0}) ──► BProgram::run()
//!     ├─► enforce-turns: waitFor X ─► now blocks X, waits O
//!     ├─► square-0-taken: waitFor square 0 ─► now blocks square 0
//!     ├─► X-wins-*: waitFor matching X move (3×) ─► request X-win
//!     └─► feedback: X{0} delivered to handlers
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example tic_tac_toe
//! ```

use behavisor::{b_sync, b_thread, BProgram, Event, Handlers, Idiom, Listener, Repeat, Rules};
use serde_json::json;

const WIN_LINES: [[u64; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

fn square_of(event: &Event) -> Option<u64> {
    event.detail.as_ref().and_then(|d| d["square"].as_u64())
}

/// X and O must alternate, X first.
fn enforce_turns() -> Rules {
    b_thread(
        vec![
            b_sync(Idiom::new().wait_for("X").block("O")),
            b_sync(Idiom::new().wait_for("O").block("X")),
        ],
        Repeat::Forever,
    )
}

/// Once any player takes `square`, every later move on it is vetoed.
fn square_taken(square: u64) -> Rules {
    let on_square = move |ev: &Event| square_of(ev) == Some(square);
    b_thread(
        vec![
            b_sync(Idiom::new().wait_for(Listener::matching(on_square))),
            b_sync(Idiom::new().block(Listener::matching(on_square))),
        ],
        Repeat::No,
    )
}

/// After three `player` moves on `line`, request the win.
fn detect_win(player: &'static str, line: [u64; 3]) -> Rules {
    let on_line = move |ev: &Event| {
        ev.event_type == player && square_of(ev).is_some_and(|s| line.contains(&s))
    };
    let wait = move || b_sync(Idiom::new().wait_for(Listener::matching(on_line)));
    b_thread(
        vec![
            wait(),
            wait(),
            wait(),
            b_sync(
                Idiom::new()
                    .request(Event::new("win").with_detail(json!({ "player": player, "line": line }))),
            ),
        ],
        Repeat::No,
    )
}

/// After a win, no further moves are selectable.
fn stop_game() -> Rules {
    b_thread(
        vec![
            b_sync(Idiom::new().wait_for("win")),
            b_sync(Idiom::new().block("X").block("O")),
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

    // 1. Wire the board threads
    let program = BProgram::new();
    program.register(vec![("enforce-turns", enforce_turns())]);
    program.register((0..9).map(|n| (format!("square-{n}-taken"), square_taken(n))));
    for player in ["X", "O"] {
        program.register(
            WIN_LINES
                .iter()
                .enumerate()
                .map(|(i, line)| (format!("{player}-wins-{i}"), detect_win(player, *line))),
        );
    }
    program.register(vec![("stop-game", stop_game())]);

    // 2. Print every selected move
    let _sub = program.use_feedback(
        Handlers::new()
            .on("X", |detail| println!("[board] X -> {detail}"))
            .on("O", |detail| println!("[board] O -> {detail}"))
            .on("win", |detail| println!("[board] game over: {detail}")),
    );

    // 3. Players only get to inject moves, nothing else
    let moves = program.public_handle(["X", "O"]);
    let play = |player: &str, square: u64| {
        moves
            .trigger(Event::new(player).with_detail(json!({ "square": square })))
            .unwrap_or_else(|err| println!("[board] rejected: {}", err.as_message()));
    };

    // 4. X takes the main diagonal while O plays along the top row
    play("X", 0);
    play("X", 2); // out of turn: silently vetoed
    play("O", 1);
    play("X", 4);
    play("O", 2);
    play("X", 8); // completes 0-4-8: win fires

    // 5. The board is frozen now
    play("O", 3);
    println!("[board] O move after the win selected nothing");

    // 6. And the gateway rejects anything that is not a move
    if let Err(err) = moves.trigger(Event::new("reset")) {
        println!("[board] {}", err.as_message());
    }
}
