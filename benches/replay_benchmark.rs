//! Criterion benchmark: full-log replay throughput.

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use tmreplay::Interpreter;

fn fixture() -> String {
    let path = format!(
        "{}/tests/fixtures/four_player_basic.log",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read_to_string(path).expect("fixture log")
}

fn bench_full_replay(c: &mut Criterion) {
    let text = fixture();
    let items = tmreplay::parse_log(&text).expect("parse");

    c.bench_function("parse_log", |b| {
        b.iter(|| tmreplay::parse_log(black_box(&text)).expect("parse"));
    });

    c.bench_function("replay_to_end", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new(black_box(items.clone()));
            interpreter.run_to_end().expect("replay");
            black_box(interpreter.state().final_scores.clone())
        });
    });
}

criterion_group!(benches, bench_full_replay);
criterion_main!(benches);
