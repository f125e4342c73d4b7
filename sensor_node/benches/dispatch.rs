use criterion::{criterion_group, criterion_main, Criterion};
use sensor_node::sensors::thermal::celsius_from_raw;
use sensor_protocol::{sample_line, PendingCommand};
use std::hint::black_box;

// Every console line goes through the tokenizer before touching a channel
fn bench_command_parse(c: &mut Criterion) {
    let lines = ["tm", "am 1", "am 0", "info", "", "tm 7", "bogus verb here"];

    c.bench_function("parse_mixed_console_lines", |b| {
        b.iter(|| {
            for line in lines {
                let _ = black_box(PendingCommand::parse(black_box(line)));
            }
        });
    });
}

// Per-cycle cost of one thermistor sample: conversion plus the output line
fn bench_sample_cycle(c: &mut Criterion) {
    c.bench_function("thermistor_convert_and_format", |b| {
        let mut raw: u16 = 1;
        b.iter(|| {
            raw = raw % 4094 + 1;
            if let Ok(v) = celsius_from_raw(black_box(raw)) {
                black_box(sample_line("temperature", v, 2));
            }
        });
    });
}

criterion_group!(benches, bench_command_parse, bench_sample_cycle);
criterion_main!(benches);
