#![allow(clippy::expect_used, reason = "fine in a benchmark")]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nes6502_core::prelude::*;
use std::time::Duration;

// Nested countdown loops touching zero page, absolute,X and indirect,Y operands
//
// $8000: LDY #$00
// $8002: LDX #$FF
// $8004: LDA ($10),Y; ADC $0200,X; STA $20; DEX; BNE $8004
// $800E: INY; JMP $8002
#[rustfmt::skip]
const PROGRAM: [u8; 18] = [
    0xA0, 0x00,
    0xA2, 0xFF,
    0xB1, 0x10, 0x7D, 0x00, 0x02, 0x85, 0x20, 0xCA, 0xD0, 0xF6,
    0xC8, 0x4C, 0x02, 0x80,
];

fn deck() -> ControlDeck {
    let mut prg_rom = vec![0x00; Nrom::PRG_ROM_BANK_SIZE];
    prg_rom[..PROGRAM.len()].copy_from_slice(&PROGRAM);
    prg_rom[0x3FFC..0x3FFE].copy_from_slice(&[0x00, 0x80]);
    let mut deck = ControlDeck::new();
    deck.insert_cartridge(Nrom::load(prg_rom).expect("valid prg-rom"));
    deck
}

fn clock_frames(deck: &mut ControlDeck, frames: u32) {
    deck.power_on();
    while deck.frame_number() < frames {
        deck.clock_frame().expect("valid frame clock");
    }
}

fn benchmark_clock_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("nes6502");
    let frames = 60;
    let mut deck = deck();
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("clock_frame", |b| {
        b.iter(|| clock_frames(&mut deck, black_box(frames)))
    });
    group.finish();
}

criterion_group!(benches, benchmark_clock_frame);
criterion_main!(benches);
