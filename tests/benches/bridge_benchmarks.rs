//! # Nock-Bridge Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Payload jam + cue | < 50µs |
//! | Selection + assembly, 500-note wallet | < 10ms |
//! | Pre-signing validation | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use nb_bridge::domain::{NoteData, NoteHash};
use nb_bridge::{
    assemble, build_metadata, parse_metadata, select_notes, validate_unsigned, AssemblyRequest,
    BridgeConfig, DefaultAddressValidator, EvmAddress, FeeSchedule, Note, SpendCondition,
    SpendableNote, ValidationRules,
};

const OWNER: &str = "4Py91FZ7UqniEDyztahwmEdx7wgfEWn9XuC2GezCbMFzQgAyCMcWRhZ";

fn config() -> BridgeConfig {
    BridgeConfig {
        fee: FeeSchedule {
            fee_per_word: 1,
            ..FeeSchedule::default()
        },
        minimum_amount: 1_000,
        ..BridgeConfig::default()
    }
}

fn wallet(size: usize) -> Vec<SpendableNote> {
    (0..size)
        .map(|i| {
            let mut hash = [0u8; 32];
            hash[..8].copy_from_slice(&(i as u64).to_le_bytes());
            SpendableNote {
                note: Note {
                    hash: NoteHash(hash),
                    assets: 1_000 + (i as u64 * 7_919) % 50_000,
                    note_data: NoteData::empty(),
                },
                spend_condition: SpendCondition::single(OWNER),
            }
        })
        .collect()
}

fn bench_payload_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload-codec");
    let config = config();
    let chain = config.chain_tag().unwrap();
    let address = EvmAddress::from_bytes([0xA5; 20]);
    let payload = build_metadata(&address, chain);

    group.bench_function("build", |b| {
        b.iter(|| black_box(build_metadata(black_box(&address), chain)))
    });
    group.bench_function("parse", |b| {
        b.iter(|| black_box(parse_metadata(black_box(&payload), chain).unwrap()))
    });
    group.finish();
}

fn bench_selection_and_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection-assembly");
    group.measurement_time(Duration::from_secs(5));
    let config = config();
    let request = AssemblyRequest {
        destination: EvmAddress::from_bytes([0x11; 20]),
        amount: 250_000,
        owner: OWNER.to_string(),
    };

    for size in [10usize, 100, 500] {
        let notes = wallet(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("build", size), &notes, |b, notes| {
            b.iter(|| {
                let selection = select_notes(notes.clone(), request.amount, &config.fee).unwrap();
                black_box(assemble(&selection, &request, &config).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let config = config();
    let request = AssemblyRequest {
        destination: EvmAddress::from_bytes([0x22; 20]),
        amount: 250_000,
        owner: OWNER.to_string(),
    };
    let selection = select_notes(wallet(100), request.amount, &config.fee).unwrap();
    let assembly = assemble(&selection, &request, &config).unwrap();
    let rules = ValidationRules::from_config(&config).unwrap();

    c.bench_function("validate-unsigned", |b| {
        b.iter(|| {
            black_box(validate_unsigned(&assembly.tx, &rules, &DefaultAddressValidator).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_payload_codec,
    bench_selection_and_assembly,
    bench_validation
);
criterion_main!(benches);
