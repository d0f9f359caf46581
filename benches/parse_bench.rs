//! Parse engine benchmarks
//!
//! Measures the backtracking engine on nested and ambiguous grammars, with
//! and without in-place collapse of uniquely parsed subphrases, plus grammar
//! optimization and text loading.
//!
//! Run with: cargo bench --bench parse_bench

use asd_parser::asd::builder::{node, GrammarBuilder};
use asd_parser::asd::parallel::{parse_batch, parse_batch_parallel};
use asd_parser::asd::{AsdParser, GrammarStore, ParserConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Test Data
// ============================================================================

mod data {
    use super::*;

    /// Sentences with a determiner, an optional adjective chain and a verb
    pub fn sentences() -> GrammarStore {
        GrammarBuilder::new()
            .node(node("the", "1").initial().to("NOUN", "1").to("ADJ", "1"))
            .node(node("ADJ", "1").to("ADJ", "1").to("NOUN", "1"))
            .node(node("big", "1").initial().ends("ADJ"))
            .node(node("old", "1").initial().ends("ADJ"))
            .node(node("dog", "1").initial().ends("NOUN"))
            .node(node("cat", "1").initial().ends("NOUN"))
            .node(node("NOUN", "1").ends("NP"))
            .node(node("NP", "1").initial().to("barks", "1").to("sees", "1"))
            .node(node("barks", "1").ends("S"))
            .node(node("sees", "1").to("NP", "2"))
            .node(node("NP", "2").ends("S"))
            .build()
    }

    /// Comma-separated list where every item may or may not be the last
    pub fn list() -> GrammarStore {
        GrammarBuilder::new()
            .node(node("x", "1").initial().to(",", "1"))
            .node(node("x", "2").initial().ends("LIST"))
            .node(node(",", "1").to("x", "1").to("x", "2"))
            .build()
    }

    pub fn list_input(items: usize) -> String {
        vec!["x"; items].join(" , ")
    }

    /// Grammar text with `chains` independent chains of `length` words each
    pub fn chain_text(chains: usize, length: usize) -> String {
        let mut text = String::new();
        for c in 0..chains {
            for i in 0..length {
                let word = format!("w{}x{}", c, i);
                if i + 1 == length {
                    text.push_str(&format!("({} ((1 nil T{})))\n", word, c % 7));
                } else {
                    let begins = if i == 0 { "T" } else { "nil" };
                    text.push_str(&format!("({} ((1 {} ((w{}x{} 1)))))\n", word, begins, c, i + 1));
                }
            }
        }
        text
    }

    pub const SHORT: &str = "the dog barks";
    pub const LONG: &str = "the big old dog sees the old big old cat";
}

fn configs() -> [(&'static str, ParserConfig); 2] {
    [
        ("collapse", ParserConfig::default()),
        ("copy", ParserConfig::new().with_save_uniquely_parsed_subphrases(false)),
    ]
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_sentences(c: &mut Criterion) {
    let grammar = data::sentences();
    let mut group = c.benchmark_group("sentences");

    for (name, config) in configs() {
        for (size, input) in [("short", data::SHORT), ("long", data::LONG)] {
            group.bench_with_input(BenchmarkId::new(name, size), input, |b, input| {
                let mut parser =
                    AsdParser::with_config(&grammar, config.clone()).expect("marked grammar");
                b.iter(|| {
                    parser.initialize(black_box(input), &["S"]);
                    black_box(parser.parse())
                })
            });
        }
    }

    group.finish();
}

fn bench_ambiguous_list(c: &mut Criterion) {
    let grammar = data::list();
    let mut group = c.benchmark_group("list");

    for items in [4, 16, 64] {
        let input = data::list_input(items);
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &input, |b, input| {
            let mut parser = AsdParser::new(&grammar).expect("marked grammar");
            b.iter(|| {
                parser.initialize(black_box(input), &["LIST"]);
                black_box(parser.parse())
            })
        });
    }

    group.finish();
}

fn bench_all_parses(c: &mut Criterion) {
    let grammar = data::sentences();
    let mut group = c.benchmark_group("all_parses");

    for (name, config) in configs() {
        group.bench_function(name, |b| {
            let mut parser =
                AsdParser::with_config(&grammar, config.clone()).expect("marked grammar");
            b.iter(|| {
                parser.initialize(data::LONG, &["S", "NP"]);
                let mut found = 0;
                while parser.parse() {
                    found += 1;
                    if !parser.backup() {
                        break;
                    }
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

fn bench_grammar(c: &mut Criterion) {
    let mut group = c.benchmark_group("grammar");
    let text = data::chain_text(50, 8);

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("parse_text", |b| {
        b.iter(|| GrammarStore::parse_text(black_box(&text)).expect("valid grammar"))
    });

    let grammar = GrammarStore::parse_text(&text).expect("valid grammar");
    group.bench_function("optimize", |b| {
        b.iter(|| {
            let mut g = grammar.clone();
            g.optimize();
            black_box(g)
        })
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let grammar = data::sentences();
    let inputs: Vec<&str> = [data::SHORT, data::LONG].repeat(32);
    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(inputs.len() as u64));

    let config = ParserConfig::default();

    group.bench_function("sequential", |b| {
        b.iter(|| parse_batch(&grammar, black_box(&inputs), &["S"], &config))
    });

    group.bench_function("parallel", |b| {
        b.iter(|| parse_batch_parallel(&grammar, black_box(&inputs), &["S"], &config))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sentences,
    bench_ambiguous_list,
    bench_all_parses,
    bench_grammar,
    bench_batch
);
criterion_main!(benches);
