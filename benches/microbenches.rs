//! Criterion microbenches for facelabel parsing, writing and scoring.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use facelabel::difference::{score_lists, ScoreOptions};
use facelabel::model::io_lst::{from_lst_str, to_lst_string};
use facelabel::model::AnnotationTree;

const LINE: &str = "f{[120,80;90,110]\tc[light]\tg[female]\ty[adult]\td[Subject 4]\tr[0.0,5.5,-12.0]\t\
i[15,30;60,20]\tn[35,50;20,25]\tm[25,80;40,18]}\tp[300,60;70,90]\t\
a{[20,200;260,180]\tk[dog]\tb[beagle]\th{[0,0;90,80]\ti[20,20;50,20]}\tt[220,40;40,60]}";

fn list_fixture(images: usize) -> String {
    (0..images)
        .map(|i| format!("img_{i:04}.jpg\t{LINE}\n"))
        .collect()
}

/// Benchmark parsing one dense annotation line.
fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("grammar");
    group.throughput(Throughput::Bytes(LINE.len() as u64));

    group.bench_function("parse_line", |b| {
        b.iter(|| {
            let tree = AnnotationTree::parse_line(black_box(LINE)).unwrap();
            black_box(tree)
        })
    });

    // Parse once (outside the timed region)
    let tree = AnnotationTree::parse_line(LINE).expect("Failed to parse fixture line");
    group.bench_function("to_grammar", |b| b.iter(|| black_box(black_box(&tree).to_string())));

    group.finish();
}

/// Benchmark reading and writing a whole list file.
fn bench_list_io(c: &mut Criterion) {
    let text = list_fixture(200);
    let mut group = c.benchmark_group("lst");
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("from_lst_str", |b| {
        b.iter(|| {
            let list = from_lst_str(black_box(&text)).unwrap();
            black_box(list)
        })
    });

    let list = from_lst_str(&text).expect("Failed to parse list fixture");
    group.bench_function("to_lst_string", |b| {
        b.iter(|| black_box(to_lst_string(black_box(&list))))
    });

    group.finish();
}

/// Benchmark scoring a list against itself.
fn bench_score(c: &mut Criterion) {
    let list = from_lst_str(&list_fixture(200)).expect("Failed to parse list fixture");
    let candidates = vec![("self".to_string(), &list)];
    let opts = ScoreOptions::default();

    let mut group = c.benchmark_group("score");
    group.throughput(Throughput::Elements(list.entries.len() as u64));
    group.bench_function("score_lists", |b| {
        b.iter(|| black_box(score_lists(black_box(&list), &candidates, &opts)))
    });
    group.finish();
}

criterion_group!(benches, bench_parse_line, bench_list_io, bench_score);
criterion_main!(benches);
