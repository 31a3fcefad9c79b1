use std::fmt::Write as _;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use crm_import::{ExistingRecord, config::ImportPolicy, parse};

fn generate_upload(rows: usize) -> String {
    let mut content = String::from("name,company,email,phone,tags\n");
    for i in 0..rows {
        let tags = match i % 3 {
            0 => "vip|newsletter",
            1 => "lead",
            _ => "",
        };
        // Every fifth row repeats an earlier client to exercise in-batch matching.
        let id = if i % 5 == 4 { i - 1 } else { i };
        writeln!(
            content,
            "Client {id},Company {},client{id}@example.com,+1 555 {i:04},{tags}",
            i % 50
        )
        .expect("write row");
    }
    content
}

fn generate_existing(records: usize) -> Vec<ExistingRecord> {
    (0..records)
        .map(|i| {
            let email = format!("client{}@example.com", i * 2);
            ExistingRecord::new(
                format!("c{i}"),
                format!("client {}", i * 2),
                Some(email.as_str()),
            )
        })
        .collect()
}

fn bench_merge_scan(c: &mut Criterion) {
    let content = generate_upload(20_000);
    let existing = generate_existing(50_000);
    let policy = ImportPolicy::default();
    let parsed = parse(&content, "bench.csv").expect("parse upload");

    let mut group = c.benchmark_group("import");

    group.bench_function("parse_20k_rows", |b| {
        b.iter(|| parse(&content, "bench.csv").expect("parse upload"));
    });

    group.bench_function("plan_20k_rows_against_50k", |b| {
        b.iter_batched(
            || (),
            |_| parsed.plan_merge(&existing, &policy).expect("plan merge"),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_merge_scan);
criterion_main!(benches);
