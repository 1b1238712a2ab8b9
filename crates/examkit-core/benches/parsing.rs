use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examkit_core::parser::parse_exam_str;
use examkit_core::slots::{build_slots, build_steps};

fn full_exam_json() -> String {
    let part = |prefix: &str, first: u32| {
        let questions: Vec<String> = (first..first + 13)
            .map(|q| format!(r#"{{"qNumber": {q}, "correctAnswers": ["answer{q}"]}}"#))
            .collect();
        format!(
            r#"{{"id": "{prefix}{first}", "title": "Part", "questionGroups": [{{"type": "note-completion", "questions": [{}]}}]}}"#,
            questions.join(",")
        )
    };
    let reading: Vec<String> = [1, 14, 27].iter().map(|&q| part("p", q)).collect();
    let listening: Vec<String> = [1, 14, 27].iter().map(|&q| part("s", q)).collect();
    format!(
        r#"{{"title": "Full exam", "durationMinutes": 160, "reading": [{}], "listening": [{}], "writing": [{{"id": "w1", "prompt": "Describe the chart."}}]}}"#,
        reading.join(","),
        listening.join(",")
    )
}

fn bench_parse(c: &mut Criterion) {
    let json = full_exam_json();
    let path = Path::new("bench.json");

    c.bench_function("parse_full_exam", |b| {
        b.iter(|| parse_exam_str(black_box(&json), path))
    });
}

fn bench_flatten(c: &mut Criterion) {
    let doc = parse_exam_str(&full_exam_json(), Path::new("bench.json")).unwrap();
    let mut group = c.benchmark_group("flatten");

    group.bench_function("build_slots", |b| b.iter(|| build_slots(black_box(&doc))));
    group.bench_function("build_steps", |b| b.iter(|| build_steps(black_box(&doc))));

    group.finish();
}

criterion_group!(benches, bench_parse, bench_flatten);
criterion_main!(benches);
