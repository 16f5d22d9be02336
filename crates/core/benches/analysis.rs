use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serplens_core::{
    AnnotationStatus, ComparisonConfig, Document, KeywordExtractor, KeywordHit, PageAnalysisRecord, YakeExtractor,
    aggregate, compare,
};

fn fixture_text(name: &str) -> String {
    let html = std::fs::read_to_string(format!("../../tests/fixtures/serp/{}", name)).unwrap();
    Document::parse(&html).unwrap().main_text()
}

fn synthetic_records(pages: usize, keywords: usize) -> Vec<PageAnalysisRecord> {
    (0..pages)
        .map(|p| PageAnalysisRecord {
            url: format!("https://page{}.test", p),
            extracted_text: String::new(),
            word_count: 1000,
            keywords: (0..keywords)
                .map(|k| KeywordHit {
                    keyword: format!("keyword {}", (k * 7 + p) % (keywords * 2)),
                    score: 0.01 * ((k + p) % 50 + 1) as f64,
                    occurrences: (k + p) % 9 + 1,
                    density_per_1000_words: 1.0,
                })
                .collect(),
            topics: vec![],
            entities: vec![],
            annotation: AnnotationStatus::Skipped,
        })
        .collect()
}

fn bench_keyword_extraction(c: &mut Criterion) {
    let short = fixture_text("mine.html");
    let long = ["acme.html", "widgetworld.html", "gizmo.html"].map(fixture_text).join("\n").repeat(8);
    let extractor = YakeExtractor::default();

    let mut group = c.benchmark_group("keyword_extraction");

    group.bench_with_input(BenchmarkId::new("short", short.len()), &short, |b, text| {
        b.iter(|| extractor.extract(black_box(text), "en", 20))
    });

    group.bench_with_input(BenchmarkId::new("long", long.len()), &long, |b, text| {
        b.iter(|| extractor.extract(black_box(text), "en", 20))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for pages in [10, 30] {
        let records = synthetic_records(pages, 20);
        group.bench_with_input(BenchmarkId::from_parameter(pages), &records, |b, records| {
            b.iter(|| aggregate(black_box(records)))
        });
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let records = synthetic_records(10, 20);
    let corpus = aggregate(&records);
    let config = ComparisonConfig::default();

    c.bench_function("compare", |b| b.iter(|| compare(black_box(&records[0]), black_box(&corpus), &config)));
}

criterion_group!(benches, bench_keyword_extraction, bench_aggregate, bench_compare);
criterion_main!(benches);
