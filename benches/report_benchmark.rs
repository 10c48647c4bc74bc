use criterion::{Criterion, black_box, criterion_group, criterion_main};
use page_grader::report::parse_report;

fn failing_report(failures: usize) -> String {
    let mut report = format!("passes: 10\nfailures: {}\nduration: 1.2s\n", failures);
    for i in 0..failures {
        report.push_str(&format!(
            "should satisfy requirement {} ‣\nAssertionError: expected false to be true\n    at Context.<anonymous>\n",
            i
        ));
    }
    report
}

fn benchmark_parse_report(c: &mut Criterion) {
    let passing = "passes: 12\nfailures: 0\nduration: 0.8s\n";
    let failing = failing_report(50);

    c.bench_function("parse_passing_report", |b| {
        b.iter(|| {
            let outcome = parse_report(black_box("https://student.test/"), black_box(passing));
            assert!(outcome.is_some());
        })
    });

    c.bench_function("parse_failing_report", |b| {
        b.iter(|| {
            let outcome = parse_report(black_box("https://student.test/"), black_box(&failing));
            assert!(outcome.is_some());
        })
    });
}

criterion_group!(benches, benchmark_parse_report);
criterion_main!(benches);
