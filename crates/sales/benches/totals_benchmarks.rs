use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use salesdesk_core::RecordId;
use salesdesk_sales::{
    FormConfig, FormSnapshot, LineItem, LineItemCalculator, ManagementForm, RecordingView,
    RenderedRow, compute_totals,
};

fn line_items(n: usize) -> Vec<LineItem> {
    (0..n)
        .map(|i| LineItem {
            quantity: (i % 17) as f64 + 1.0,
            unit_price: (i % 1000) as f64 * 1.37,
            tax_rate_percent: if i % 3 == 0 { 18.0 } else { 0.0 },
            marked_for_deletion: i % 11 == 0,
        })
        .collect()
}

fn snapshot(n: usize) -> FormSnapshot {
    let rows = (0..n)
        .map(|i| RenderedRow {
            id: Some(RecordId::new(i as u64 + 1)),
            quantity: ((i % 17) + 1).to_string(),
            unit_price: format!("{}.{:02}", i % 1000, i % 100),
            tax_rate: "18".to_string(),
            ..RenderedRow::default()
        })
        .collect();
    FormSnapshot {
        management: Some(ManagementForm {
            total_forms: n,
            initial_forms: n,
        }),
        rows,
        discount: "100".to_string(),
        template: Some("<div>items-__prefix__-quantity</div>".to_string()),
    }
}

fn bench_compute_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_totals");
    for n in [10usize, 100, 1_000, 10_000] {
        let items = line_items(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &items, |b, items| {
            b.iter(|| compute_totals(black_box(items), black_box(250.0)))
        });
    }
    group.finish();
}

fn bench_recalculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculator_recalculate");
    for n in [10usize, 100, 1_000] {
        let mut calc =
            LineItemCalculator::init(FormConfig::default(), snapshot(n), RecordingView::new())
                .expect("benchmark form initializes");
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| calc.recalculate().grand_total)
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compute_totals, bench_recalculate);
criterion_main!(benches);
