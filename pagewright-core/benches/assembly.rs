//! Assembly and export benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use pagewright_core::encoder::{export, ExportFormat};
use pagewright_core::layout::assemble;
use pagewright_core::types::{Book, Chapter};

fn novel() -> Book {
    let paragraph = "The rain kept on, **steady** and *grey*, against the window.\n".repeat(40);
    (0..30).fold(Book::new("Benchmark Novel"), |book, i| {
        book.with_chapter(Chapter::new(format!("Chapter {}", i + 1)).with_content(paragraph.clone()))
    })
}

fn assembly_benchmark(c: &mut Criterion) {
    let book = novel();
    c.bench_function("assemble_30_chapters", |b| {
        b.iter(|| std::hint::black_box(assemble(&book)))
    });

    let doc = assemble(&book);
    for format in [ExportFormat::Html, ExportFormat::Pdf] {
        c.bench_function(&format!("export_{}", format), |b| {
            b.iter(|| std::hint::black_box(export(&doc, format)))
        });
    }
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
