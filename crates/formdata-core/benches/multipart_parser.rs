use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use formdata_core::{MultipartConfig, MultipartParser};

const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

fn build_body(fields: usize, files: usize, file_size: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"field{i}\"\r\n\r\nvalue{i}\r\n")
                .as_bytes(),
        );
    }
    for i in 0..files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"f{i}.bin\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(std::iter::repeat_n(b'x', file_size));
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn bench_small_forms(c: &mut Criterion) {
    let parser = MultipartParser::new(BOUNDARY, MultipartConfig::default());
    let mut group = c.benchmark_group("small_form");

    for fields in [1usize, 10, 50] {
        let body = build_body(fields, 0, 0);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &body, |b, body| {
            b.iter(|| parser.parse(black_box(body)).unwrap());
        });
    }
    group.finish();
}

fn bench_file_uploads(c: &mut Criterion) {
    let parser = MultipartParser::new(BOUNDARY, MultipartConfig::default());
    let mut group = c.benchmark_group("file_upload");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let body = build_body(2, 2, size);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| parser.parse(black_box(body)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_small_forms, bench_file_uploads);
criterion_main!(benches);
