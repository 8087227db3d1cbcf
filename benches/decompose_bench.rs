use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use stegsift::carve::carve_values;
use stegsift::decompose::{decompose, decompose_parallel};
use stegsift::stream::{repair_bytes, PNG_SIGNATURE};
use stegsift::{chunk::chunk_crc, ChunkType};

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
}

fn bench_decompose(c: &mut Criterion) {
    let img = gradient(512, 512);

    c.bench_function("decompose_512x512", |b| b.iter(|| decompose(black_box(&img))));
    c.bench_function("decompose_parallel_512x512", |b| {
        b.iter(|| decompose_parallel(black_box(&img)))
    });
}

fn bench_carve(c: &mut Criterion) {
    let values: Vec<u8> = (0..64 * 1024).map(|i| (i * 7) as u8).collect();

    c.bench_function("carve_lsb1_64k_values", |b| b.iter(|| carve_values(black_box(&values), 1)));
    c.bench_function("carve_lsb2_64k_values", |b| b.iter(|| carve_values(black_box(&values), 2)));
}

fn bench_repair(c: &mut Criterion) {
    let mut bytes = PNG_SIGNATURE.to_vec();
    let data = vec![42u8; 64 * 1024];
    for _ in 0..16 {
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(b"IDAT");
        bytes.extend_from_slice(&data);
        bytes.extend_from_slice(&chunk_crc(ChunkType::IDAT, &data).to_be_bytes());
    }

    c.bench_function("repair_1mb_stream", |b| b.iter(|| repair_bytes(black_box(&bytes))));
}

criterion_group!(benches, bench_decompose, bench_carve, bench_repair);
criterion_main!(benches);
