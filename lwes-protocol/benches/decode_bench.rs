#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use lwes_protocol::Decoder;

// "UserLogin" with a string, an ip_addr, a uint16, an int64 and a boolean.
const LOGIN_EVENT: &[u8] = &[
    0x09, b'U', b's', b'e', b'r', b'L', b'o', b'g', b'i', b'n', // name
    0x00, 0x05, // attribute count
    0x04, b'u', b's', b'e', b'r', 0x05, 0x00, 0x05, b'a', b'l', b'i', b'c', b'e', // string
    0x02, b'i', b'p', 0x06, 0x01, 0x00, 0x00, 0x0A, // ip_addr 10.0.0.1
    0x04, b'p', b'o', b'r', b't', 0x01, 0x1F, 0x90, // uint16 8080
    0x02, b't', b's', 0x07, 0x00, 0x00, 0x01, 0x8B, 0xCF, 0xE5, 0x68, 0x00, // int64
    0x02, b'o', b'k', 0x09, 0x01, // boolean
];

fn benchmark_lenient_decoding(c: &mut Criterion) {
    let decoder = Decoder::new();
    c.bench_function("lenient_decoding", |b| {
        b.iter(|| {
            black_box(decoder.decode(black_box(LOGIN_EVENT))).unwrap();
        })
    });
}

fn benchmark_strict_decoding(c: &mut Criterion) {
    let decoder = Decoder::strict();
    c.bench_function("strict_decoding", |b| {
        b.iter(|| {
            black_box(decoder.decode(black_box(LOGIN_EVENT))).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_lenient_decoding, benchmark_strict_decoding);
criterion_main!(benches);
