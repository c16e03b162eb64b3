// Criterion benchmarks for the wire codec and stream reassembler.
//
// Run with:
//   cargo bench -p minirpc-common

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minirpc_common::protocol::{next_request_id, RpcRequest, Value};
use minirpc_common::wire::{self, FrameDecoder, Header, MessageBody};

fn sample_body() -> MessageBody {
    MessageBody::Request(RpcRequest::new(
        "demo.UserService",
        "getUser",
        vec!["string".to_string(), "i64".to_string()],
        vec![Value::Str("mini-rpc".to_string()), Value::I64(42)],
    ))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let body = sample_body();
    for (name, id) in [("jdk", 0u8), ("json", 1), ("kryo", 2), ("hessian", 3)] {
        group.bench_function(name, |b| {
            let header = Header::request(id, next_request_id());
            b.iter(|| wire::encode(black_box(&header), black_box(&body)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let body = sample_body();
    for (name, id) in [("jdk", 0u8), ("json", 1), ("kryo", 2), ("hessian", 3)] {
        let header = Header::request(id, next_request_id());
        let frame = wire::encode(&header, &body).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| wire::decode(black_box(&frame)).unwrap());
        });
    }
    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let header = Header::request(0, next_request_id());
    let frame = wire::encode(&header, &sample_body()).unwrap();
    let mut stream = Vec::new();
    for _ in 0..100 {
        stream.extend_from_slice(&frame);
    }

    group.bench_function("hundred_frames_one_chunk", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            decoder.extend(black_box(&stream));
            let mut count = 0;
            while decoder.next_frame().unwrap().is_some() {
                count += 1;
            }
            assert_eq!(count, 100);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_reassembly);
criterion_main!(benches);
