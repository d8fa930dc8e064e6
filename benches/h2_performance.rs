//! HTTP/2 connection core benchmarks
//!
//! Measures the hot paths of the connection core:
//! - Frame encoding/decoding
//! - HPACK header compression/decompression
//! - Flow control window accounting
//! - Connection dispatch of a full request/response exchange
//!
//! Run with: cargo bench --bench h2_performance

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2core::codec::{FrameCodec, FRAME_HEADER_SIZE};
use h2core::frames::{DataFrame, Frame, FrameFlags, FrameType, HeadersFrame, SettingsFrame};
use h2core::settings::{Settings, SettingsBuilder};
use h2core::{FlowControlWindow, H2Connection, Header, HpackContext, MemoryDuplex};
use std::time::Duration;

fn request_headers() -> Vec<Header> {
    vec![
        (Bytes::from_static(b":method"), Bytes::from_static(b"GET")),
        (Bytes::from_static(b":path"), Bytes::from_static(b"/index.html")),
        (Bytes::from_static(b":scheme"), Bytes::from_static(b"https")),
        (Bytes::from_static(b":authority"), Bytes::from_static(b"bench.test")),
        (Bytes::from_static(b"accept"), Bytes::from_static(b"*/*")),
        (Bytes::from_static(b"user-agent"), Bytes::from_static(b"h2core-bench/0.1")),
    ]
}

// ========== Frame Encoding/Decoding ==========

fn bench_frame_header_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_header");

    group.bench_function("encode", |b| {
        b.iter(|| {
            let header = FrameCodec::encode_header(
                black_box(FrameType::Data.as_u8()),
                black_box(FrameFlags::from_u8(0x01)),
                black_box(1),
                black_box(1024),
            );
            black_box(header);
        });
    });

    group.bench_function("decode", |b| {
        let header =
            FrameCodec::encode_header(FrameType::Headers.as_u8(), FrameFlags::from_u8(0x05), 3, 512);
        b.iter(|| {
            let parsed = FrameCodec::decode_header(black_box(&header));
            black_box(parsed);
        });
    });

    group.finish();
}

fn bench_data_frame_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_frame_encode");

    for size in [64usize, 1024, 16_384] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let frame = DataFrame::new(1, Bytes::from(vec![0xAB; size]), true);
            b.iter(|| {
                let encoded = FrameCodec::encode_data_frame(black_box(&frame));
                black_box(encoded);
            });
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    let encoded = FrameCodec::encode(&Frame::Data(DataFrame::new(
        1,
        Bytes::from(vec![0xCD; 16_384]),
        false,
    )));
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("data_16k", |b| {
        b.iter(|| {
            let mut header = [0u8; FRAME_HEADER_SIZE];
            header.copy_from_slice(&encoded[..FRAME_HEADER_SIZE]);
            let (ty, flags, stream_id, _) = FrameCodec::decode_header(&header);
            let frame =
                FrameCodec::decode(ty, flags, stream_id, encoded.slice(FRAME_HEADER_SIZE..))
                    .unwrap();
            black_box(frame);
        });
    });

    let settings = SettingsBuilder::new()
        .header_table_size(8192)
        .initial_window_size(1_048_576)
        .max_frame_size(65536)
        .build()
        .unwrap();
    let encoded = FrameCodec::encode(&Frame::Settings(SettingsFrame::new(settings)));
    group.bench_function("settings", |b| {
        b.iter(|| {
            let mut header = [0u8; FRAME_HEADER_SIZE];
            header.copy_from_slice(&encoded[..FRAME_HEADER_SIZE]);
            let (ty, flags, stream_id, _) = FrameCodec::decode_header(&header);
            let frame =
                FrameCodec::decode(ty, flags, stream_id, encoded.slice(FRAME_HEADER_SIZE..))
                    .unwrap();
            black_box(frame);
        });
    });

    group.finish();
}

// ========== HPACK ==========

fn bench_hpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("hpack");
    let headers = request_headers();

    group.bench_function("encode", |b| {
        let mut ctx = HpackContext::new();
        b.iter(|| {
            let block = ctx.encode(black_box(&headers)).unwrap();
            black_box(block);
        });
    });

    group.bench_function("decode", |b| {
        let mut encoder = HpackContext::new();
        let block = encoder.encode(&headers).unwrap();
        let mut decoder = HpackContext::new();
        b.iter(|| {
            let decoded = decoder.decode(black_box(&block)).unwrap();
            black_box(decoded);
        });
    });

    group.finish();
}

// ========== Flow control ==========

fn bench_flow_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("flow_control");

    group.bench_function("consume_increase_cycle", |b| {
        let mut window = FlowControlWindow::with_initial_size(65_535);
        b.iter(|| {
            window.consume(black_box(1024)).unwrap();
            window.increase(black_box(1024)).unwrap();
            black_box(window.size());
        });
    });

    group.finish();
}

// ========== Connection dispatch ==========

fn operational_pair() -> (H2Connection<MemoryDuplex>, HpackContext) {
    let mut conn = H2Connection::client(MemoryDuplex::new()).unwrap();
    let settings = FrameCodec::encode(&Frame::Settings(SettingsFrame::new(Settings::new())));
    conn.duplex_mut().push_inbound(&settings);
    conn.process_next_frame().unwrap();
    conn.duplex_mut().take_outbound();
    (conn, HpackContext::new())
}

fn bench_request_response_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection");
    group.sample_size(500);

    group.bench_function("request_response", |b| {
        b.iter_batched(
            operational_pair,
            |(mut conn, mut peer_hpack)| {
                let id = conn.open_stream(&request_headers(), false).unwrap();
                conn.send_data(id, Bytes::from_static(b"hello"), true).unwrap();

                let block = peer_hpack
                    .encode(&[(Bytes::from_static(b":status"), Bytes::from_static(b"200"))])
                    .unwrap();
                let headers =
                    FrameCodec::encode(&Frame::Headers(HeadersFrame::new(id, block, false, true)));
                let data = FrameCodec::encode(&Frame::Data(DataFrame::new(
                    id,
                    Bytes::from_static(b"world"),
                    true,
                )));
                conn.duplex_mut().push_inbound(&headers);
                conn.duplex_mut().push_inbound(&data);
                conn.process_next_frame().unwrap();
                conn.process_next_frame().unwrap();

                while conn.next_message(id).is_some() {}
                black_box(conn);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ========== Benchmark Groups ==========

criterion_group! {
    name = frame_codec;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(1000);
    targets =
        bench_frame_header_roundtrip,
        bench_data_frame_sizes,
        bench_frame_decode
}

criterion_group! {
    name = hpack_benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(1000);
    targets = bench_hpack
}

criterion_group! {
    name = flow_control_benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(1000);
    targets = bench_flow_control
}

criterion_group! {
    name = connection_benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10));
    targets = bench_request_response_dispatch
}

criterion_main!(
    frame_codec,
    hpack_benches,
    flow_control_benches,
    connection_benches
);
