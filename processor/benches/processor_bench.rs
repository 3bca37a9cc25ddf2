use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use zonemap_nullables::{NullClock, NullGateway};
use zonemap_processor::{BlockProcessor, JsonTxDecoder, StatsAccumulator, TxBody, TxDecoder};
use zonemap_types::{Block, ChainId, ChannelId, Coin, Message, RawTx, Timestamp};

fn transfer_tx(i: usize) -> RawTx {
    let sender = format!("cosmos1sender{i}");
    let message = Message::Transfer {
        source_channel: ChannelId::new(format!("channel-{}", i % 8)),
        sender: sender.clone(),
        receiver: "osmo1receiver".to_string(),
        token: Coin {
            denom: "uatom".to_string(),
            amount: "1000".to_string(),
        },
    };
    RawTx {
        hash: format!("{i:064x}"),
        result_code: 0,
        data: TxBody::new(Some(&sender), vec![message]).to_bytes().unwrap(),
    }
}

fn make_block(height: u64, tx_count: usize) -> Block {
    Block {
        chain_id: ChainId::new("cosmoshub-4"),
        height,
        time: Timestamp::new(1_619_879_832 + height * 6),
        txs: (0..tx_count).map(transfer_tx).collect(),
    }
}

fn seeded_gateway() -> Arc<NullGateway> {
    let gateway = Arc::new(NullGateway::new());
    let origin = ChainId::new("cosmoshub-4");
    for n in 0..8 {
        gateway.seed_channel_path(
            &origin,
            &ChannelId::new(format!("channel-{n}")),
            &ChainId::new(format!("zone-{n}")),
        );
    }
    gateway
}

fn bench_decode_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_block");

    for tx_count in [1, 10, 100, 1000] {
        let block = make_block(1, tx_count);
        group.bench_with_input(BenchmarkId::new("json", tx_count), &tx_count, |b, _| {
            b.iter(|| black_box(JsonTxDecoder.decode_block(black_box(&block)).unwrap()));
        });
    }

    group.finish();
}

fn bench_handle_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_block");

    for tx_count in [0, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("transfers", tx_count),
            &tx_count,
            |b, &tx_count| {
                let gateway = seeded_gateway();
                let mut processor = BlockProcessor::new(Arc::clone(&gateway), JsonTxDecoder)
                    .with_clock(Arc::new(NullClock::new(0)));
                let mut height = 0u64;
                b.iter_batched(
                    || {
                        height += 1;
                        make_block(height, tx_count)
                    },
                    |block| black_box(processor.handle_block(&block).unwrap()),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_take_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("take_batch");
    let origin = ChainId::new("cosmoshub-4");

    for pairs in [1, 10, 100] {
        let counterparties: Vec<ChainId> = (0..pairs)
            .map(|n| ChainId::new(format!("zone-{n}")))
            .collect();
        group.bench_with_input(BenchmarkId::new("ibc_pairs", pairs), &pairs, |b, _| {
            let mut acc = StatsAccumulator::new();
            b.iter(|| {
                acc.reset(origin.clone());
                acc.add_zone();
                acc.mark_block(Timestamp::new(0));
                for counterparty in &counterparties {
                    acc.add_ibc_transfer(&origin, counterparty, Timestamp::new(1_619_879_832));
                }
                black_box(acc.take_batch())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode_block, bench_handle_block, bench_take_batch);
criterion_main!(benches);
