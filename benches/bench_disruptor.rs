//! Publish and publish-to-consume latency for the market data bus and the
//! order queue, the way the teacher's own `benches/` measured ring buffer
//! throughput.

use std::sync::Arc;

use criterion::{ black_box, criterion_group, criterion_main, Criterion };
use disruptor_gateway::events::OrderRequest;
use disruptor_gateway::market_data_bus::MarketDataBus;
use disruptor_gateway::order_queue::OrderQueue;

fn bench_market_data_publish(c: &mut Criterion) {
    let bus: MarketDataBus<65536> = MarketDataBus::new(1).unwrap();
    c.bench_function("market_data_bus_publish_ticker", |b| {
        b.iter(|| {
            black_box(bus.publish_ticker(1, 0, 1, 50_000.0, 49_999.0, 50_001.0));
        });
    });
}

fn bench_market_data_publish_then_poll(c: &mut Criterion) {
    let bus: MarketDataBus<65536> = MarketDataBus::new(1).unwrap();
    let consumer = bus.register_consumer().unwrap();
    c.bench_function("market_data_bus_publish_then_poll", |b| {
        b.iter(|| {
            bus.publish_ticker(1, 0, 1, 50_000.0, 49_999.0, 50_001.0);
            let mut seen = 0u64;
            bus.poll(consumer, |event| {
                seen = black_box(event.sequence as u64);
            });
            black_box(seen);
        });
    });
}

fn bench_order_queue_push_pop(c: &mut Criterion) {
    let queue: Arc<OrderQueue<4096>> = Arc::new(OrderQueue::new().unwrap());
    c.bench_function("order_queue_push_pop", |b| {
        b.iter(|| {
            let order = OrderRequest::default();
            queue.try_push(order).ok();
            black_box(queue.try_pop());
        });
    });
}

criterion_group!(
    benches,
    bench_market_data_publish,
    bench_market_data_publish_then_poll,
    bench_order_queue_push_pop
);
criterion_main!(benches);
