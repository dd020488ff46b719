//! Generative property tests for ordering and MPSC fairness, using randomized
//! batch sizes and producer counts rather than fixed scenarios.

use std::sync::Arc;
use std::thread;

use disruptor_gateway::market_data_bus::MarketDataBus;
use disruptor_gateway::order_queue::OrderQueue;
use disruptor_gateway::events::OrderRequest;
use proptest::prelude::*;

proptest! {
    /// Property 1: for any sequence of publish batch sizes, a single
    /// consumer observes strictly increasing sequence numbers, with no
    /// repeats and no regressions.
    #[test]
    fn prop_market_data_ordering_holds_for_arbitrary_batches(
        batch_sizes in prop::collection::vec(1usize..50, 1..20)
    ) {
        let bus: MarketDataBus<4096> = MarketDataBus::new(1).unwrap();
        let consumer = bus.register_consumer().unwrap();

        let mut published = 0i64;
        let mut observed = Vec::new();
        for batch in batch_sizes {
            for _ in 0..batch {
                bus.publish_ticker(published, 0, 1, published as f64, published as f64, published as f64);
                published += 1;
            }
            bus.poll(consumer, |ev| observed.push(ev.sequence as i64));
        }

        for pair in observed.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
    }

    /// Property 4: MPSC fairness — whatever interleaving of producer thread
    /// counts and per-producer batch sizes, every producer's own items are
    /// popped in the order it pushed them.
    #[test]
    fn prop_mpsc_preserves_per_producer_order(
        producer_count in 1usize..6,
        items_per_producer in 1u32..200
    ) {
        let queue: Arc<OrderQueue<2048>> = Arc::new(OrderQueue::new().unwrap());
        let mut handles = Vec::new();
        for strategy_id in 0..(producer_count as u32) {
            let queue = queue.clone();
            handles.push(thread::spawn(move || {
                for i in 0..items_per_producer {
                    let order = OrderRequest { order_id: i as i64, strategy_id, ..Default::default() };
                    while queue.try_push(order).is_err() {
                        thread::yield_now();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let total = (producer_count as u32) * items_per_producer;
        let mut drained = Vec::new();
        while (drained.len() as u32) < total {
            queue.pop_batch(&mut drained, (total as usize) - drained.len());
        }

        let mut last_seen = vec![None; producer_count];
        for order in &drained {
            let idx = order.strategy_id as usize;
            if let Some(prev) = last_seen[idx] {
                prop_assert!(order.order_id > prev);
            }
            last_seen[idx] = Some(order.order_id);
        }
    }
}
