//! Resequencer implementation
//!
//! Events may arrive in any order. An event is dispatched only once every
//! lower sequence number has been dispatched; anything that arrives early
//! waits in `pending` until the gap before it closes.
//!
//! There is no timeout for a missing sequence number. If one never arrives,
//! every later event stays pending.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use super::dispatch::dispatch;
use crate::protocol::constants::FIRST_SEQUENCE;
use crate::protocol::EventRecord;
use crate::registry::Fanout;
use crate::stats::SequencerStats;

struct SequenceState {
    /// Sequence number that will be dispatched next
    next_sequence: u64,
    /// Early arrivals, every key >= `next_sequence`
    pending: HashMap<u64, EventRecord>,
    delivered: u64,
    malformed: u64,
    duplicates: u64,
}

/// Orders incoming events and dispatches them to a [`Fanout`]
///
/// `submit` holds an exclusive lock while it dispatches, so concurrent
/// producers are safe and dispatch order always equals sequence order.
pub struct Resequencer<F> {
    fanout: Arc<F>,
    state: Mutex<SequenceState>,
}

impl<F: Fanout> Resequencer<F> {
    /// Create a resequencer expecting sequence 1 first
    pub fn new(fanout: Arc<F>) -> Self {
        Self {
            fanout,
            state: Mutex::new(SequenceState {
                next_sequence: FIRST_SEQUENCE,
                pending: HashMap::new(),
                delivered: 0,
                malformed: 0,
                duplicates: 0,
            }),
        }
    }

    /// The fan-out target
    pub fn fanout(&self) -> &Arc<F> {
        &self.fanout
    }

    /// Accept one raw record
    ///
    /// Returns how many events were dispatched as a result: zero when the
    /// record is malformed, a duplicate, or ahead of a gap; otherwise one
    /// plus however many pending events it unblocked.
    pub async fn submit(&self, raw: Bytes) -> usize {
        let mut state = self.state.lock().await;

        let event = match EventRecord::parse(raw) {
            Ok(event) => event,
            Err(e) => {
                state.malformed += 1;
                tracing::debug!(error = %e, "Dropping malformed event");
                return 0;
            }
        };

        if event.sequence < state.next_sequence {
            state.duplicates += 1;
            tracing::debug!(
                sequence = event.sequence,
                next_sequence = state.next_sequence,
                "Ignoring already delivered sequence"
            );
            return 0;
        }

        if event.sequence > state.next_sequence {
            tracing::trace!(
                sequence = event.sequence,
                next_sequence = state.next_sequence,
                "Holding out-of-order event"
            );
            state.pending.insert(event.sequence, event);
            return 0;
        }

        let mut dispatched = 0;
        let mut current = Some(event);

        while let Some(event) = current {
            tracing::trace!(sequence = event.sequence, "Dispatching event");
            dispatch(self.fanout.as_ref(), &event).await;

            state.next_sequence += 1;
            state.delivered += 1;
            dispatched += 1;

            let next = state.next_sequence;
            current = state.pending.remove(&next);
        }

        dispatched
    }

    /// Sequence number that will be dispatched next
    pub async fn next_sequence(&self) -> u64 {
        self.state.lock().await.next_sequence
    }

    /// Snapshot of resequencer counters
    pub async fn stats(&self) -> SequencerStats {
        let state = self.state.lock().await;
        SequencerStats {
            next_sequence: state.next_sequence,
            pending: state.pending.len(),
            delivered: state.delivered,
            malformed: state.malformed,
            duplicates: state.duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, DuplexStream};

    use super::*;
    use crate::protocol::SubscriberId;
    use crate::registry::{Subscriber, SubscriberRegistry};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Follow(String, String),
        Unfollow(String, String),
        SendToOne(String, Bytes),
        SendToAll(Bytes),
        SendToFollowers(String, Bytes),
    }

    /// Fanout double that records every call in order
    #[derive(Default)]
    struct Recorder {
        calls: StdMutex<Vec<Call>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        /// Sequence numbers of the raw records seen, in call order
        fn sequences(&self) -> Vec<u64> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::SendToOne(_, raw)
                    | Call::SendToAll(raw)
                    | Call::SendToFollowers(_, raw) => EventRecord::parse(raw).ok(),
                    _ => None,
                })
                .map(|event| event.sequence)
                .collect()
        }
    }

    impl Fanout for Recorder {
        async fn follow(&self, followee: &SubscriberId, follower: &SubscriberId) {
            self.record(Call::Follow(followee.to_string(), follower.to_string()));
        }

        async fn unfollow(&self, followee: &SubscriberId, follower: &SubscriberId) {
            self.record(Call::Unfollow(followee.to_string(), follower.to_string()));
        }

        async fn send_to_one(&self, id: &SubscriberId, data: &Bytes) {
            self.record(Call::SendToOne(id.to_string(), data.clone()));
        }

        async fn send_to_all(&self, data: &Bytes) {
            self.record(Call::SendToAll(data.clone()));
        }

        async fn send_to_followers(&self, followee: &SubscriberId, data: &Bytes) {
            self.record(Call::SendToFollowers(followee.to_string(), data.clone()));
        }
    }

    fn resequencer() -> Resequencer<Recorder> {
        Resequencer::new(Arc::new(Recorder::default()))
    }

    fn line(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    /// Deterministic Fisher-Yates shuffle driven by xorshift
    fn shuffled(n: u64, mut seed: u64) -> Vec<u64> {
        let mut items: Vec<u64> = (1..=n).collect();
        for i in (1..items.len()).rev() {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let j = (seed % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
        items
    }

    #[tokio::test]
    async fn test_follow_dispatch() {
        let reseq = resequencer();

        assert_eq!(reseq.submit(line("1|F|60|50\r\n")).await, 1);

        assert_eq!(
            reseq.fanout().calls(),
            vec![
                Call::Follow("50".into(), "60".into()),
                Call::SendToOne("50".into(), line("1|F|60|50\r\n")),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_by_kind() {
        let reseq = resequencer();

        reseq.submit(line("1|B\r\n")).await;
        reseq.submit(line("2|S|50\r\n")).await;
        reseq.submit(line("3|U|60|50\r\n")).await;
        reseq.submit(line("4|P|60|50\r\n")).await;

        assert_eq!(
            reseq.fanout().calls(),
            vec![
                Call::SendToAll(line("1|B\r\n")),
                Call::SendToFollowers("50".into(), line("2|S|50\r\n")),
                Call::Unfollow("50".into(), "60".into()),
                Call::SendToOne("50".into(), line("4|P|60|50\r\n")),
            ]
        );
    }

    #[tokio::test]
    async fn test_reverse_order_is_restored() {
        let reseq = resequencer();

        assert_eq!(reseq.submit(line("3|F|60|50\r\n")).await, 0);
        assert_eq!(reseq.submit(line("2|F|60|50\r\n")).await, 0);
        assert!(reseq.fanout().calls().is_empty());

        assert_eq!(reseq.submit(line("1|F|60|50\r\n")).await, 3);
        assert_eq!(reseq.fanout().sequences(), vec![1, 2, 3]);

        let stats = reseq.stats().await;
        assert_eq!(stats.next_sequence, 4);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.delivered, 3);
    }

    #[tokio::test]
    async fn test_any_permutation_dispatches_in_order() {
        for seed in [1u64, 7, 42, 0x9E37_79B9, 123_456_789] {
            let reseq = resequencer();
            for seq in shuffled(64, seed) {
                reseq.submit(line(&format!("{}|B\r\n", seq))).await;
            }

            let expected: Vec<u64> = (1..=64).collect();
            assert_eq!(reseq.fanout().sequences(), expected, "seed {}", seed);
        }
    }

    #[tokio::test]
    async fn test_gap_blocks_later_events() {
        let reseq = resequencer();

        reseq.submit(line("1|B\r\n")).await;
        reseq.submit(line("3|B\r\n")).await;
        reseq.submit(line("4|B\r\n")).await;

        assert_eq!(reseq.fanout().sequences(), vec![1]);
        let stats = reseq.stats().await;
        assert_eq!(stats.next_sequence, 2);
        assert_eq!(stats.pending, 2);
        assert!(stats.is_stalled());
    }

    #[tokio::test]
    async fn test_pending_duplicate_overwrites() {
        let reseq = resequencer();

        reseq.submit(line("2|P|1|first\r\n")).await;
        reseq.submit(line("2|P|1|second\r\n")).await;
        reseq.submit(line("1|B\r\n")).await;

        assert_eq!(
            reseq.fanout().calls(),
            vec![
                Call::SendToAll(line("1|B\r\n")),
                Call::SendToOne("second".into(), line("2|P|1|second\r\n")),
            ]
        );
    }

    #[tokio::test]
    async fn test_delivered_duplicate_is_ignored() {
        let reseq = resequencer();

        reseq.submit(line("1|B\r\n")).await;
        assert_eq!(reseq.submit(line("1|B\r\n")).await, 0);

        assert_eq!(reseq.fanout().sequences(), vec![1]);
        let stats = reseq.stats().await;
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_malformed_is_dropped() {
        let reseq = resequencer();

        assert_eq!(reseq.submit(line("x|B\r\n")).await, 0);
        assert_eq!(reseq.submit(line("\r\n")).await, 0);
        assert_eq!(reseq.next_sequence().await, 1);

        reseq.submit(line("1|B\r\n")).await;
        assert_eq!(reseq.fanout().sequences(), vec![1]);
        assert_eq!(reseq.stats().await.malformed, 2);
    }

    #[tokio::test]
    async fn test_unrecognized_event_consumes_its_slot() {
        let reseq = resequencer();

        reseq.submit(line("2|B\r\n")).await;
        assert_eq!(reseq.submit(line("1|X|60|50\r\n")).await, 2);

        assert_eq!(reseq.fanout().sequences(), vec![2]);
        assert_eq!(reseq.next_sequence().await, 3);
    }

    #[tokio::test]
    async fn test_non_utf8_ids_keep_their_slot() {
        let reseq = resequencer();

        reseq.submit(Bytes::from_static(b"2|B\r\n")).await;
        let dispatched = reseq
            .submit(Bytes::from_static(b"1|P|caf\xe9|\xff\r\n"))
            .await;

        assert_eq!(dispatched, 2);
        assert_eq!(reseq.next_sequence().await, 3);
        assert_eq!(reseq.stats().await.malformed, 0);
        assert_eq!(
            reseq.fanout().calls(),
            vec![
                Call::SendToOne(
                    "\u{FFFD}".into(),
                    Bytes::from_static(b"1|P|caf\xe9|\xff\r\n")
                ),
                Call::SendToAll(line("2|B\r\n")),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_producers_keep_order() {
        let reseq = Arc::new(resequencer());
        let mut tasks = tokio::task::JoinSet::new();

        for seq in shuffled(200, 99) {
            let reseq = Arc::clone(&reseq);
            tasks.spawn(async move {
                reseq.submit(line(&format!("{}|S|{}\r\n", seq, seq % 7))).await;
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        let expected: Vec<u64> = (1..=200).collect();
        assert_eq!(reseq.fanout().sequences(), expected);
    }

    async fn read_available(reader: &mut DuplexStream) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        let n = tokio::time::timeout(Duration::from_millis(100), reader.read(&mut buf))
            .await
            .map(|r| r.unwrap())
            .unwrap_or(0);
        buf.truncate(n);
        buf
    }

    #[tokio::test]
    async fn test_unfollow_takes_effect_before_status_update() {
        let registry = Arc::new(SubscriberRegistry::new());
        let reseq = Resequencer::new(Arc::clone(&registry));

        let (w50, mut rx50) = tokio::io::duplex(1024);
        let (w60, mut rx60) = tokio::io::duplex(1024);
        registry.identify("50", Subscriber::new(1, Box::new(w50))).await;
        registry.identify("60", Subscriber::new(2, Box::new(w60))).await;

        // Delivered out of order on purpose
        reseq.submit(line("11|S|50\r\n")).await;
        reseq.submit(line("10|U|60|50\r\n")).await;
        reseq.submit(line("9|F|60|50\r\n")).await;
        for seq in 1..=8 {
            reseq.submit(line(&format!("{}|P|0|nobody\r\n", seq))).await;
        }

        assert_eq!(reseq.next_sequence().await, 12);
        assert_eq!(read_available(&mut rx50).await, b"9|F|60|50\r\n");
        assert!(read_available(&mut rx60).await.is_empty());
    }

    #[tokio::test]
    async fn test_status_update_reaches_follower_only() {
        let registry = Arc::new(SubscriberRegistry::new());
        let reseq = Resequencer::new(Arc::clone(&registry));

        let (w50, mut rx50) = tokio::io::duplex(1024);
        let (w60, mut rx60) = tokio::io::duplex(1024);
        registry.identify("50", Subscriber::new(1, Box::new(w50))).await;
        registry.identify("60", Subscriber::new(2, Box::new(w60))).await;

        reseq.submit(line("1|F|60|50\r\n")).await;
        reseq.submit(line("2|S|50\r\n")).await;

        assert_eq!(read_available(&mut rx50).await, b"1|F|60|50\r\n");
        assert_eq!(read_available(&mut rx60).await, b"2|S|50\r\n");
        assert!(read_available(&mut rx50).await.is_empty());
    }

    #[tokio::test]
    async fn test_private_message_from_non_utf8_sender_is_delivered() {
        let registry = Arc::new(SubscriberRegistry::new());
        let reseq = Resequencer::new(Arc::clone(&registry));

        let (w50, mut rx50) = tokio::io::duplex(1024);
        registry.identify("50", Subscriber::new(1, Box::new(w50))).await;

        reseq.submit(Bytes::from_static(b"1|P|caf\xe9|50\r\n")).await;
        reseq.submit(line("2|B\r\n")).await;

        assert_eq!(reseq.next_sequence().await, 3);
        assert_eq!(read_available(&mut rx50).await, b"1|P|caf\xe9|50\r\n2|B\r\n");
    }
}
