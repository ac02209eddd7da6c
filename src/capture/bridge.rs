//! Rate-limiting bridge between the frame source and the transform engine.
//!
//! A single-slot, latest-value channel: the sender never blocks and a new
//! frame replaces one the consumer has not taken yet. The receiver sees each
//! frame at most once, in the order sent, and learns about closure only
//! after the last pending frame has been taken.

use std::sync::Arc;
use tokio::sync::watch;

/// One fixed-length block of mono samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of this frame in the source's output, starting at zero
    pub seq: u64,
    pub samples: Arc<[f32]>,
}

/// Producer half; safe to call from the audio callback.
pub struct FrameSender {
    tx: watch::Sender<Option<Frame>>,
    next_seq: u64,
}

/// Consumer half, owned by the transform engine.
pub struct FrameReceiver {
    rx: watch::Receiver<Option<Frame>>,
    /// Frame taken by `ready` and not yet handed out by `recv`
    held: Option<Frame>,
    last_seq: Option<u64>,
    dropped: u64,
}

/// Creates a connected bridge.
pub fn bridge() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = watch::channel(None);
    (
        FrameSender { tx, next_seq: 0 },
        FrameReceiver {
            rx,
            held: None,
            last_seq: None,
            dropped: 0,
        },
    )
}

impl FrameSender {
    /// Publishes a frame, discarding any frame still waiting.
    pub fn send(&mut self, samples: Vec<f32>) {
        let frame = Frame {
            seq: self.next_seq,
            samples: samples.into(),
        };
        self.next_seq += 1;
        self.tx.send_replace(Some(frame));
    }

    /// Returns true once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl FrameReceiver {
    /// Waits for the next unseen frame.
    ///
    /// Returns `None` once the sender is gone and no frame is pending.
    pub async fn recv(&mut self) -> Option<Frame> {
        if let Some(frame) = self.held.take() {
            return Some(frame);
        }
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let frame = self.rx.borrow_and_update().clone();
            if let Some(frame) = frame {
                if let Some(last) = self.last_seq {
                    self.dropped += frame.seq.saturating_sub(last + 1);
                }
                self.last_seq = Some(frame.seq);
                return Some(frame);
            }
        }
    }

    /// Waits for the first frame without consuming it.
    ///
    /// Returns false if the sender closed before sending anything.
    pub async fn ready(&mut self) -> bool {
        if self.held.is_none() {
            self.held = self.recv().await;
        }
        self.held.is_some()
    }

    /// Frames replaced before this receiver could take them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_latest_frame_wins() {
        let (mut tx, mut rx) = bridge();
        tx.send(vec![1.0]);
        tx.send(vec![2.0]);
        tx.send(vec![3.0]);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.seq, 2);
        assert_eq!(&*frame.samples, &[3.0]);
        assert_eq!(rx.dropped(), 2);
    }

    #[tokio::test]
    async fn test_pending_frame_survives_close() {
        let (mut tx, mut rx) = bridge();
        tx.send(vec![0.5; 4]);
        drop(tx);

        assert_eq!(rx.recv().await.map(|f| f.seq), Some(0));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_closed_without_frames() {
        let (tx, mut rx) = bridge();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_ready_keeps_first_frame() {
        let (mut tx, mut rx) = bridge();
        tx.send(vec![7.0]);
        assert!(rx.ready().await);
        assert!(rx.ready().await);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.seq, 0);
        assert_eq!(&*frame.samples, &[7.0]);
    }

    #[tokio::test]
    async fn test_ready_fails_when_closed_empty() {
        let (tx, mut rx) = bridge();
        drop(tx);
        assert!(!rx.ready().await);
    }

    #[tokio::test]
    async fn test_sender_sees_receiver_drop() {
        let (tx, rx) = bridge();
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_consumer_sees_strict_subsequence() {
        let (mut tx, mut rx) = bridge();

        let consumer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(frame) = rx.recv().await {
                seen.push(frame.seq);
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            (seen, rx.dropped())
        });

        let producer = std::thread::spawn(move || {
            for i in 0..500 {
                tx.send(vec![i as f32; 8]);
                if i % 50 == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        });
        producer.join().unwrap();

        let (seen, dropped) = consumer.await.unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(seen.last(), Some(&499));
        assert_eq!(seen.len() as u64 + dropped, 500 - seen[0]);
    }
}
