use crate::exchanges::error::FeedError;
use crate::types::{Quote, TradingPair};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Source of live quotes for one exchange
/// This allows the engine to be independent of the specific exchange implementation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Identifies the feed in reports
    fn name(&self) -> String;

    /// Fixed per-transaction fee rate
    fn fees(&self) -> Decimal;

    /// Connectivity check. Feeds without a health endpoint report success.
    async fn ping(&self) -> Result<(), FeedError> {
        Ok(())
    }

    /// Open a quote subscription for `pair`.
    ///
    /// `interval` is a polling hint; streaming feeds may ignore it.
    async fn open(&self, pair: &TradingPair, interval: Duration) -> Result<PriceStream, FeedError>;
}

/// Create a connected publisher/stream pair backed by a single-slot buffer
pub fn quote_channel() -> (QuotePublisher, PriceStream) {
    let (tx, rx) = watch::channel(None);
    (
        QuotePublisher { tx },
        PriceStream {
            rx,
            producer: None,
            closed: false,
        },
    )
}

/// Producer half of a [`PriceStream`].
///
/// Publishing never blocks: an unconsumed quote is overwritten by the next one.
#[derive(Debug)]
pub struct QuotePublisher {
    tx: watch::Sender<Option<Quote>>,
}

impl QuotePublisher {
    /// Replace the pending quote. Returns false once the stream is gone.
    pub fn publish(&self, quote: Quote) -> bool {
        self.tx.send(Some(quote)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the consuming stream has been dropped
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Cancellable quote subscription with latest-value-wins delivery
#[derive(Debug)]
pub struct PriceStream {
    rx: watch::Receiver<Option<Quote>>,
    producer: Option<JoinHandle<()>>,
    closed: bool,
}

impl PriceStream {
    /// Tie the lifetime of a producer task to this stream
    pub fn with_producer(mut self, producer: JoinHandle<()>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Wait for the most recent unseen quote.
    ///
    /// Returns `None` once the stream is closed or its producer has gone away.
    pub async fn next(&mut self) -> Option<Quote> {
        loop {
            if self.closed {
                return None;
            }

            if self.rx.changed().await.is_err() {
                return None;
            }

            if let Some(quote) = *self.rx.borrow_and_update() {
                return Some(quote);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the subscription. Safe to call any number of times.
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for PriceStream {
    fn drop(&mut self) {
        self.close();
    }
}
