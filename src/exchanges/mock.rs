use crate::exchanges::error::FeedError;
use crate::traits::{quote_channel, PriceFeed, PriceStream, QuotePublisher};
use crate::types::{Quote, TradingPair};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process feed for tests and dry runs.
///
/// Every successful `open` hands the publishing half of the new stream to the
/// feed, so callers can push quotes with [`MockFeed::publish`].
#[derive(Debug, Clone)]
pub struct MockFeed {
    name: String,
    fees: Decimal,
    open_error: Option<FeedError>,
    publishers: Arc<Mutex<Vec<QuotePublisher>>>,
    opened: Arc<Mutex<Vec<TradingPair>>>,
}

impl MockFeed {
    pub fn new(name: impl Into<String>, fees: Decimal) -> Self {
        Self {
            name: name.into(),
            fees,
            open_error: None,
            publishers: Arc::new(Mutex::new(Vec::new())),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every `open` fail with `error`
    pub fn failing(mut self, error: FeedError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Push a quote to the most recently opened stream.
    /// Returns false when nothing is listening.
    pub fn publish(&self, quote: Quote) -> bool {
        let publishers = self.publishers.lock().unwrap_or_else(|e| e.into_inner());
        publishers
            .last()
            .map(|publisher| publisher.publish(quote))
            .unwrap_or(false)
    }

    /// Pairs passed to `open`, in call order
    pub fn opened_pairs(&self) -> Vec<TradingPair> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// True once every stream handed out has been closed or dropped
    pub fn all_streams_closed(&self) -> bool {
        self.publishers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .all(QuotePublisher::is_closed)
    }

    /// Drop the producing side so consumers see the end of the stream
    pub fn end_streams(&self) {
        self.publishers.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl PriceFeed for MockFeed {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn fees(&self) -> Decimal {
        self.fees
    }

    async fn open(&self, pair: &TradingPair, _interval: Duration) -> Result<PriceStream, FeedError> {
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(pair.clone());

        let (publisher, stream) = quote_channel();
        self.publishers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(publisher);

        Ok(stream)
    }
}
