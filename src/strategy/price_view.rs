use crate::types::Quote;
use tokio::sync::{watch, RwLock};

/// Materialized view of one feed's latest quote.
///
/// Written by a single feed consumer and read by the evaluation loop. The
/// first `update` flips the view to ready exactly once; later updates only
/// overwrite the stored quote.
#[derive(Debug)]
pub struct PriceView {
    exchange: String,
    quote: RwLock<Quote>,
    ready: watch::Sender<bool>,
}

impl PriceView {
    pub fn new(exchange: impl Into<String>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            exchange: exchange.into(),
            quote: RwLock::new(Quote::default()),
            ready,
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Overwrite the stored quote.
    ///
    /// Returns true only for the update that made the view ready. Signalling
    /// never blocks, however many times it is attempted.
    pub async fn update(&self, quote: Quote) -> bool {
        {
            let mut slot = self.quote.write().await;
            *slot = quote;
        }

        // the quote is stored before readiness becomes visible
        self.ready.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Snapshot of ask and bid taken under one lock
    pub async fn read(&self) -> Quote {
        *self.quote.read().await
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once the first quote has been stored
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // the sender lives in `self`, so the channel cannot close under us
        let _ = ready.wait_for(|ready| *ready).await;
    }

    /// Observe the readiness transition directly
    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready, block_on, task};

    fn quote(ask: &str, bid: &str) -> Quote {
        Quote::from_strs(ask, bid).unwrap()
    }

    #[test]
    fn test_new_view_is_not_ready() {
        let view = PriceView::new("binance");
        assert_eq!(view.exchange(), "binance");
        assert!(!view.is_ready());
        assert_eq!(block_on(view.read()), Quote::default());
    }

    #[test]
    fn test_wait_ready_pends_until_first_update() {
        let view = PriceView::new("binance");
        let mut wait = task::spawn(view.wait_ready());

        assert_pending!(wait.poll());

        assert!(block_on(view.update(quote("110", "100"))));
        assert!(wait.is_woken());
        assert_ready!(wait.poll());
        assert!(view.is_ready());
    }

    #[test]
    fn test_readiness_signal_fires_once() {
        let view = PriceView::new("1inch");
        let mut observer = view.subscribe_ready();
        assert!(!observer.has_changed().unwrap());

        let transitions: Vec<bool> = (0..5)
            .map(|i| block_on(view.update(quote(&format!("10{}", i), "100"))))
            .collect();
        assert_eq!(transitions, vec![true, false, false, false, false]);

        assert!(observer.has_changed().unwrap());
        assert!(*observer.borrow_and_update());

        block_on(view.update(quote("200", "199")));
        assert!(!observer.has_changed().unwrap());

        assert_eq!(block_on(view.read()), quote("200", "199"));
    }

    #[test]
    fn test_wait_ready_after_ready_returns_immediately() {
        let view = PriceView::new("binance");
        block_on(view.update(quote("1", "1")));

        let mut wait = task::spawn(view.wait_ready());
        assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_quotes() {
        let view = Arc::new(PriceView::new("binance"));
        view.update(quote("101", "100")).await;

        let writer = {
            let view = view.clone();
            tokio::spawn(async move {
                for i in 0..500u32 {
                    let bid = 100 + i;
                    view.update(quote(&(bid + 1).to_string(), &bid.to_string()))
                        .await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let view = view.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let q = view.read().await;
                        // every quote written keeps ask = bid + 1
                        assert_eq!(q.ask.value() - q.bid.value(), rust_decimal::Decimal::ONE);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
