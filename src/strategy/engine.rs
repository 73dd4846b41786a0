use crate::exchanges::error::FeedError;
use crate::strategy::plan::{ArbitragePlan, Leg};
use crate::strategy::price_view::PriceView;
use crate::strategy::reporter::PlanSink;
use crate::traits::{PriceFeed, PriceStream};
use crate::types::TradingPair;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Lifecycle of an [`ArbitrageEngine`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Opening both feeds
    Initializing,
    /// Consumers running, waiting for the first quote from each feed
    WaitingReady,
    /// Timer-driven evaluation of both directions
    Evaluating,
    Stopped,
}

/// Errors that end an engine run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("init price stream for {exchange} failed: {source}")]
    FeedOpen {
        exchange: String,
        #[source]
        source: FeedError,
    },
    #[error("price feed {exchange} delivered no quote within {timeout:?}")]
    FeedNotReady { exchange: String, timeout: Duration },
    #[error("invalid engine config: {0}")]
    InvalidConfig(&'static str),
}

/// Immutable settings for one engine
#[derive(Clone)]
pub struct EngineConfig {
    /// Trading pair evaluated on both feeds
    pub pair: TradingPair,
    /// Sampling interval of the evaluation loop
    pub interval: Duration,
    /// Fractional slippage applied to both legs
    pub slippage: Decimal,
    /// Bound on the wait for the first quotes; `None` waits indefinitely
    pub ready_timeout: Option<Duration>,
    pub feed_a: Arc<dyn PriceFeed>,
    pub feed_b: Arc<dyn PriceFeed>,
}

impl EngineConfig {
    pub fn new(
        pair: TradingPair,
        interval: Duration,
        slippage: Decimal,
        feed_a: Arc<dyn PriceFeed>,
        feed_b: Arc<dyn PriceFeed>,
    ) -> Self {
        Self {
            pair,
            interval,
            slippage,
            ready_timeout: None,
            feed_a,
            feed_b,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    /// Reject settings the run loop cannot honour
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.interval.is_zero() {
            return Err(EngineError::InvalidConfig("sampling interval must be positive"));
        }
        if self.ready_timeout.is_some_and(|t| t.is_zero()) {
            return Err(EngineError::InvalidConfig("ready timeout must be positive"));
        }
        Ok(())
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("pair", &self.pair)
            .field("interval", &self.interval)
            .field("slippage", &self.slippage)
            .field("ready_timeout", &self.ready_timeout)
            .field("feed_a", &self.feed_a.name())
            .field("feed_b", &self.feed_b.name())
            .finish()
    }
}

/// Cross-exchange arbitrage monitor for one pair on two feeds.
///
/// Each run drains both feeds into private [`PriceView`]s, waits until both
/// have a quote, then evaluates buy-on-A/sell-on-B and buy-on-B/sell-on-A
/// every interval and reports both plans to the sink.
pub struct ArbitrageEngine {
    config: EngineConfig,
    sink: Arc<dyn PlanSink>,
    state: watch::Sender<EngineState>,
}

impl ArbitrageEngine {
    pub fn new(config: EngineConfig, sink: Arc<dyn PlanSink>) -> Self {
        let (state, _) = watch::channel(EngineState::Initializing);
        Self {
            config,
            sink,
            state,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: EngineState) {
        self.state.send_replace(state);
    }

    /// Run until `shutdown` turns true (or its sender is dropped).
    ///
    /// Only startup failures are returned as errors. All consumer tasks have
    /// finished by the time this returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        self.set_state(EngineState::Initializing);
        let result = match self.config.validate() {
            Ok(()) => self.run_inner(&mut shutdown).await,
            Err(e) => Err(e),
        };
        self.set_state(EngineState::Stopped);

        match &result {
            Ok(()) => info!("{}: arbitrage engine stopped", self.config.pair),
            Err(e) => error!("{}: arbitrage engine failed: {}", self.config.pair, e),
        }
        result
    }

    async fn run_inner(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), EngineError> {
        let pair = &self.config.pair;
        let interval = self.config.interval;

        let stream_a = open_stream(self.config.feed_a.as_ref(), pair, interval).await?;
        let stream_b = open_stream(self.config.feed_b.as_ref(), pair, interval).await?;

        let view_a = Arc::new(PriceView::new(self.config.feed_a.name()));
        let view_b = Arc::new(PriceView::new(self.config.feed_b.name()));

        let (stop_tx, stop_rx) = watch::channel(false);
        let consumers: [JoinHandle<()>; 2] = [
            tokio::spawn(consume_price_stream(stream_a, view_a.clone(), stop_rx.clone())),
            tokio::spawn(consume_price_stream(stream_b, view_b.clone(), stop_rx)),
        ];

        let outcome = self.synchronize(&view_a, &view_b, shutdown).await;

        let _ = stop_tx.send(true);
        for consumer in consumers {
            if let Err(e) = consumer.await {
                warn!("{}: price consumer ended abnormally: {}", pair, e);
            }
        }

        outcome
    }

    async fn synchronize(
        &self,
        view_a: &PriceView,
        view_b: &PriceView,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), EngineError> {
        self.set_state(EngineState::WaitingReady);
        debug!(
            "{}: waiting for first quotes from {} and {}",
            self.config.pair,
            view_a.exchange(),
            view_b.exchange()
        );

        let both_ready = async {
            tokio::join!(view_a.wait_ready(), view_b.wait_ready());
        };

        tokio::select! {
            _ = shutdown_requested(shutdown) => return Ok(()),
            ready = bounded(self.config.ready_timeout, both_ready) => {
                if let Err(timeout) = ready {
                    let exchange = if !view_a.is_ready() { view_a.exchange() } else { view_b.exchange() };
                    return Err(EngineError::FeedNotReady {
                        exchange: exchange.to_string(),
                        timeout,
                    });
                }
            }
        }

        self.set_state(EngineState::Evaluating);
        info!(
            "{}: both feeds ready, evaluating every {:?}",
            self.config.pair, self.config.interval
        );

        let fee_a = self.config.feed_a.fees();
        let fee_b = self.config.feed_b.fees();

        let period = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_requested(shutdown) => return Ok(()),
                _ = ticker.tick() => {
                    self.evaluate(view_a, fee_a, view_b, fee_b).await;
                }
            }
        }
    }

    /// Evaluate both directions from the current snapshots
    async fn evaluate(&self, view_a: &PriceView, fee_a: Decimal, view_b: &PriceView, fee_b: Decimal) {
        // the two reads are independent; feeds are not synchronized with each other
        let quote_a = view_a.read().await;
        let quote_b = view_b.read().await;
        let timestamp = Utc::now();

        // buy from exchange A and sell to exchange B
        self.report_direction(
            timestamp,
            Leg::new(view_a.exchange(), quote_a.bid, fee_a),
            Leg::new(view_b.exchange(), quote_b.ask, fee_b),
        );

        // buy from exchange B and sell to exchange A
        self.report_direction(
            timestamp,
            Leg::new(view_b.exchange(), quote_b.bid, fee_b),
            Leg::new(view_a.exchange(), quote_a.ask, fee_a),
        );
    }

    /// Report one direction; a direction whose profit overflows is skipped for this tick
    fn report_direction(&self, timestamp: DateTime<Utc>, buy: Leg<'_>, sell: Leg<'_>) {
        match ArbitragePlan::evaluate(&self.config.pair, timestamp, buy, sell, self.config.slippage) {
            Some(plan) => {
                debug!(
                    "{}: {} -> {} profit {}",
                    self.config.pair, plan.buy_exchange, plan.sell_exchange, plan.profit
                );
                self.sink.report(plan);
            }
            None => debug!(
                "{}: skipping {} -> {}, profit out of range (buy {}, sell {})",
                self.config.pair, buy.exchange, sell.exchange, buy.price, sell.price
            ),
        }
    }
}

async fn open_stream(
    feed: &dyn PriceFeed,
    pair: &TradingPair,
    interval: Duration,
) -> Result<PriceStream, EngineError> {
    feed.open(pair, interval)
        .await
        .map_err(|source| EngineError::FeedOpen {
            exchange: feed.name(),
            source,
        })
}

/// Run `fut` to completion, or give up after `timeout` if one is set
async fn bounded<F: std::future::Future<Output = ()>>(
    timeout: Option<Duration>,
    fut: F,
) -> Result<(), Duration> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => {
            fut.await;
            Ok(())
        }
    }
}

/// Resolves once shutdown was signalled or can no longer be signalled
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Drain a feed into its view until stopped or until the feed ends.
/// Malformed quotes are dropped and leave the view at its last good value.
async fn consume_price_stream(
    mut stream: PriceStream,
    view: Arc<PriceView>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            next = stream.next() => match next {
                Some(quote) if quote.is_well_formed() => {
                    if view.update(quote).await {
                        debug!("{}: price view ready", view.exchange());
                    }
                }
                Some(quote) => {
                    debug!("{}: dropping malformed quote {:?}", view.exchange(), quote);
                }
                None => {
                    info!("{}: price stream ended", view.exchange());
                    break;
                }
            }
        }
    }

    stream.close();
}
