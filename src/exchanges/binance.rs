use crate::exchanges::error::FeedError;
use crate::traits::{quote_channel, PriceFeed, PriceStream, QuotePublisher};
use crate::types::{Quote, TradingPair};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

const MAINNET_WS_URL: &str = "wss://stream.binance.com:9443/ws";
const TESTNET_WS_URL: &str = "wss://testnet.binance.vision/ws";
const MAINNET_REST_URL: &str = "https://api.binance.com/api/v3";
const TESTNET_REST_URL: &str = "https://testnet.binance.vision/api/v3";

type BinanceSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binance individual symbol book ticker message
#[derive(Debug, Clone, Deserialize)]
pub struct BookTickerMessage {
    /// Order book update id
    #[serde(rename = "u")]
    pub update_id: u64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Best bid price
    #[serde(rename = "b")]
    pub best_bid: String,
    /// Best ask price
    #[serde(rename = "a")]
    pub best_ask: String,
}

impl BookTickerMessage {
    /// Parse a raw websocket text frame
    pub fn from_json(json: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_quote(&self) -> Result<Quote, FeedError> {
        Quote::from_strs(&self.best_ask, &self.best_bid)
            .map_err(|e| FeedError::Parse(format!("{} ({})", e, self.symbol)))
    }
}

/// Binance spot feed streaming best bid/ask over websocket
pub struct BinanceFeed {
    /// Per-transaction fee rate
    fees: Decimal,
    /// Base URL for WebSocket
    ws_url: String,
    /// Base URL for the REST API, used for health checks
    rest_url: String,
    http_client: Client,
}

impl BinanceFeed {
    /// Create a new Binance feed
    pub fn new(fees: Decimal, testnet: bool) -> Self {
        let (ws_url, rest_url) = if testnet {
            (TESTNET_WS_URL, TESTNET_REST_URL)
        } else {
            (MAINNET_WS_URL, MAINNET_REST_URL)
        };
        Self {
            fees,
            ws_url: ws_url.to_string(),
            rest_url: rest_url.to_string(),
            http_client: Client::new(),
        }
    }

    /// Point health checks at a different REST endpoint
    pub fn with_rest_url(mut self, rest_url: impl Into<String>) -> Self {
        self.rest_url = rest_url.into();
        self
    }

    /// Point the feed at a different websocket endpoint
    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Stream URL for a pair, e.g. `wss://stream.binance.com:9443/ws/btcusdt@bookTicker`
    pub fn stream_url(&self, pair: &TradingPair) -> String {
        format!(
            "{}/{}@bookTicker",
            self.ws_url.trim_end_matches('/'),
            pair.concat().to_lowercase()
        )
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    fn name(&self) -> String {
        "binance".to_string()
    }

    fn fees(&self) -> Decimal {
        self.fees
    }

    /// `GET /api/v3/ping`
    async fn ping(&self) -> Result<(), FeedError> {
        let url = format!("{}/ping", self.rest_url.trim_end_matches('/'));
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Http(format!("ping failed: {}", response.status())));
        }
        Ok(())
    }

    async fn open(&self, pair: &TradingPair, _interval: Duration) -> Result<PriceStream, FeedError> {
        let stream_url = self.stream_url(pair);
        info!("Connecting to Binance WebSocket: {}", stream_url);

        let (socket, _) = connect_async(&stream_url).await?;

        let (publisher, stream) = quote_channel();
        let producer = tokio::spawn(pump_book_ticker(socket, publisher));

        Ok(stream.with_producer(producer))
    }
}

/// Forward book ticker frames into the stream until either side goes away.
/// Unparseable frames are skipped; there is no reconnection. Pings are
/// answered by tungstenite while the socket is being read.
async fn pump_book_ticker(mut socket: BinanceSocket, publisher: QuotePublisher) {
    loop {
        tokio::select! {
            _ = publisher.closed() => {
                let _ = socket.close(None).await;
                break;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match BookTickerMessage::from_json(&text).and_then(|m| m.to_quote()) {
                        Ok(quote) => {
                            publisher.publish(quote);
                        }
                        Err(e) => debug!("binance: dropping bad book ticker: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("binance: book ticker stream closed by server");
                    break;
                }
                Some(Err(e)) => {
                    warn!("binance: websocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        let pair = TradingPair::parse("BTC-USDT").unwrap();

        let feed = BinanceFeed::new(Decimal::new(1, 3), false);
        assert_eq!(
            feed.stream_url(&pair),
            "wss://stream.binance.com:9443/ws/btcusdt@bookTicker"
        );

        let feed = BinanceFeed::new(Decimal::new(1, 3), true);
        assert_eq!(
            feed.stream_url(&pair),
            "wss://testnet.binance.vision/ws/btcusdt@bookTicker"
        );
    }

    #[test]
    fn test_parse_book_ticker() {
        let json = r#"{"u":400900217,"s":"BNBUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000"}"#;
        let message = BookTickerMessage::from_json(json).unwrap();
        assert_eq!(message.update_id, 400900217);
        assert_eq!(message.symbol, "BNBUSDT");

        let quote = message.to_quote().unwrap();
        assert_eq!(quote, Quote::from_strs("25.36520000", "25.35190000").unwrap());
    }

    #[test]
    fn test_bad_book_ticker_is_rejected() {
        let json = r#"{"u":1,"s":"BNBUSDT","b":"not-a-number","B":"1","a":"25.3","A":"1"}"#;
        let message = BookTickerMessage::from_json(json).unwrap();
        assert!(matches!(message.to_quote(), Err(FeedError::Parse(_))));

        assert!(matches!(
            BookTickerMessage::from_json(r#"{"result":null,"id":1}"#),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_feed_identity() {
        let feed = BinanceFeed::new(Decimal::new(1, 3), false);
        assert_eq!(feed.name(), "binance");
        assert_eq!(feed.fees(), Decimal::new(1, 3));
    }
}
