//! HTTP Agent Integration Tests
//!
//! Runs the agent on a real socket and talks to it over plain HTTP/1.1.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use price_agent::{
    HttpAgent, HttpAgentConfig, JsonMarshaller, NoopPriceHook, Pair, PriceMap, PriceModel,
    PriceProvider, PriceRecord, PriceTick, ProviderError, Service, ServiceError,
    StaticPriceProvider,
};

/// Provider whose queries never complete.
struct StalledProvider;

#[async_trait]
impl PriceProvider for StalledProvider {
    async fn price(&self, _pair: &Pair) -> Result<PriceTick, ProviderError> {
        std::future::pending().await
    }

    async fn prices(&self, _pairs: &[Pair]) -> Result<PriceMap, ProviderError> {
        std::future::pending().await
    }

    async fn models(
        &self,
        _pairs: &[Pair],
    ) -> Result<std::collections::HashMap<Pair, PriceModel>, ProviderError> {
        std::future::pending().await
    }
}

fn agent() -> HttpAgent {
    let mut median = PriceTick::new(
        Pair::new("ETH", "USD"),
        Decimal::new(250_050, 2),
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
    )
    .with_kind("median");
    median.bid = Some(Decimal::new(2500, 0));
    median.ask = Some(Decimal::new(2501, 0));
    median.ticks = vec![
        PriceTick::new(Pair::new("ETH", "USD"), Decimal::new(2500, 0), median.timestamp)
            .with_kind("origin"),
    ];

    let provider = StaticPriceProvider::from_ticks([
        median,
        PriceTick::new(Pair::new("BTC", "USD"), Decimal::new(65_000, 0), Utc::now()),
    ]);

    HttpAgent::new(HttpAgentConfig {
        provider: Arc::new(provider),
        hook: Arc::new(NoopPriceHook),
        marshaller: Arc::new(JsonMarshaller::new()),
        address: "127.0.0.1:0".to_string(),
    })
}

/// Send one request and return `(status, body)`.
async fn post(addr: SocketAddr, path: &str, content_type: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("response should arrive")
        .unwrap();

    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn serves_queries_until_cancelled() {
    let agent = agent();
    let cancel = CancellationToken::new();
    agent.start(cancel.clone()).unwrap();
    let addr = agent.local_addr().unwrap();

    let (status, body) = post(
        addr,
        "/price",
        "application/json",
        r#"{"Pair":{"Base":"ETH","Quote":"USD"}}"#,
    )
    .await;
    assert_eq!(status, 200);
    let record: PriceRecord = serde_json::from_str(&body).unwrap();
    assert_eq!(record.kind, "median");
    assert_eq!(record.base, "ETH");
    assert_eq!(record.quote, "USD");
    assert_eq!(record.price, Decimal::new(250_050, 2));
    assert_eq!(record.bid, Some(Decimal::new(2500, 0)));
    assert_eq!(record.ask, Some(Decimal::new(2501, 0)));
    assert_eq!(record.volume_24h, None);
    assert_eq!(record.ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
    assert_eq!(record.prices.len(), 1);
    assert_eq!(record.prices[0].kind, "origin");

    let (status, body) = post(
        addr,
        "/prices",
        "application/json",
        r#"{"Pairs":[{"Base":"ETH","Quote":"USD"},{"Base":"BTC","Quote":"USD"}]}"#,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body.lines().count(), 2);

    cancel.cancel();
    let result = timeout(Duration::from_secs(5), agent.wait())
        .await
        .expect("agent should stop after cancellation");
    assert_eq!(result, Ok(()));
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn rejects_wrong_content_type_over_the_wire() {
    let agent = agent();
    let cancel = CancellationToken::new();
    agent.start(cancel.clone()).unwrap();

    let (status, body) = post(
        agent.local_addr().unwrap(),
        "/prices",
        "text/plain",
        r#"{"Pairs":[{"Base":"ETH","Quote":"USD"}]}"#,
    )
    .await;
    assert_eq!(status, 415);
    assert_eq!(body, "Content-Type header is not application/json");

    cancel.cancel();
    agent.wait().await.unwrap();
}

#[tokio::test]
async fn empty_and_unknown_queries_return_empty_object() {
    let agent = agent();
    let cancel = CancellationToken::new();
    agent.start(cancel.clone()).unwrap();
    let addr = agent.local_addr().unwrap();

    let (_, body) = post(addr, "/prices", "application/json", r#"{"Pairs":[]}"#).await;
    assert_eq!(body, "{}");

    let (_, body) = post(
        addr,
        "/price",
        "application/json",
        r#"{"Pair":{"Base":"XYZ","Quote":"USD"}}"#,
    )
    .await;
    assert_eq!(body, "{}");

    cancel.cancel();
    agent.wait().await.unwrap();
}

#[tokio::test]
async fn second_start_is_rejected() {
    let agent = agent();
    let cancel = CancellationToken::new();

    agent.start(cancel.clone()).unwrap();
    let addr = agent.local_addr();
    assert_eq!(agent.start(cancel.clone()), Err(ServiceError::AlreadyStarted));
    assert_eq!(agent.local_addr(), addr);

    cancel.cancel();
    agent.wait().await.unwrap();
}

#[tokio::test]
async fn occupied_address_fails_to_start() {
    let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken = holder.local_addr().unwrap().to_string();

    let agent = HttpAgent::new(HttpAgentConfig {
        provider: Arc::new(StaticPriceProvider::default()),
        hook: Arc::new(NoopPriceHook),
        marshaller: Arc::new(JsonMarshaller::new()),
        address: taken.clone(),
    });

    let err = agent.start(CancellationToken::new()).unwrap_err();
    assert!(matches!(err, ServiceError::Bind { ref addr, .. } if *addr == taken));
    assert_eq!(agent.wait().await, Err(err));
}

#[tokio::test]
async fn cancel_interrupts_stalled_request() {
    let agent = HttpAgent::new(HttpAgentConfig {
        provider: Arc::new(StalledProvider),
        hook: Arc::new(NoopPriceHook),
        marshaller: Arc::new(JsonMarshaller::new()),
        address: "127.0.0.1:0".to_string(),
    });
    let cancel = CancellationToken::new();
    agent.start(cancel.clone()).unwrap();
    let addr = agent.local_addr().unwrap();

    let request = tokio::spawn(post(
        addr,
        "/prices",
        "application/json",
        r#"{"Pairs":[{"Base":"ETH","Quote":"USD"}]}"#,
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!request.is_finished());

    cancel.cancel();
    let result = timeout(Duration::from_secs(3), agent.wait())
        .await
        .expect("wait should resolve while a request is stalled");
    assert_eq!(result, Ok(()));

    let (status, body) = request.await.unwrap();
    assert_eq!(status, 503);
    assert_eq!(body, "server is shutting down");
}
