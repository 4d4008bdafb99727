//! Price Hooks

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::ports::{HookError, PriceHook, PriceMap};

/// Hook that accepts every price.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPriceHook;

#[async_trait]
impl PriceHook for NoopPriceHook {
    async fn check(&self, _prices: &PriceMap) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hook that rejects prices older than `max_age` or carrying an error marker.
#[derive(Debug, Clone, Copy)]
pub struct MaxAgeHook {
    max_age: Duration,
}

impl MaxAgeHook {
    /// Create a hook with the given staleness bound.
    #[must_use]
    pub const fn new(max_age: Duration) -> Self {
        Self { max_age }
    }
}

#[async_trait]
impl PriceHook for MaxAgeHook {
    async fn check(&self, prices: &PriceMap) -> Result<(), HookError> {
        let now = Utc::now();
        for (pair, tick) in prices {
            if let Some(message) = tick.error_message() {
                return Err(HookError::Rejected {
                    pair: pair.clone(),
                    reason: message.to_string(),
                });
            }
            // Future timestamps count as fresh.
            let age = (now - tick.timestamp).to_std().unwrap_or_default();
            if age > self.max_age {
                return Err(HookError::Rejected {
                    pair: pair.clone(),
                    reason: format!("price is {}s old", age.as_secs()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::pair::Pair;
    use crate::domain::price::PriceTick;

    fn prices(tick: PriceTick) -> PriceMap {
        [(tick.pair.clone(), tick)].into()
    }

    #[tokio::test]
    async fn noop_accepts_anything() {
        let tick = PriceTick::new(Pair::new("ETH", "USD"), Decimal::ONE, Utc::now())
            .with_error("broken");
        assert!(NoopPriceHook.check(&prices(tick)).await.is_ok());
    }

    #[tokio::test]
    async fn fresh_price_passes() {
        let hook = MaxAgeHook::new(Duration::from_secs(60));
        let tick = PriceTick::new(Pair::new("ETH", "USD"), Decimal::ONE, Utc::now());
        assert!(hook.check(&prices(tick)).await.is_ok());
    }

    #[tokio::test]
    async fn stale_price_is_rejected() {
        let hook = MaxAgeHook::new(Duration::from_secs(60));
        let tick = PriceTick::new(
            Pair::new("ETH", "USD"),
            Decimal::ONE,
            Utc::now() - TimeDelta::minutes(10),
        );

        let err = hook.check(&prices(tick)).await.unwrap_err();
        assert!(matches!(err, HookError::Rejected { ref pair, .. } if *pair == Pair::new("ETH", "USD")));
    }

    #[tokio::test]
    async fn error_marker_is_rejected() {
        let hook = MaxAgeHook::new(Duration::from_secs(60));
        let tick = PriceTick::new(Pair::new("ETH", "USD"), Decimal::ONE, Utc::now())
            .with_error("no sources");

        assert_eq!(
            hook.check(&prices(tick)).await,
            Err(HookError::Rejected {
                pair: Pair::new("ETH", "USD"),
                reason: "no sources".into(),
            })
        );
    }
}
