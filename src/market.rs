use crate::error::EngineError;
use crate::portfolio::Positions;
use async_trait::async_trait;

/// top-of-book quote for one team's contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orderbook {
    pub bid: f64,
    pub ask: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order_id: String,
    pub filled_quantity: f64,
}

/// the external market-data / order-placement service, described only at
/// its interface with the core: callers fetch current positions and quotes
/// through this trait and never see the upstream transport.
#[async_trait]
pub trait MarketAdapter: Send + Sync {
    async fn positions(&self) -> Result<Positions, EngineError>;
    async fn orderbook(&self, team: &str) -> Result<Orderbook, EngineError>;
    async fn place_order(&self, team: &str, quantity: f64, limit_price: f64) -> Result<OrderReceipt, EngineError>;
}

/// maps a low-level transport failure onto one of the three external-market
/// error tiers. Connection-level failures are `Unavailable`; anything the
/// upstream service itself rejected is `Upstream`; everything else
/// (malformed credentials, missing config) is `Misconfigured`.
pub fn translate_transport_error(cause: &anyhow::Error) -> EngineError {
    let message = cause.to_string();
    if message.contains("connect") || message.contains("timed out") || message.contains("timeout") {
        EngineError::Unavailable(message)
    } else if message.contains("credential") || message.contains("config") {
        EngineError::Misconfigured(message)
    } else {
        EngineError::Upstream(message)
    }
}

/// fixed-response adapter for offline development; mirrors the mock branch
/// an upstream market client falls back to when no live credentials are
/// configured, rather than exercising a real connection.
pub struct MockMarket {
    fixed: Positions,
}

impl MockMarket {
    pub fn new(fixed: Positions) -> Self {
        Self { fixed }
    }
}

#[async_trait]
impl MarketAdapter for MockMarket {
    async fn positions(&self) -> Result<Positions, EngineError> {
        Ok(self.fixed.clone())
    }

    async fn orderbook(&self, _team: &str) -> Result<Orderbook, EngineError> {
        Ok(Orderbook { bid: 0.45, ask: 0.55 })
    }

    async fn place_order(&self, team: &str, quantity: f64, _limit_price: f64) -> Result<OrderReceipt, EngineError> {
        Ok(OrderReceipt {
            order_id: format!("mock-{team}-{quantity}"),
            filled_quantity: quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_market_returns_fixed_positions() {
        let mut fixed = Positions::new();
        fixed.insert("A".to_string(), 5.0);
        let market = MockMarket::new(fixed.clone());
        assert_eq!(market.positions().await.unwrap(), fixed);
    }

    #[tokio::test]
    async fn mock_market_fills_orders_at_requested_quantity() {
        let market = MockMarket::new(Positions::new());
        let receipt = market.place_order("A", 10.0, 0.5).await.unwrap();
        assert_eq!(receipt.filled_quantity, 10.0);
    }

    #[test]
    fn translate_classifies_connection_failures_as_unavailable() {
        let err = anyhow::anyhow!("connection timed out");
        assert!(matches!(translate_transport_error(&err), EngineError::Unavailable(_)));
    }

    #[test]
    fn translate_classifies_config_failures_as_misconfigured() {
        let err = anyhow::anyhow!("missing credential for market client");
        assert!(matches!(translate_transport_error(&err), EngineError::Misconfigured(_)));
    }

    #[test]
    fn translate_defaults_to_upstream() {
        let err = anyhow::anyhow!("exchange rejected order: bracket mismatch");
        assert!(matches!(translate_transport_error(&err), EngineError::Upstream(_)));
    }
}
