//! Simulated spot exchange.
//!
//! Fills market orders instantly at the configured price. When a ledger is
//! attached, every fill is mirrored into it as a trade and a balance update,
//! so the policy engine sees paper positions the same way it sees real ones.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{ExchangeError, ExchangePort};
use crate::domain::portfolio::{Balance, TradeRecord};
use crate::domain::shared::{OrderId, OrderSide, QUOTE_ASSET, Symbol};
use crate::infrastructure::persistence::InMemoryStorage;

#[derive(Debug, Clone, Copy, Default)]
struct Holding {
    quantity: Decimal,
    avg_entry_price: Decimal,
    realized_profit: Decimal,
}

#[derive(Debug, Default)]
struct Book {
    quote: Decimal,
    holdings: HashMap<String, Holding>,
    prices: HashMap<Symbol, Decimal>,
}

/// Exchange that fills orders against an in-process book.
#[derive(Debug)]
pub struct PaperExchange {
    book: Mutex<Book>,
    ledger: Option<Arc<InMemoryStorage>>,
    next_order: AtomicU64,
}

impl PaperExchange {
    /// Start with `quote_balance` USDT and no prices.
    #[must_use]
    pub fn new(quote_balance: Decimal) -> Self {
        Self {
            book: Mutex::new(Book {
                quote: quote_balance,
                ..Book::default()
            }),
            ledger: None,
            next_order: AtomicU64::new(1),
        }
    }

    /// Quote `symbol` at `price`.
    #[must_use]
    pub fn with_price(self, symbol: impl Into<Symbol>, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Mirror fills into `ledger`.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<InMemoryStorage>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Move the price of `symbol`.
    pub fn set_price(&self, symbol: impl Into<Symbol>, price: Decimal) {
        self.book.lock().prices.insert(symbol.into(), price);
    }

    fn fill(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<(Decimal, Holding, Decimal), ExchangeError> {
        if quantity <= Decimal::ZERO {
            return Err(ExchangeError::OrderRejected {
                reason: format!("quantity must be positive, got {quantity}"),
            });
        }

        let mut book = self.book.lock();
        let price = *book
            .prices
            .get(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        let notional = quantity
            .checked_mul(price)
            .ok_or_else(|| ExchangeError::OrderRejected {
                reason: format!("notional of {quantity} at {price} overflows"),
            })?;
        let asset = symbol.base_asset().to_string();

        match side {
            OrderSide::Buy => {
                if book.quote < notional {
                    return Err(ExchangeError::OrderRejected {
                        reason: format!("insufficient {QUOTE_ASSET}: need {notional}, have {}", book.quote),
                    });
                }
                book.quote -= notional;
                let holding = book.holdings.entry(asset).or_default();
                let total = holding.quantity + quantity;
                holding.avg_entry_price =
                    (holding.quantity * holding.avg_entry_price + notional) / total;
                holding.quantity = total;
                Ok((price, *holding, Decimal::ZERO))
            }
            OrderSide::Sell => {
                let held = book.holdings.get(&asset).map_or(Decimal::ZERO, |h| h.quantity);
                if held < quantity {
                    return Err(ExchangeError::OrderRejected {
                        reason: format!("insufficient {asset}: need {quantity}, have {held}"),
                    });
                }
                book.quote += notional;
                let holding = book.holdings.entry(asset).or_default();
                let pnl = (price - holding.avg_entry_price) * quantity;
                holding.quantity -= quantity;
                holding.realized_profit += pnl;
                if holding.quantity.is_zero() {
                    holding.avg_entry_price = Decimal::ZERO;
                }
                Ok((price, *holding, pnl))
            }
        }
    }

    fn mirror(&self, symbol: &Symbol, side: OrderSide, quantity: Decimal, fill: (Decimal, Holding, Decimal)) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let (price, holding, realized_pnl) = fill;

        ledger.record_trade(TradeRecord {
            symbol: symbol.clone(),
            side,
            quantity,
            price,
            realized_pnl,
            executed_at: Utc::now(),
        });

        let mut balance = Balance::new(symbol.clone(), holding.quantity, holding.avg_entry_price)
            .with_unrealized_pnl(holding.quantity * (price - holding.avg_entry_price));
        balance.realized_profit = holding.realized_profit;
        ledger.upsert_balance(balance);
    }
}

#[async_trait]
impl ExchangePort for PaperExchange {
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        self.book
            .lock()
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    async fn get_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        let book = self.book.lock();
        if asset == QUOTE_ASSET {
            return Ok(book.quote);
        }
        Ok(book.holdings.get(asset).map_or(Decimal::ZERO, |h| h.quantity))
    }

    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderId, ExchangeError> {
        let fill = self.fill(symbol, side, quantity)?;
        self.mirror(symbol, side, quantity, fill);

        let sequence = self.next_order.fetch_add(1, Ordering::SeqCst);
        let order_id = OrderId::new(format!("paper-{sequence}"));
        tracing::debug!(
            order_id = %order_id,
            symbol = %symbol,
            side = side.as_str(),
            quantity = %quantity,
            price = %fill.0,
            "Paper order filled"
        );
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StoragePort;
    use rust_decimal_macros::dec;

    fn exchange() -> PaperExchange {
        PaperExchange::new(dec!(1000)).with_price("BTCUSDT", dec!(50000))
    }

    #[tokio::test]
    async fn buy_moves_quote_into_base() {
        let exchange = exchange();
        let btc = Symbol::new("BTCUSDT");

        exchange.place_market_order(&btc, OrderSide::Buy, dec!(0.01)).await.unwrap();

        assert_eq!(exchange.get_balance("USDT").await.unwrap(), dec!(500));
        assert_eq!(exchange.get_balance("BTC").await.unwrap(), dec!(0.01));
    }

    #[tokio::test]
    async fn buy_beyond_quote_balance_is_rejected() {
        let exchange = exchange();

        let err = exchange
            .place_market_order(&Symbol::new("BTCUSDT"), OrderSide::Buy, dec!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::OrderRejected { .. }));
        assert_eq!(exchange.get_balance("USDT").await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn sell_without_holding_is_rejected() {
        let exchange = exchange();

        let result = exchange
            .place_market_order(&Symbol::new("BTCUSDT"), OrderSide::Sell, dec!(0.001))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_symbol_has_no_price() {
        let err = exchange().get_price(&Symbol::new("DOGEUSDT")).await.unwrap_err();
        assert_eq!(
            err,
            ExchangeError::UnknownSymbol {
                symbol: "DOGEUSDT".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fills_are_mirrored_into_ledger() {
        let ledger = Arc::new(InMemoryStorage::new());
        let exchange = exchange().with_ledger(ledger.clone());
        let btc = Symbol::new("BTCUSDT");

        exchange.place_market_order(&btc, OrderSide::Buy, dec!(0.01)).await.unwrap();
        exchange.set_price("BTCUSDT", dec!(40000));
        exchange.place_market_order(&btc, OrderSide::Sell, dec!(0.005)).await.unwrap();

        let trades = ledger.recent_trades(Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].realized_pnl, dec!(-50));

        let balances = ledger.balances().await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].quantity, dec!(0.005));
        assert_eq!(balances[0].realized_profit, dec!(-50));
    }

    #[tokio::test]
    async fn order_ids_are_sequential() {
        let exchange = exchange();
        let btc = Symbol::new("BTCUSDT");

        let first = exchange.place_market_order(&btc, OrderSide::Buy, dec!(0.001)).await.unwrap();
        let second = exchange.place_market_order(&btc, OrderSide::Buy, dec!(0.001)).await.unwrap();

        assert_eq!(first.as_str(), "paper-1");
        assert_eq!(second.as_str(), "paper-2");
    }
}
