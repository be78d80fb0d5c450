//! 조회 결과를 사람이 읽기 좋게 로그로 남긴다

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use interface::{Balances, Currency, Market, Ohlcv, Order, OrderBook, Ticker, Trade};

fn opt(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn print_markets(markets: &[Market]) {
    info!("=== Markets (총 {}개) ===", markets.len());
    for market in markets {
        info!(
            "{:<16} id={:<14} active={:?} amount_step={} price_step={}",
            market.symbol,
            market.id,
            market.active,
            opt(market.precision.amount),
            opt(market.precision.price),
        );
    }
}

pub fn print_currencies(currencies: &BTreeMap<String, Currency>) {
    info!("=== Currencies (총 {}개) ===", currencies.len());
    for currency in currencies.values() {
        info!(
            "{:<8} deposit={:?} withdraw={:?} fee={} networks={}",
            currency.code,
            currency.deposit,
            currency.withdraw,
            opt(currency.fee),
            currency.networks.keys().cloned().collect::<Vec<_>>().join(","),
        );
    }
}

pub fn print_ticker(ticker: &Ticker) {
    info!(
        "[{}] last={} bid={} ask={} high={} low={} base_volume={} change%={}",
        ticker.symbol,
        opt(ticker.last),
        opt(ticker.bid),
        opt(ticker.ask),
        opt(ticker.high),
        opt(ticker.low),
        opt(ticker.base_volume),
        opt(ticker.percentage),
    );
}

pub fn print_order_book(book: &OrderBook, depth: usize) {
    info!(
        "=== {} order book (bids {}, asks {}) ===",
        book.symbol,
        book.bids.len(),
        book.asks.len()
    );
    for ask in book.asks.iter().take(depth).rev() {
        info!("  ask {:>18} {:>18}", ask.price, ask.amount);
    }
    for bid in book.bids.iter().take(depth) {
        info!("  bid {:>18} {:>18}", bid.price, bid.amount);
    }
}

pub fn print_trades(trades: &[Trade]) {
    info!("=== Trades (총 {}개) ===", trades.len());
    for trade in trades {
        info!(
            "{} {:?} price={} amount={} id={}",
            trade.datetime().unwrap_or_default(),
            trade.side,
            opt(trade.price),
            opt(trade.amount),
            trade.id.as_deref().unwrap_or("-"),
        );
    }
}

pub fn print_ohlcv(candles: &[Ohlcv]) {
    info!("=== OHLCV (총 {}개) ===", candles.len());
    for c in candles {
        info!(
            "{} o={} h={} l={} c={} v={}",
            c.timestamp, c.open, c.high, c.low, c.close, c.volume
        );
    }
}

/// 잔고가 0 인 통화는 건너뛴다
pub fn print_balances(balances: &Balances) {
    let non_zero: Vec<_> = balances
        .entries
        .iter()
        .filter(|(_, b)| b.total.is_some_and(|t| !t.is_zero()))
        .collect();
    info!("=== Balances (총 {}개) ===", non_zero.len());
    for (code, balance) in non_zero {
        info!(
            "{:<8} free={} used={} total={}",
            code,
            opt(balance.free),
            opt(balance.used),
            opt(balance.total),
        );
    }
}

pub fn print_orders(orders: &[Order]) {
    info!("=== Orders (총 {}개) ===", orders.len());
    for order in orders {
        info!(
            "{} {} {:?} {:?} price={} amount={} filled={} status={:?}",
            order.id.as_deref().unwrap_or("-"),
            order.symbol.as_deref().unwrap_or("-"),
            order.side,
            order.order_type.as_ref().map(|t| t.to_string()),
            opt(order.price),
            opt(order.amount),
            opt(order.filled),
            order.status.as_ref().map(|s| s.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_opt_formatting() {
        assert_eq!(opt(None), "-");
        assert_eq!(opt(Some(dec!(0.5))), "0.5");
    }
}
