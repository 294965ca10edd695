//! Trading Helper Utilities for Backpack spot markets
//!
//! This module provides helper functions for common trading operations:
//! - Best price lookup on a depth snapshot
//! - Spread and notional calculations
//! - Currency formatting for progress output
//!
//! All arithmetic is done on `Decimal` so prices keep the exchange's scale.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{models::Depth, types::Side};

/// Lowest ask on the book
///
/// Levels are not assumed to be sorted.
pub fn best_ask(depth: &Depth) -> Option<Decimal> {
    depth.asks.iter().map(|level| level.price).min()
}

/// Highest bid on the book
pub fn best_bid(depth: &Depth) -> Option<Decimal> {
    depth.bids.iter().map(|level| level.price).max()
}

/// Price that crosses the spread for an order on `side`
///
/// # Arguments
/// * `depth` - Order book snapshot
/// * `side` - Side of the order being placed
///
/// # Returns
/// The lowest ask for a `Bid`, the highest bid for an `Ask`, or `None` when
/// the opposing side is empty
pub fn crossing_price(depth: &Depth, side: Side) -> Option<Decimal> {
    match side {
        Side::Bid => best_ask(depth),
        Side::Ask => best_bid(depth),
    }
}

/// Calculate the mid-price from bid and ask prices
///
/// # Returns
/// Mid-price (bid + ask) / 2
pub fn calculate_mid_price(bid: Decimal, ask: Decimal) -> Decimal {
    (bid + ask) / Decimal::TWO
}

/// Calculate the spread between bid and ask
///
/// # Returns
/// Absolute spread (ask - bid)
pub fn calculate_spread(bid: Decimal, ask: Decimal) -> Decimal {
    ask - bid
}

/// Calculate the spread as a percentage of mid-price
///
/// # Returns
/// Spread percentage (spread / mid_price) * 100, or `None` for a zero mid
pub fn calculate_spread_percentage(bid: Decimal, ask: Decimal) -> Option<Decimal> {
    let mid = calculate_mid_price(bid, ask);
    if mid.is_zero() {
        return None;
    }
    Some(calculate_spread(bid, ask) / mid * Decimal::ONE_HUNDRED)
}

/// Quote value of `quantity` at `price`
pub fn calculate_notional(quantity: Decimal, price: Decimal) -> Decimal {
    quantity * price
}

/// Format an amount as US dollars, e.g. `$1,234.57`
///
/// Rounds half away from zero to cents and groups thousands with commas.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${grouped}.{cents}", if negative { "-" } else { "" })
}
