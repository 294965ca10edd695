use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::randomization::{random_quantity, RandomizationLevel};
use crate::{
    backpack_client::{Error, Result},
    types::Side,
};

/// Multiplier applied to the bid-side balance after each full Bid/Ask cycle.
pub const BALANCE_DECAY: Decimal = dec!(0.999);
const BALANCE_DP: u32 = 12;

/// Mutable bookkeeping owned by a single volume loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopState {
    side: Side,
    bid_balance: Decimal,
    ask_balance: Option<Decimal>,
    volume: Decimal,
    notional: Decimal,
    fills: u64,
    iterations: u64,
}

impl LoopState {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            side: Side::Bid,
            bid_balance: initial_balance,
            ask_balance: None,
            volume: Decimal::ZERO,
            notional: Decimal::ZERO,
            fills: 0,
            iterations: 0,
        }
    }

    /// Side of the next order.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Local estimate of the balance available to the bid leg.
    pub fn bid_balance(&self) -> Decimal {
        self.bid_balance
    }

    /// Executed quantity of the last bid fill, sold back on the ask leg.
    pub fn ask_balance(&self) -> Option<Decimal> {
        self.ask_balance
    }

    /// Cumulative base quantity traded.
    pub fn volume(&self) -> Decimal {
        self.volume
    }

    /// Cumulative quote value traded.
    pub fn notional(&self) -> Decimal {
        self.notional
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Count a new attempt and return its 1-based number.
    pub fn begin_iteration(&mut self) -> u64 {
        self.iterations += 1;
        self.iterations
    }

    /// Quantity for the current leg. The bid leg draws from the randomized
    /// balance; the ask leg reuses the previous fill exactly.
    pub fn leg_quantity<R>(&self, level: RandomizationLevel, rng: &mut R) -> Result<Decimal>
    where
        R: Rng + ?Sized,
    {
        let quantity = match self.side {
            Side::Bid => random_quantity(self.bid_balance, level, rng),
            Side::Ask => self.ask_balance.ok_or_else(|| {
                Error::InvalidArgument("ask leg has no preceding bid fill".to_string())
            })?,
        };
        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "computed {} quantity is {quantity}, balance {}",
                self.side, self.bid_balance
            )));
        }
        Ok(quantity)
    }

    /// Apply a filled order for the current side and move to the other side.
    pub fn record_fill(&mut self, executed: Decimal, quote: Decimal) {
        let executed = executed.max(Decimal::ZERO);
        match self.side {
            Side::Bid => self.ask_balance = Some(executed),
            Side::Ask => {
                self.ask_balance = None;
                self.bid_balance = (self.bid_balance * BALANCE_DECAY).round_dp(BALANCE_DP);
            }
        }
        self.volume += executed;
        self.notional += quote.max(Decimal::ZERO);
        self.fills += 1;
        self.side = self.side.opposite();
    }
}
