//! Randomization presets for order size and pacing.
//!
//! Each level pairs a range of percentage cuts applied to the bid-side
//! balance with a range of pause lengths between iterations. Level 0 trades
//! the full balance back to back; level 10 is the most irregular.

use std::{fmt, time::Duration};

use rand::Rng;
use rust_decimal::Decimal;

use crate::backpack_client::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    /// Inclusive range of the percentage taken off the balance.
    pub qty_percent: (u32, u32),
    /// Inclusive range of the pause after a fill, in milliseconds.
    pub sleep_ms: (u64, u64),
}

const fn preset(qty: (u32, u32), sleep: (u64, u64)) -> Preset {
    Preset {
        qty_percent: qty,
        sleep_ms: sleep,
    }
}

const PRESETS: [Preset; 11] = [
    preset((0, 0), (0, 0)),
    preset((0, 5), (500, 1000)),
    preset((0, 10), (750, 1250)),
    preset((5, 15), (1000, 1500)),
    preset((5, 20), (1000, 2000)),
    preset((10, 25), (1250, 2250)),
    preset((10, 30), (1500, 2500)),
    preset((15, 35), (1750, 2750)),
    preset((20, 40), (2000, 3000)),
    preset((25, 50), (2250, 3500)),
    preset((40, 90), (3000, 5000)),
];

/// Randomization level in `0..=10`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RandomizationLevel(u8);

impl RandomizationLevel {
    pub const MAX: u8 = 10;

    pub fn new(level: u8) -> Result<Self> {
        if level > Self::MAX {
            return Err(Error::invalid_config(
                "randomization_level",
                format!("must be between 0 and {}, got {level}", Self::MAX),
            ));
        }
        Ok(Self(level))
    }

    /// Clamp any integer into the valid range.
    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(0, i64::from(Self::MAX)) as u8)
    }

    /// Parse operator input leniently: leading whitespace and a sign are
    /// accepted, parsing stops at the first non-digit, anything without
    /// digits is level 0, and the result is clamped.
    pub fn parse_lenient(input: &str) -> Self {
        let input = input.trim_start();
        let (negative, rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() || negative {
            return Self(0);
        }
        // Anything too long for i64 is far above the cap anyway.
        let value = digits.parse::<i64>().unwrap_or(i64::MAX);
        Self::clamped(value)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn preset(self) -> &'static Preset {
        &PRESETS[usize::from(self.0)]
    }
}

impl fmt::Display for RandomizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `floor(max * (1 - p / 100))` with `p` drawn uniformly from the level's
/// percentage range.
pub fn random_quantity<R>(max: Decimal, level: RandomizationLevel, rng: &mut R) -> Decimal
where
    R: Rng + ?Sized,
{
    let (lo, hi) = level.preset().qty_percent;
    let percent = rng.gen_range(lo..=hi);
    let reduction = Decimal::new(i64::from(percent), 2);
    (max * (Decimal::ONE - reduction)).floor()
}

/// Pause drawn uniformly from the level's sleep range. Level 0 never sleeps.
pub fn random_sleep<R>(level: RandomizationLevel, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let (lo, hi) = level.preset().sleep_ms;
    if hi == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(lo..=hi))
}
