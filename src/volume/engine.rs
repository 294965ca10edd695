use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use super::{
    config::VolumeConfig, randomization::random_sleep, state::LoopState, venue::OrderVenue,
};
use crate::{
    backpack_client::{Error, OrderRequest, Result},
    trading_helpers::{
        best_ask, best_bid, calculate_mid_price, calculate_notional, calculate_spread_percentage,
        crossing_price, format_currency,
    },
    types::{OrderId, Side},
};

/// Why a loop returned without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    IterationLimit,
}

/// Summary handed back when the loop stops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopReport {
    pub iterations: u64,
    pub fills: u64,
    pub volume: Decimal,
    pub notional: Decimal,
    pub bid_balance: Decimal,
    pub next_side: Side,
    pub stop: StopReason,
}

/// Alternating buy/sell loop that crosses the spread on every leg.
///
/// Each iteration fetches fresh depth, prices the order at the best opposing
/// level and submits a limit order. A fill flips the side; a non-fill is
/// cancelled and the same side retried with backoff until
/// `max_unfilled_retries` is exhausted. Shutdown is checked while waiting on
/// depth, backoff and pacing; placement and cancel calls always complete.
pub struct VolumeLoop<V, R = StdRng> {
    venue: V,
    config: VolumeConfig,
    state: LoopState,
    rng: R,
    shutdown: CancellationToken,
    outstanding: Option<OrderId>,
}

impl<V> VolumeLoop<V, StdRng>
where
    V: OrderVenue,
{
    pub fn new(venue: V, config: VolumeConfig, shutdown: CancellationToken) -> Self {
        Self::with_rng(venue, config, shutdown, StdRng::from_entropy())
    }
}

impl<V, R> VolumeLoop<V, R>
where
    V: OrderVenue,
    R: Rng,
{
    pub fn with_rng(venue: V, config: VolumeConfig, shutdown: CancellationToken, rng: R) -> Self {
        let state = LoopState::new(config.initial_balance);
        Self {
            venue,
            config,
            state,
            rng,
            shutdown,
            outstanding: None,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Run until shutdown, the iteration limit or a fatal error.
    pub async fn run(mut self) -> Result<LoopReport> {
        self.config.validate()?;
        tracing::info!(
            symbol = %self.config.symbol,
            balance = %self.config.initial_balance,
            level = %self.config.level,
            max_unfilled_retries = self.config.max_unfilled_retries,
            "starting volume loop"
        );

        let outcome = self.drive().await;
        self.cancel_outstanding().await;

        match outcome {
            Ok(stop) => {
                let report = self.report(stop);
                tracing::info!(
                    iterations = report.iterations,
                    fills = report.fills,
                    volume = %report.volume,
                    notional = %format_currency(report.notional),
                    stop = ?report.stop,
                    "volume loop stopped"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    iterations = self.state.iterations(),
                    fills = self.state.fills(),
                    volume = %self.state.volume(),
                    "volume loop failed"
                );
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<StopReason> {
        let mut misses: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(StopReason::Shutdown);
            }
            if let Some(max) = self.config.max_iterations {
                if self.state.iterations() >= max {
                    return Ok(StopReason::IterationLimit);
                }
            }

            let iteration = self.state.begin_iteration();
            let side = self.state.side();

            let depth = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(StopReason::Shutdown),
                depth = self.venue.depth(&self.config.symbol) => depth?,
            };

            let Some(price) = crossing_price(&depth, side) else {
                misses += 1;
                let err = Error::EmptyBook {
                    symbol: self.config.symbol.clone(),
                    side: side.opposite(),
                };
                if misses > self.config.max_unfilled_retries {
                    return Err(err);
                }
                tracing::warn!(iteration, attempt = misses, "#{iteration} {err}, retrying");
                if !self.backoff(misses).await {
                    return Ok(StopReason::Shutdown);
                }
                continue;
            };

            if let (Some(bid), Some(ask)) = (best_bid(&depth), best_ask(&depth)) {
                if let Some(spread_pct) = calculate_spread_percentage(bid, ask) {
                    tracing::debug!(
                        %bid,
                        %ask,
                        mid = %calculate_mid_price(bid, ask),
                        %spread_pct,
                        "#{iteration} book"
                    );
                }
            }

            let quantity = self.state.leg_quantity(self.config.level, &mut self.rng)?;
            let request = OrderRequest::limit(side, self.config.symbol.clone(), price, quantity)
                .auto_borrow(false)
                .auto_borrow_repay(false)
                .auto_lend(false)
                .auto_lend_redeem(true)
                .post_only(false);
            let order = self.venue.place_order(&request).await?;

            let filled = if order.is_filled() {
                let executed = order.executed_quantity();
                let quote = match order.executed_quote_quantity() {
                    quote if quote.is_zero() => calculate_notional(executed, price),
                    quote => quote,
                };
                Some((executed, quote))
            } else if order.status().is_open() {
                self.outstanding = Some(order.id().clone());
                match self.venue.cancel_order(&self.config.symbol, order.id()).await {
                    Ok(_) => {
                        self.outstanding = None;
                        None
                    }
                    Err(err) => {
                        // A rejected cancel is fatal unless the order filled meanwhile.
                        let settled = self.settled_fill(order.id(), quantity).await.ok_or(err)?;
                        self.outstanding = None;
                        Some(settled)
                    }
                }
            } else {
                None
            };

            if let Some((executed, quote)) = filled {
                misses = 0;
                self.state.record_fill(executed, quote);
                tracing::info!(
                    total_notional = %format_currency(self.state.notional()),
                    "#{iteration} {side} {executed} at {price} | total volume {}",
                    self.state.volume()
                );

                let pause = random_sleep(self.config.level, &mut self.rng);
                if !pause.is_zero() {
                    tracing::debug!(secs = pause.as_secs_f64(), "sleeping");
                    if !self.sleep(pause).await {
                        return Ok(StopReason::Shutdown);
                    }
                }
                continue;
            }

            let status = order.status();
            misses += 1;
            if misses > self.config.max_unfilled_retries {
                return Err(Error::OrderNotFilled {
                    order_id: order.id().clone(),
                    status,
                    attempts: misses,
                });
            }
            tracing::warn!(
                iteration,
                order_id = %order.id(),
                %status,
                attempt = misses,
                "#{iteration} order not filled, cancelled and retrying {side}"
            );
            if !self.backoff(misses).await {
                return Ok(StopReason::Shutdown);
            }
        }
    }

    /// Sleep unless shut down first. Returns `false` on shutdown.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    async fn backoff(&self, attempt: u32) -> bool {
        self.sleep(self.config.backoff.delay(attempt)).await
    }

    /// Fills that completed `order_id` after its cancel was rejected. `None`
    /// unless the recorded fills cover the full `quantity`.
    async fn settled_fill(
        &self,
        order_id: &OrderId,
        quantity: Decimal,
    ) -> Option<(Decimal, Decimal)> {
        let fills = match self.venue.order_fills(&self.config.symbol, order_id).await {
            Ok(fills) => fills,
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "failed to look up fills after rejected cancel");
                return None;
            }
        };
        let executed: Decimal = fills.iter().map(|fill| fill.quantity).sum();
        if executed < quantity {
            return None;
        }
        let quote: Decimal = fills
            .iter()
            .map(|fill| calculate_notional(fill.quantity, fill.price))
            .sum();
        tracing::info!(%order_id, %executed, "order filled before its cancel landed");
        Some((executed, quote))
    }

    async fn cancel_outstanding(&mut self) {
        let Some(order_id) = self.outstanding.take() else {
            return;
        };
        match self.venue.cancel_order(&self.config.symbol, &order_id).await {
            Ok(order) => tracing::info!(
                order_id = %order_id,
                status = %order.status(),
                "cancelled outstanding order"
            ),
            Err(err) => tracing::warn!(
                order_id = %order_id,
                error = %err,
                "failed to cancel outstanding order"
            ),
        }
    }

    fn report(&self, stop: StopReason) -> LoopReport {
        LoopReport {
            iterations: self.state.iterations(),
            fills: self.state.fills(),
            volume: self.state.volume(),
            notional: self.state.notional(),
            bid_balance: self.state.bid_balance(),
            next_side: self.state.side(),
            stop,
        }
    }
}
