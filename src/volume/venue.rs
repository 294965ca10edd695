use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    backpack_client::{BackpackClient, FillHistoryQuery, OrderRequest, Result},
    models::{Depth, FillHistory, Order},
    types::{OrderId, Symbol},
};

/// Exchange operations the volume loop depends on.
#[async_trait]
pub trait OrderVenue: Send + Sync {
    async fn depth(&self, symbol: &Symbol) -> Result<Depth>;

    async fn place_order(&self, request: &OrderRequest) -> Result<Order>;

    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order>;

    /// Fills recorded against one order.
    async fn order_fills(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Vec<FillHistory>>;
}

#[async_trait]
impl OrderVenue for BackpackClient {
    async fn depth(&self, symbol: &Symbol) -> Result<Depth> {
        self.get_depth(symbol).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order> {
        self.orders().execute(request).await
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order> {
        self.orders().cancel(symbol, Some(order_id), None).await
    }

    async fn order_fills(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Vec<FillHistory>> {
        let query = FillHistoryQuery::default()
            .symbol(symbol.clone())
            .order_id(order_id.clone());
        self.account().fill_history(&query).await
    }
}

#[async_trait]
impl<T> OrderVenue for Arc<T>
where
    T: OrderVenue + ?Sized,
{
    async fn depth(&self, symbol: &Symbol) -> Result<Depth> {
        (**self).depth(symbol).await
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<Order> {
        (**self).place_order(request).await
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Order> {
        (**self).cancel_order(symbol, order_id).await
    }

    async fn order_fills(&self, symbol: &Symbol, order_id: &OrderId) -> Result<Vec<FillHistory>> {
        (**self).order_fills(symbol, order_id).await
    }
}
