use base64::{engine::general_purpose::STANDARD, Engine as _};
use httpmock::{
    Method::{DELETE, GET, POST},
    MockServer,
};
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use backpack_client::{
    backpack_client::{
        sign_request, FillHistoryQuery, OpenOrdersQuery, RequestParams, RewardsQuery,
    },
    volume::{RandomizationLevel, StopReason, VolumeConfig, VolumeLoop},
    BackpackClient, BackpackError, Credential, OrderId, OrderRequest, OrderVenue, Side, Symbol,
};

const TS: u64 = 1_700_000_000_000;

fn secret_b64() -> String {
    STANDARD.encode([7u8; 32])
}

fn credential() -> Credential {
    Credential::from_base64_secret(&SecretString::from(secret_b64())).unwrap()
}

fn client(server: &MockServer) -> BackpackClient {
    BackpackClient::builder()
        .secret(SecretString::from(secret_b64()))
        .api_url(server.base_url())
        .clock(|| TS)
        .build()
        .unwrap()
}

fn sol() -> Symbol {
    Symbol::new("SOL_USDC").unwrap()
}

fn filled_order(side: &str) -> String {
    json!({
        "orderType": "Limit",
        "id": "111",
        "executedQuantity": "1000",
        "executedQuoteQuantity": "100000",
        "price": "100",
        "quantity": "1000",
        "status": "Filled",
        "side": side,
        "symbol": "SOL_USDC",
        "timeInForce": "GTC"
    })
    .to_string()
}

#[tokio::test]
async fn test_depth_is_unsigned() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/depth")
                .query_param("symbol", "SOL_USDC");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"asks":[["100.50","3"]],"bids":[["99.25","1"]],"lastUpdateId":"7","timestamp":1}"#);
        })
        .await;

    let depth = client(&server).get_depth(&sol()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(depth.asks[0].price.to_string(), "100.50");
    assert_eq!(depth.bids[0].price, dec!(99.25));
}

#[tokio::test]
async fn test_signed_get_carries_header_bundle() {
    let server = MockServer::start_async().await;
    let credential = credential();
    let expected = sign_request(&credential, "balanceQuery", &RequestParams::new(), TS);

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/capital")
                .header("X-API-KEY", credential.public_key_base64())
                .header("X-TIMESTAMP", "1700000000000")
                .header("X-WINDOW", "5000")
                .header("Content-Type", "application/json; charset=utf-8")
                .header("X-SIGNATURE", expected.signature());
            then.status(200)
                .body(r#"{"SOL":{"available":"1.5","locked":"0","staked":"0"}}"#);
        })
        .await;

    let balances = client(&server).account().balances().await.unwrap();

    mock.assert_async().await;
    assert_eq!(balances["SOL"].available, dec!(1.5));
}

#[tokio::test]
async fn test_fill_history_defaults_in_query() {
    let server = MockServer::start_async().await;
    let expected = sign_request(
        &credential(),
        "fillHistoryQueryAll",
        &RequestParams::new()
            .with("marketType", "SPOT")
            .with("limit", 100i64)
            .with("offset", 0i64),
        TS,
    );

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/wapi/v1/history/fills")
                .query_param("marketType", "SPOT")
                .query_param("limit", "100")
                .query_param("offset", "0")
                .header("X-SIGNATURE", expected.signature());
            then.status(200).body("[]");
        })
        .await;

    let fills = client(&server)
        .account()
        .fill_history(&FillHistoryQuery::default())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(fills.is_empty());
}

#[tokio::test]
async fn test_open_orders_without_filters() {
    let server = MockServer::start_async().await;
    let expected = sign_request(&credential(), "orderQueryAll", &RequestParams::new(), TS);

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/orders")
                .header("X-SIGNATURE", expected.signature());
            then.status(200).body(format!("[{}]", filled_order("Bid")));
        })
        .await;

    let orders = client(&server)
        .orders()
        .open(&OpenOrdersQuery::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id().as_str(), "111");
}

#[tokio::test]
async fn test_order_execute_posts_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/order")
                .header_exists("X-SIGNATURE")
                .json_body(json!({
                    "autoBorrow": false,
                    "autoLendRedeem": true,
                    "orderType": "Limit",
                    "price": "100",
                    "quantity": "1000",
                    "side": "Bid",
                    "symbol": "SOL_USDC"
                }));
            then.status(200).body(filled_order("Bid"));
        })
        .await;

    let request = OrderRequest::limit(Side::Bid, sol(), dec!(100), dec!(1000))
        .auto_borrow(false)
        .auto_lend_redeem(true);
    let order = client(&server).orders().execute(&request).await.unwrap();

    mock.assert_async().await;
    assert!(order.is_filled());
    assert_eq!(order.executed_quantity(), dec!(1000));
}

#[tokio::test]
async fn test_cancel_sends_delete_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/v1/order")
                .json_body(json!({"orderId": "111", "symbol": "SOL_USDC"}));
            then.status(200).body(
                json!({
                    "orderType": "Limit",
                    "id": "111",
                    "executedQuantity": "0",
                    "executedQuoteQuantity": "0",
                    "price": "100",
                    "quantity": "1000",
                    "status": "Cancelled",
                    "side": "Bid",
                    "symbol": "SOL_USDC"
                })
                .to_string(),
            );
        })
        .await;

    let order = client(&server)
        .orders()
        .cancel(&sol(), Some(&OrderId::new("111")), None)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(!order.is_filled());
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/order");
            then.status(400)
                .body(r#"{"code":"INVALID_ORDER","message":"Insufficient funds"}"#);
        })
        .await;

    let request = OrderRequest::limit(Side::Bid, sol(), dec!(100), dec!(1000));
    let err = client(&server)
        .orders()
        .execute(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, BackpackError::Request { status: Some(400), .. }));
    assert_eq!(
        err.to_string(),
        "API request failed: Status 400 - Insufficient funds"
    );
}

#[tokio::test]
async fn test_plain_text_error_falls_back_to_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/depth");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let err = client(&server).get_depth(&sol()).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(
        err.to_string(),
        "API request failed: Status 503 - upstream unavailable"
    );
}

#[tokio::test]
async fn test_loop_first_iteration_over_http() {
    let server = MockServer::start_async().await;
    let depth = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/depth")
                .query_param("symbol", "SOL_USDC");
            then.status(200)
                .body(r#"{"asks":[["100","1"]],"bids":[["99","1"]],"lastUpdateId":"1","timestamp":1}"#);
        })
        .await;
    let order = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/order").json_body(json!({
                "autoBorrow": false,
                "autoBorrowRepay": false,
                "autoLend": false,
                "autoLendRedeem": true,
                "orderType": "Limit",
                "postOnly": false,
                "price": "100",
                "quantity": "1000",
                "side": "Bid",
                "symbol": "SOL_USDC"
            }));
            then.status(200).body(filled_order("Bid"));
        })
        .await;

    let mut config = VolumeConfig::new(sol(), dec!(1000), RandomizationLevel::default());
    config.max_iterations = Some(1);
    let report = VolumeLoop::new(client(&server), config, CancellationToken::new())
        .run()
        .await
        .unwrap();

    depth.assert_async().await;
    order.assert_async().await;
    assert_eq!(report.fills, 1);
    assert_eq!(report.volume, dec!(1000));
    assert_eq!(report.next_side, Side::Ask);
    assert_eq!(report.stop, StopReason::IterationLimit);
}

#[tokio::test]
async fn test_cancel_all_targets_orders_collection() {
    let server = MockServer::start_async().await;
    let expected = sign_request(
        &credential(),
        "orderCancelAll",
        &RequestParams::new().with("symbol", "SOL_USDC"),
        TS,
    );
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/api/v1/orders")
                .header("X-SIGNATURE", expected.signature())
                .json_body(json!({"symbol": "SOL_USDC"}));
            then.status(200).body("[]");
        })
        .await;

    let cancelled = client(&server).orders().cancel_all(&sol()).await.unwrap();

    mock.assert_async().await;
    assert!(cancelled.is_empty());
}

#[tokio::test]
async fn test_borrow_lend_positions() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/borrowLend/positions");
            then.status(200).body(
                json!([{
                    "cumulativeInterest": "0.01",
                    "id": "USDC",
                    "imf": "0",
                    "netQuantity": "250",
                    "markPrice": "1",
                    "mmf": "0",
                    "netExposureQuantity": "250",
                    "netExposureNotional": "250",
                    "symbol": "USDC"
                }])
                .to_string(),
            );
        })
        .await;

    let positions = client(&server).borrow_lend().positions().await.unwrap();

    mock.assert_async().await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].net_quantity, dec!(250));
}

#[tokio::test]
async fn test_rewards_defaults_in_query() {
    let server = MockServer::start_async().await;
    let expected = sign_request(
        &credential(),
        "userRewardsQuery",
        &RequestParams::new()
            .with("status", "claimed")
            .with("limit", 100i64)
            .with("offset", 0i64),
        TS,
    );
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/wapi/v1/user/rewards")
                .query_param("status", "claimed")
                .query_param("limit", "100")
                .query_param("offset", "0")
                .header("X-SIGNATURE", expected.signature());
            then.status(200).body(r#"[{"amount":"1.5"}]"#);
        })
        .await;

    let rewards = client(&server)
        .account()
        .rewards(&RewardsQuery::default())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(rewards[0]["amount"], "1.5");
}

#[tokio::test]
async fn test_order_fills_filter_by_order() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/wapi/v1/history/fills")
                .query_param("orderId", "111")
                .query_param("symbol", "SOL_USDC")
                .query_param("marketType", "SPOT");
            then.status(200).body(
                json!([{
                    "fee": "0.01",
                    "feeSymbol": "USDC",
                    "isMaker": false,
                    "orderId": "111",
                    "price": "100",
                    "quantity": "1000",
                    "side": "Bid",
                    "symbol": "SOL_USDC",
                    "timestamp": "2024-01-01T00:00:00"
                }])
                .to_string(),
            );
        })
        .await;

    let fills = OrderVenue::order_fills(&client(&server), &sol(), &OrderId::new("111"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].quantity, dec!(1000));
}

#[tokio::test]
async fn test_depth_for_perp_symbol() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/depth")
                .query_param("symbol", "SOL_USDC_PERP");
            then.status(200)
                .body(r#"{"asks":[["150","2"]],"bids":[["149.9","1"]],"lastUpdateId":"9","timestamp":1}"#);
        })
        .await;

    let perp = Symbol::new("SOL_USDC_PERP").unwrap();
    let depth = client(&server).get_depth(&perp).await.unwrap();

    mock.assert_async().await;
    assert_eq!(depth.asks[0].price, dec!(150));
}
