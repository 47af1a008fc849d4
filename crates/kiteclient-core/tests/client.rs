use httpmock::prelude::*;
use kiteclient_core::models::{
    Exchange, MarginSegment, ModifyOrderParams, OrderType, PlaceOrderParams, Product,
    TransactionType, Variety,
};
use kiteclient_core::{ApiError, KiteClient, SessionToken};
use serde_json::json;

fn client(server: &MockServer) -> KiteClient {
    let token = SessionToken::new("TOK123").unwrap();
    KiteClient::with_base_url(token, server.url("/oms")).unwrap()
}

#[tokio::test]
async fn test_quote_sends_token_and_instruments() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/oms/quote")
                .header("authorization", "enctoken TOK123")
                .query_param("i", "NSE:RELIANCE");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"NSE:RELIANCE": {"instrument_token": 738561, "last_price": 2200.0, "volume": 100}}
            }));
        })
        .await;

    let quotes = client(&server).quote(["NSE:RELIANCE"]).await.unwrap();

    mock.assert_async().await;
    let reliance = &quotes["NSE:RELIANCE"];
    assert_eq!(reliance.last_price, 2200.0);
    assert_eq!(reliance.volume, 100);
}

#[tokio::test]
async fn test_ltp() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/quote/ltp");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"NSE:INFY": {"instrument_token": 408065, "last_price": 1412.95}}
            }));
        })
        .await;

    let prices = client(&server).ltp(vec!["NSE:INFY".to_string()]).await.unwrap();
    assert_eq!(prices["NSE:INFY"].last_price, 1412.95);
}

#[tokio::test]
async fn test_profile() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/user/profile");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"user_id": "12345", "user_name": "Test User"}
            }));
        })
        .await;

    let profile = client(&server).profile().await.unwrap();
    assert_eq!(profile.user_id, "12345");
    assert_eq!(profile.user_name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn test_margins_all_and_by_segment() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/user/margins");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"equity": {"enabled": true, "net": 100000.0}, "commodity": {"enabled": true, "net": 50000.0}}
            }));
        })
        .await;
    let segment = server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/user/margins/commodity");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"enabled": true, "net": 50000.0}
            }));
        })
        .await;

    let api = client(&server);
    let all = api.margins().await.unwrap();
    assert_eq!(all["equity"].net, 100000.0);
    assert_eq!(all["commodity"].net, 50000.0);

    let commodity = api.segment_margins(MarginSegment::Commodity).await.unwrap();
    assert_eq!(commodity.net, 50000.0);
    segment.assert_async().await;
}

#[tokio::test]
async fn test_orders_empty_book_is_not_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/orders");
            then.status(200).json_body(json!({"status": "success", "data": []}));
        })
        .await;

    let orders = client(&server).orders().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_positions_and_order_history() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/portfolio/positions");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"net": [{"tradingsymbol": "RELIANCE", "quantity": 100}], "day": []}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/orders/151220000000000");
            then.status(200).json_body(json!({
                "status": "success",
                "data": [
                    {"order_id": "151220000000000", "status": "OPEN"},
                    {"order_id": "151220000000000", "status": "COMPLETE"}
                ]
            }));
        })
        .await;

    let api = client(&server);
    let positions = api.positions().await.unwrap();
    assert_eq!(positions.net[0].tradingsymbol, "RELIANCE");
    assert_eq!(positions.net[0].quantity, 100);

    let history = api.order_history("151220000000000").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].status, "COMPLETE");
}

#[tokio::test]
async fn test_place_order_posts_form() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oms/orders/regular")
                .header("authorization", "enctoken TOK123")
                .body_contains("tradingsymbol=INFY")
                .body_contains("transaction_type=BUY")
                .body_contains("order_type=LIMIT")
                .body_contains("price=1500.5");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"order_id": "151220000000000"}
            }));
        })
        .await;

    let params = PlaceOrderParams::new(
        Variety::Regular,
        Exchange::Nse,
        "INFY",
        TransactionType::Buy,
        1,
        Product::Cnc,
        OrderType::Limit,
    )
    .price(1500.5);

    let order_id = client(&server).place_order(&params).await.unwrap();
    assert_eq!(order_id, "151220000000000");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_modify_and_cancel_order() {
    let server = MockServer::start_async().await;
    let modify = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/oms/orders/co/151220000000000")
                .body_contains("trigger_price=99");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"order_id": "151220000000000"}
            }));
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/oms/orders/co/151220000000001")
                .body_contains("parent_order_id=151220000000000");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"order_id": "151220000000001"}
            }));
        })
        .await;

    let api = client(&server);
    let params = ModifyOrderParams::new(Variety::Co, "151220000000000").trigger_price(99.0);
    assert_eq!(api.modify_order(&params).await.unwrap(), "151220000000000");

    let cancelled = api
        .cancel_order(Variety::Co, "151220000000001", Some("151220000000000"))
        .await
        .unwrap();
    assert_eq!(cancelled, "151220000000001");

    modify.assert_async().await;
    cancel.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/user/profile");
            then.status(403).json_body(json!({
                "status": "error",
                "message": "Incorrect `api_key` or `access_token`.",
                "error_type": "TokenException"
            }));
        })
        .await;

    let err = client(&server).profile().await.unwrap_err();
    assert!(err.is_auth_failure(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_missing_data_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/oms/portfolio/positions");
            then.status(200).json_body(json!({"status": "success"}));
        })
        .await;

    let err = client(&server).positions().await.unwrap_err();
    assert!(matches!(err, ApiError::MissingData(ref path) if path == "/portfolio/positions"));
}
