use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use dropship_engine::{
    db_types::{ItemRef, Money, OrderLineDetail, OrderStatusType},
    events::EventProducers,
    traits::{AccountApiError, OrderFlowError},
    AccountApi,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{as_user, json, order, send_request},
    mocks::{MockFulfillmentManager, MockOrderManager},
};
use crate::routes::{CheckoutRoute, CompleteOrderRoute, MyOrdersRoute, OrderByIdRoute, PayOrderRoute, ShipOrderRoute};

#[actix_web::test]
async fn checkout_pays_when_funds_allow() {
    let mut db = MockFulfillmentManager::new();
    db.expect_checkout()
        .withf(|user_id| *user_id == 1)
        .returning(|_| Ok(order(7, 1, OrderStatusType::Processing, 3_000)));
    let req = as_user(TestRequest::post().uri("/checkout"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_flow(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"order_id":7,"status":"processing","total":3000}"#);
}

#[actix_web::test]
async fn checkout_places_a_hold_when_funds_are_short() {
    let mut db = MockFulfillmentManager::new();
    db.expect_checkout().returning(|_| Ok(order(8, 1, OrderStatusType::OnHold, 8_000)));
    let req = as_user(TestRequest::post().uri("/checkout"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_flow(db)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json(&body)["status"], "on-hold");
}

#[actix_web::test]
async fn checkout_failures() {
    let cases = vec![
        (OrderFlowError::EmptyCart, StatusCode::BAD_REQUEST, "The cart is empty"),
        (
            OrderFlowError::InsufficientStock { item: ItemRef::product(3), requested: 4, available: 1 },
            StatusCode::CONFLICT,
            "Insufficient stock for product #3: requested 4, available 1",
        ),
        (
            OrderFlowError::Conflict("database is locked".into()),
            StatusCode::SERVICE_UNAVAILABLE,
            "The order is busy. Try again: database is locked",
        ),
        (
            OrderFlowError::DatabaseError("near \"SELEC\": syntax error".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred. Please try again later.",
        ),
    ];
    for (err, expected_status, expected_msg) in cases {
        let mut db = MockFulfillmentManager::new();
        db.expect_checkout().return_once(move |_| Err(err));
        let req = as_user(TestRequest::post().uri("/checkout"), 1, "dropshipper");
        let (status, body) = send_request(req, configure_flow(db)).await;
        assert_eq!(status, expected_status);
        assert_eq!(json(&body), json!({ "error": expected_msg }));
    }
}

#[actix_web::test]
async fn pay_for_a_hold() {
    let mut db = MockFulfillmentManager::new();
    db.expect_pay_on_hold_order()
        .withf(|user_id, order_id| *user_id == 1 && *order_id == 8)
        .returning(|_, _| Ok(order(8, 1, OrderStatusType::Processing, 8_000)));
    let req = as_user(TestRequest::post().uri("/orders/8/pay"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_flow(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"order_id":8,"status":"processing"}"#);
}

#[actix_web::test]
async fn pay_failures() {
    let cases = vec![
        (OrderFlowError::OrderNotFound(8), StatusCode::NOT_FOUND),
        (OrderFlowError::InvalidState { order_id: 8, status: OrderStatusType::Processing }, StatusCode::CONFLICT),
        (
            OrderFlowError::InsufficientFunds { required: Money::from_cents(8_000), available: Money::from_cents(10) },
            StatusCode::PAYMENT_REQUIRED,
        ),
        (
            OrderFlowError::OutOfStock { item: ItemRef::variant(3, 1), requested: 2, available: 0 },
            StatusCode::CONFLICT,
        ),
    ];
    for (err, expected_status) in cases {
        let mut db = MockFulfillmentManager::new();
        db.expect_pay_on_hold_order().return_once(move |_, _| Err(err));
        let req = as_user(TestRequest::post().uri("/orders/8/pay"), 1, "dropshipper");
        let (status, _) = send_request(req, configure_flow(db)).await;
        assert_eq!(status, expected_status);
    }
}

#[actix_web::test]
async fn order_ids_must_be_numbers() {
    let req = as_user(TestRequest::post().uri("/orders/abc/pay"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_flow(MockFulfillmentManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Invalid request path"), "was: {body}");
}

#[actix_web::test]
async fn complete_order_as_buyer() {
    let mut db = MockFulfillmentManager::new();
    db.expect_complete_order()
        .withf(|order_id, buyer| *order_id == 8 && *buyer == Some(1))
        .returning(|_, _| Ok((order(8, 1, OrderStatusType::Completed, 8_000), vec![])));
    let req = as_user(TestRequest::post().uri("/orders/8/complete"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_flow(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["order"]["status"], "completed");
    assert_eq!(body["payouts"], json!([]));
}

#[actix_web::test]
async fn ship_requires_the_supplier_role() {
    let req = as_user(TestRequest::post().uri("/supplier/orders/8/ship"), 1, "dropshipper")
        .set_json(json!({"tracking_ref": "TRK-1"}));
    let (status, _) = send_request(req, configure_flow(MockFulfillmentManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn ship_an_order() {
    let mut db = MockFulfillmentManager::new();
    db.expect_ship_order()
        .withf(|supplier, order_id, tracking| *supplier == 100 && *order_id == 8 && tracking.to_string() == "TRK-1")
        .returning(|_, _, tracking| {
            let mut shipped = order(8, 1, OrderStatusType::Shipped, 8_000);
            shipped.tracking_ref = Some(tracking.to_string());
            Ok(shipped)
        });
    let req = as_user(TestRequest::post().uri("/supplier/orders/8/ship"), 100, "supplier")
        .set_json(json!({"tracking_ref": " TRK-1 "}));
    let (status, body) = send_request(req, configure_flow(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["tracking_ref"], "TRK-1");
}

#[actix_web::test]
async fn ship_without_tracking_ref() {
    let req = as_user(TestRequest::post().uri("/supplier/orders/8/ship"), 100, "supplier")
        .set_json(json!({"tracking_ref": "  "}));
    let (status, body) = send_request(req, configure_flow(MockFulfillmentManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"A tracking reference is required to ship an order"}"#);
}

#[actix_web::test]
async fn fetch_my_orders_with_any_role() {
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_user().withf(|user_id| *user_id == 100).returning(|_| {
        Ok(vec![order(9, 100, OrderStatusType::Shipped, 500), order(4, 100, OrderStatusType::Cancelled, 200)])
    });
    let req = as_user(TestRequest::get().uri("/orders"), 100, "");
    let (status, body) = send_request(req, configure_accounts(db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    assert_eq!(orders.as_array().unwrap().len(), 2);
    assert_eq!(orders[0]["id"], 9);
    assert_eq!(orders[1]["status"], "cancelled");
}

#[actix_web::test]
async fn fetch_my_orders_anonymously() {
    let (status, _) = send_request(TestRequest::get().uri("/orders"), configure_accounts(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_order_detail() {
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_user()
        .withf(|user_id, order_id| *user_id == 1 && *order_id == 8)
        .returning(|_, _| Ok(Some(order(8, 1, OrderStatusType::OnHold, 2_500))));
    db.expect_fetch_order_lines().withf(|order_id| *order_id == 8).returning(|_| {
        Ok(vec![OrderLineDetail {
            id: 1,
            product_id: 3,
            variant_id: None,
            name: "Widget".to_string(),
            sku: "W-1".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1_250),
        }])
    });
    let req = as_user(TestRequest::get().uri("/orders/8"), 1, "dropshipper");
    let (status, body) = send_request(req, configure_accounts(db)).await;
    assert_eq!(status, StatusCode::OK);
    let detail = json(&body);
    assert_eq!(detail["order"]["total"], 2_500);
    assert_eq!(detail["lines"][0]["unit_price"], 1_250);
}

#[actix_web::test]
async fn other_users_orders_are_not_found() {
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_user().returning(|_, _| Ok(None));
    let req = as_user(TestRequest::get().uri("/orders/8"), 2, "dropshipper");
    let (status, body) = send_request(req, configure_accounts(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Order #8 does not exist"}"#);
}

#[actix_web::test]
async fn order_lookup_when_database_is_busy() {
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_user().returning(|_| Err(AccountApiError::Conflict("database is locked".into())));
    let req = as_user(TestRequest::get().uri("/orders"), 1, "dropshipper");
    let (status, _) = send_request(req, configure_accounts(db)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

fn configure_flow(db: MockFulfillmentManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .service(CheckoutRoute::<MockFulfillmentManager>::new())
            .service(PayOrderRoute::<MockFulfillmentManager>::new())
            .service(CompleteOrderRoute::<MockFulfillmentManager>::new())
            .service(ShipOrderRoute::<MockFulfillmentManager>::new());
    }
}

fn configure_accounts(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(AccountApi::new(db)))
            .service(MyOrdersRoute::<MockOrderManager>::new())
            .service(OrderByIdRoute::<MockOrderManager>::new());
    }
}
