use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use dropship_engine::{
    db_types::{CartLine, CartLineView, ItemRef, Money},
    traits::CartApiError,
    CartApi,
};
use serde_json::json;

use super::{
    helpers::{as_user, json, send_request},
    mocks::MockCartManager,
};
use crate::routes::{AddToCartRoute, CartViewRoute, RemoveFromCartRoute, UpdateCartRoute};

#[actix_web::test]
async fn fetch_cart_without_identity() {
    let (status, body) = send_request(TestRequest::get().uri("/cart"), configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. The x-dsp-user-id header is missing."}"#);
}

#[actix_web::test]
async fn suppliers_do_not_have_carts() {
    let req = as_user(TestRequest::get().uri("/cart"), 5, "supplier");
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Insufficient Permissions. The dropshipper role is required."}"#);
}

#[actix_web::test]
async fn fetch_cart() {
    let mut carts = MockCartManager::new();
    carts.expect_fetch_cart().withf(|user_id| *user_id == 1).returning(|_| {
        Ok(vec![
            line_view(10, None, "Widget", 1_250, 2),
            line_view(11, Some(3), "Gadget", 500, 1),
        ])
    });
    let req = as_user(TestRequest::get().uri("/cart"), 1, "dropshipper");
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["user_id"], 1);
    assert_eq!(cart["subtotal"], 3_000);
    assert_eq!(cart["lines"][0]["line_total"], 2_500);
    assert_eq!(cart["lines"][1]["variant_id"], 3);
}

#[actix_web::test]
async fn add_to_cart() {
    let mut carts = MockCartManager::new();
    carts
        .expect_add_to_cart()
        .withf(|user_id, item, qty| *user_id == 1 && *item == ItemRef::variant(10, 2) && *qty == 3)
        .returning(|_, item, qty| Ok(cart_line(item, qty)));
    let req = as_user(TestRequest::post().uri("/cart"), 1, "dropshipper")
        .set_json(json!({"product_id": 10, "variant_id": 2, "quantity": 3}));
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["quantity"], 3);
}

#[actix_web::test]
async fn add_zero_items_to_cart() {
    // The backend is never reached, so the mock has no expectations
    let req = as_user(TestRequest::post().uri("/cart"), 1, "dropshipper")
        .set_json(json!({"product_id": 10, "quantity": 0}));
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Quantity must be a positive number, not 0"}"#);
}

#[actix_web::test]
async fn add_more_than_is_in_stock() {
    let mut carts = MockCartManager::new();
    carts.expect_add_to_cart().returning(|_, item, qty| {
        Err(CartApiError::InsufficientStock { item, requested: qty, available: 2 })
    });
    let req = as_user(TestRequest::post().uri("/cart"), 1, "dropshipper")
        .set_json(json!({"product_id": 10, "quantity": 5}));
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Insufficient stock for product #10: requested 5, available 2"}"#);
}

#[actix_web::test]
async fn malformed_cart_body() {
    let req = as_user(TestRequest::post().uri("/cart"), 1, "dropshipper").set_json(json!({"quantity": 1}));
    let (status, body) = send_request(req, configure(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"), "was: {body}");
}

#[actix_web::test]
async fn set_quantity_to_zero_removes_the_line() {
    let mut carts = MockCartManager::new();
    carts
        .expect_set_cart_quantity()
        .withf(|_, item, qty| *item == ItemRef::product(10) && *qty == 0)
        .returning(|_, _, _| Ok(None));
    carts.expect_fetch_cart().returning(|_| Ok(vec![]));
    let req = as_user(TestRequest::patch().uri("/cart"), 1, "dropshipper")
        .set_json(json!({"product_id": 10, "quantity": 0}));
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(cart["subtotal"], 0);
}

#[actix_web::test]
async fn remove_a_line_that_is_not_there() {
    let mut carts = MockCartManager::new();
    carts.expect_remove_from_cart().returning(|_, _| Ok(false));
    let req = as_user(TestRequest::delete().uri("/cart"), 1, "dropshipper").set_json(json!({"product_id": 10}));
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"product #10 is not in the cart"}"#);
}

#[actix_web::test]
async fn remove_a_line() {
    let mut carts = MockCartManager::new();
    carts.expect_remove_from_cart().returning(|_, _| Ok(true));
    let req = as_user(TestRequest::delete().uri("/cart"), 1, "dropshipper")
        .set_json(json!({"product_id": 10, "variant_id": 4}));
    let (status, body) = send_request(req, configure(carts)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);
}

fn configure(carts: MockCartManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CartApi::new(carts)))
            .service(CartViewRoute::<MockCartManager>::new())
            .service(AddToCartRoute::<MockCartManager>::new())
            .service(UpdateCartRoute::<MockCartManager>::new())
            .service(RemoveFromCartRoute::<MockCartManager>::new());
    }
}

fn line_view(product_id: i64, variant_id: Option<i64>, name: &str, cents: i64, quantity: i64) -> CartLineView {
    CartLineView {
        product_id,
        variant_id,
        name: name.to_string(),
        variant_name: variant_id.map(|v| format!("Variant {v}")),
        sku: format!("SKU-{product_id}"),
        price: Money::from_cents(cents),
        stock_quantity: 10,
        quantity,
    }
}

fn cart_line(item: ItemRef, quantity: i64) -> CartLine {
    CartLine {
        id: 1,
        cart_id: 1,
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
