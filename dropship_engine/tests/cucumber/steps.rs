use std::str::FromStr;

use chrono::Duration;
use cucumber::{then, when};
use dropship_engine::{
    db_types::{Money, OrderStatusType, WithdrawalStatus},
    order_objects::OrderQueryFilter,
    test_utils::seed,
    traits::WithdrawalDecision,
    OrderManagement,
};

use crate::cucumber::DropshipWorld;

fn money(s: &str) -> Money {
    Money::from_str(s).unwrap_or_else(|e| panic!("{s} is not a valid amount: {e}"))
}

#[when(expr = "user {int} adds {int} {string} to their cart")]
async fn add_to_cart(world: &mut DropshipWorld, user_id: i64, quantity: i64, name: String) {
    let item = world.item(&name);
    let result = world.system().carts.add_line(user_id, item, quantity).await;
    world.record(result);
}

#[when(expr = "user {int} checks out")]
async fn checkout(world: &mut DropshipWorld, user_id: i64) {
    let result = world.system().order_flow.checkout(user_id).await;
    if let Some(checkout) = world.record(result) {
        world.last_order_id = Some(checkout.order_id);
        world.user_orders.insert(user_id, checkout.order_id);
    }
}

#[when(expr = "user {int} tops up {word}")]
async fn top_up(world: &mut DropshipWorld, user_id: i64, amount: String) {
    let result = world.system().wallets.top_up(user_id, money(&amount), None).await;
    world.record(result);
}

#[when(expr = "user {int} pays for the order")]
async fn pay_order(world: &mut DropshipWorld, user_id: i64) {
    let order_id = world.order_id();
    let result = world.system().order_flow.pay_order(user_id, order_id).await;
    world.record(result);
}

#[when(expr = "user {int} pays for their order")]
async fn pay_own_order(world: &mut DropshipWorld, user_id: i64) {
    let order_id = *world.user_orders.get(&user_id).expect("The user has not checked out");
    let result = world.system().order_flow.pay_order(user_id, order_id).await;
    world.record(result);
}

#[when(expr = "the price of {string} changes to {word}")]
async fn change_price(world: &mut DropshipWorld, name: String, price: String) {
    let item = world.item(&name);
    seed::set_price(&world.system().db, item, money(&price)).await;
}

#[when(expr = "the order is {int} hours old")]
async fn age_order(world: &mut DropshipWorld, hours: i64) {
    let order_id = world.order_id();
    seed::age_order(&world.system().db, order_id, hours).await;
}

#[when("the overdue order sweep runs")]
async fn sweep(world: &mut DropshipWorld) {
    let result =
        world.system().order_flow.expire_overdue_orders(Duration::hours(24), Some(Duration::hours(336))).await;
    world.record(result);
}

#[when(expr = "supplier {int} ships the order with tracking reference {string}")]
async fn ship_order(world: &mut DropshipWorld, supplier_id: i64, tracking_ref: String) {
    let order_id = world.order_id();
    let result = world.system().order_flow.ship_order(supplier_id, order_id, &tracking_ref).await;
    world.record(result);
}

#[when(expr = "user {int} confirms receipt of the order")]
async fn complete_order(world: &mut DropshipWorld, user_id: i64) {
    let order_id = world.order_id();
    let result = world.system().order_flow.complete_order(user_id, order_id).await;
    world.record(result);
}

#[when(expr = "supplier {int} requests a withdrawal of {word} to {string}")]
async fn request_withdrawal(world: &mut DropshipWorld, supplier_id: i64, amount: String, bank: String) {
    let result = world.system().wallets.request_withdrawal(supplier_id, money(&amount), &bank).await;
    if let Some(request) = world.record(result) {
        world.last_withdrawal_id = Some(request.id);
    }
}

#[when("the manager approves the withdrawal")]
async fn approve_withdrawal(world: &mut DropshipWorld) {
    let id = world.last_withdrawal_id.expect("No withdrawal has been requested");
    let result = world.system().wallets.process_withdrawal(id, WithdrawalDecision::Approve).await;
    world.record(result);
}

#[when(expr = "the manager rejects the withdrawal because {string}")]
async fn reject_withdrawal(world: &mut DropshipWorld, reason: String) {
    let id = world.last_withdrawal_id.expect("No withdrawal has been requested");
    let result = world.system().wallets.process_withdrawal(id, WithdrawalDecision::Reject { reason }).await;
    world.record(result);
}

#[then(expr = "the order is {word}")]
async fn order_status(world: &mut DropshipWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Invalid order status");
    let order_id = world.order_id();
    let orders = world.system().db.search_orders(OrderQueryFilter::default()).await.expect("Error fetching orders");
    let order = orders.into_iter().find(|o| o.id == order_id).expect("Order does not exist");
    assert_eq!(order.status, expected);
}

#[then(expr = "the order total is {word}")]
async fn order_total(world: &mut DropshipWorld, total: String) {
    let order_id = world.order_id();
    let orders = world.system().db.search_orders(OrderQueryFilter::default()).await.expect("Error fetching orders");
    let order = orders.into_iter().find(|o| o.id == order_id).expect("Order does not exist");
    assert_eq!(order.total, money(&total));
}

#[then(expr = "the balance of user {int} is {word}")]
async fn balance(world: &mut DropshipWorld, user_id: i64, amount: String) {
    let balance = world.system().wallets.verify_balance(user_id).await.expect("Error verifying balance");
    assert_eq!(balance, money(&amount));
}

#[then(expr = "{string} has {int} in stock")]
async fn stock(world: &mut DropshipWorld, name: String, expected: i64) {
    let item = world.item(&name);
    let stock = seed::stock_of(&world.system().db, item).await;
    assert_eq!(stock, expected);
}

#[then(expr = "the cart of user {int} has {int} lines")]
async fn cart_lines(world: &mut DropshipWorld, user_id: i64, expected: usize) {
    let cart = world.system().carts.cart(user_id).await.expect("Error fetching cart");
    assert_eq!(cart.lines.len(), expected);
}

#[then(expr = "the cart of user {int} is empty")]
async fn cart_empty(world: &mut DropshipWorld, user_id: i64) {
    let cart = world.system().carts.cart(user_id).await.expect("Error fetching cart");
    assert!(cart.is_empty(), "Cart has {} lines", cart.lines.len());
}

#[then(expr = "user {int} has {int} orders")]
async fn order_count(world: &mut DropshipWorld, user_id: i64, expected: usize) {
    let orders = world.system().accounts.orders(user_id).await.expect("Error fetching orders");
    assert_eq!(orders.len(), expected);
}

#[then(expr = "the last action fails with {string}")]
async fn last_error(world: &mut DropshipWorld, expected: String) {
    let err = world.last_error.as_deref().expect("The last action did not fail");
    assert!(err.contains(&expected), "Expected an error containing '{expected}', but got '{err}'");
}

#[then("the last action succeeds")]
async fn last_success(world: &mut DropshipWorld) {
    assert!(world.last_error.is_none(), "The last action failed: {:?}", world.last_error);
}

#[then(expr = "supplier {int} has {word} pending and {word} available")]
async fn supplier_wallet(world: &mut DropshipWorld, supplier_id: i64, pending: String, available: String) {
    let wallet = world.system().wallets.supplier_wallet(supplier_id).await.expect("Error fetching supplier wallet");
    assert_eq!(wallet.pending, money(&pending), "pending");
    assert_eq!(wallet.available, money(&available), "available");
}

#[then(expr = "the withdrawal of supplier {int} is {word}")]
async fn withdrawal_status(world: &mut DropshipWorld, supplier_id: i64, status: String) {
    let expected = match status.as_str() {
        "pending" => WithdrawalStatus::Pending,
        "approved" => WithdrawalStatus::Approved,
        "rejected" => WithdrawalStatus::Rejected,
        s => panic!("Unknown withdrawal status {s}"),
    };
    let id = world.last_withdrawal_id.expect("No withdrawal has been requested");
    let wallet = world.system().wallets.supplier_wallet(supplier_id).await.expect("Error fetching supplier wallet");
    let request = wallet.withdrawals.iter().find(|w| w.id == id).expect("Withdrawal request does not exist");
    assert_eq!(request.status, expected);
}
