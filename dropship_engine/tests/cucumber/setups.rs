use std::str::FromStr;

use cucumber::given;
use dropship_engine::{db_types::Money, test_utils::seed};

use crate::cucumber::{world::DropshipSystem, DropshipWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut DropshipWorld) {
    let system = DropshipSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "supplier {int} sells {string} at {word} with {int} in stock")]
async fn supplier_product(world: &mut DropshipWorld, supplier_id: i64, name: String, price: String, stock: i64) {
    let price = Money::from_str(&price).expect("Invalid price");
    let item = seed::add_product(&world.system().db, supplier_id, &name, price, stock).await;
    world.items.insert(name, item);
}

#[given(expr = "user {int} has a balance of {word}")]
async fn funded_wallet(world: &mut DropshipWorld, user_id: i64, amount: String) {
    let amount = Money::from_str(&amount).expect("Invalid amount");
    seed::fund_wallet(&world.system().db, user_id, amount).await;
}

#[given(expr = "user {int} has {int} {string} in their cart")]
async fn cart_with_item(world: &mut DropshipWorld, user_id: i64, quantity: i64, name: String) {
    let item = world.item(&name);
    world.system().carts.add_line(user_id, item, quantity).await.expect("Error adding item to cart");
}
