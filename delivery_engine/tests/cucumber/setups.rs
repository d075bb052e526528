use cucumber::given;

use crate::{
    cucumber::{delivery_world::DeliverySystem, DeliveryWorld},
    support::prepare_env::{backdate_order, customer, set_stock},
};

#[given("a fresh install")]
async fn fresh_database(world: &mut DeliveryWorld) {
    let system = DeliverySystem::new().await;
    world.system = Some(system);
}

#[given(expr = "the stock has {int} {word} at {int} each")]
async fn stock_level(world: &mut DeliveryWorld, quantity: i64, product: String, price: i64) {
    let sys = world.system();
    let item = set_stock(&sys.db, &product, quantity, price).await;
    sys.stock_ids.insert(product, item.id);
}

#[given(expr = "customer {string} with an address")]
async fn customer_with_address(world: &mut DeliveryWorld, name: String) {
    let sys = world.system();
    let (user, _) = customer(&sys.db, &name).await;
    sys.users.insert(name, user.id);
}

#[given(expr = "the last order is {int} days old")]
async fn order_age(world: &mut DeliveryWorld, days: i64) {
    let sys = world.system();
    backdate_order(&sys.db, sys.last_order(), days, sys.now).await;
}
