use cucumber::{given, then, when};
use delivery_engine::{
    db_types::{Cents, OrderStatusType, PaymentMethod, PaymentState, GAS, WATER},
    AccrualOptions,
    NewOrderRequest,
    OrderFlowError,
    PaymentRequest,
};

use crate::{cucumber::DeliveryWorld, support::prepare_env::stock_level};

async fn place_order(world: &mut DeliveryWorld, name: &str, gas: i64, water: i64) {
    let sys = world.system();
    let mut req = NewOrderRequest::new(sys.user(name));
    if gas > 0 {
        req = req.with_item(sys.stock_ids[GAS], gas);
    }
    if water > 0 {
        req = req.with_item(sys.stock_ids[WATER], water);
    }
    match sys.orders.create_order(req).await {
        Ok(order) => {
            sys.last_order = Some(order.order.id);
            sys.last_error = None;
        },
        Err(e) => sys.last_error = Some(e),
    }
}

#[when(expr = "{string} orders {int} gas and {int} water")]
async fn order(world: &mut DeliveryWorld, name: String, gas: i64, water: i64) {
    place_order(world, &name, gas, water).await;
}

#[given(expr = "{string} has ordered {int} gas and {int} water")]
async fn existing_order(world: &mut DeliveryWorld, name: String, gas: i64, water: i64) {
    place_order(world, &name, gas, water).await;
    assert!(world.system().last_error.is_none(), "Order was not placed");
}

#[when(expr = "the last order is paid {int} by {word}")]
async fn pay(world: &mut DeliveryWorld, amount: i64, method: String) {
    let sys = world.system();
    let method = method.parse::<PaymentMethod>().expect("Invalid payment method");
    let req = PaymentRequest::new(sys.last_order(), Cents::from_units(amount), method);
    sys.last_error = sys.payments.pay(req).await.err();
}

#[when("the overdue job runs")]
async fn overdue_job(world: &mut DeliveryWorld) {
    let sys = world.system();
    let count = sys.jobs.run_overdue_transition(sys.now, chrono::Duration::days(30)).await.expect("Overdue job failed");
    sys.last_job_count = Some(count);
}

#[when("the interest job runs")]
async fn interest_job(world: &mut DeliveryWorld) {
    let sys = world.system();
    sys.jobs.run_interest_accrual(sys.now, &AccrualOptions::default()).await.expect("Interest job failed");
}

#[then(regex = r"^(\d+) orders? (?:is|are) marked overdue$")]
async fn overdue_count(world: &mut DeliveryWorld, count: u64) {
    assert_eq!(world.system().last_job_count, Some(count));
}

#[then(expr = "the last order total is {int}")]
async fn order_total(world: &mut DeliveryWorld, total: i64) {
    let sys = world.system();
    let order = sys.orders.fetch_order(sys.last_order()).await.expect("Error fetching order");
    assert_eq!(order.order.total, Cents::from_units(total));
}

#[then(expr = "the last order is {word} with payment state {word}")]
async fn order_state(world: &mut DeliveryWorld, status: String, payment_state: String) {
    let sys = world.system();
    let order = sys.orders.fetch_order(sys.last_order()).await.expect("Error fetching order");
    assert_eq!(order.order.status, status.parse::<OrderStatusType>().expect("Invalid status"));
    assert_eq!(order.order.payment_state, payment_state.parse::<PaymentState>().expect("Invalid payment state"));
}

#[then(expr = "the last order payment state is {word}")]
async fn payment_state(world: &mut DeliveryWorld, expected_state: String) {
    let sys = world.system();
    let order = sys.orders.fetch_order(sys.last_order()).await.expect("Error fetching order");
    assert_eq!(order.order.payment_state, expected_state.parse::<PaymentState>().expect("Invalid payment state"));
}

#[then(expr = "the last order has {int} transactions")]
async fn transaction_count(world: &mut DeliveryWorld, count: usize) {
    let sys = world.system();
    let ledger = sys.payments.ledger(sys.last_order()).await.expect("Error fetching ledger");
    assert_eq!(ledger.transactions.len(), count);
    assert!(ledger.is_consistent());
}

#[then(expr = "there are {int} {word} in stock")]
async fn stock(world: &mut DeliveryWorld, quantity: i64, product: String) {
    let sys = world.system();
    assert_eq!(stock_level(&sys.db, &product).await, quantity);
}

#[then(expr = "the order is rejected because of insufficient stock of {word}")]
async fn insufficient_stock(world: &mut DeliveryWorld, product: String) {
    let err = world.system().last_error.clone().expect("The order was not rejected");
    assert_eq!(err, OrderFlowError::InsufficientStock(vec![product]));
}

#[then("the payment is rejected because the order is already paid")]
async fn already_paid(world: &mut DeliveryWorld) {
    let sys = world.system();
    assert_eq!(sys.last_error, Some(OrderFlowError::OrderAlreadyPaid(sys.last_order())));
}
