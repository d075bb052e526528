use delivery_engine::{
    db_types::{Cents, OrderStatusType, PaymentState, TransactionType, GAS, WATER},
    events::EventProducers,
    NewOrderRequest,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use sqlx::Executor;

use crate::support::prepare_env::*;

mod support;

async fn setup() -> (SqliteDatabase, OrderFlowApi<SqliteDatabase>) {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    (db, api)
}

#[tokio::test]
async fn order_reserves_stock_and_prices_items() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 5, 10).await;
    let water = set_stock(&db, WATER, 10, 5).await;
    let (alice, _) = customer(&db, "alice").await;

    let req = NewOrderRequest::new(alice.id).with_item(gas.id, 1).with_item(water.id, 2);
    let order = api.create_order(req).await.expect("Error creating order");

    assert_eq!(order.order.total, Cents::from_units(20));
    assert_eq!(order.order.status, OrderStatusType::Pending);
    assert_eq!(order.order.payment_state, PaymentState::Pending);
    assert_eq!(order.items_total() + order.addons_total(), order.order.total);
    assert_eq!(order.items.len(), 2);
    assert!(order.transactions.is_empty());
    assert_eq!(order.order.address, "Rua do Sol, 100 - Centro, Recife");
    assert_eq!(stock_level(&db, GAS).await, 4);
    assert_eq!(stock_level(&db, WATER).await, 8);

    let fetched = api.fetch_order(order.order.id).await.expect("Error fetching order");
    assert_eq!(fetched, order);
    tear_down(db).await;
}

#[tokio::test]
async fn insufficient_stock_leaves_stock_untouched() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 1, 10).await;
    let water = set_stock(&db, WATER, 1, 5).await;
    let (bob, _) = customer(&db, "bob").await;

    let req = NewOrderRequest::new(bob.id).with_item(gas.id, 2);
    let err = api.create_order(req).await.unwrap_err();
    assert_eq!(err, OrderFlowError::InsufficientStock(vec![GAS.to_string()]));
    assert_eq!(err.user_message(), "estoque insuficiente de gás");

    let req = NewOrderRequest::new(bob.id).with_item(gas.id, 2).with_item(water.id, 3);
    let err = api.create_order(req).await.unwrap_err();
    assert_eq!(err, OrderFlowError::InsufficientStock(vec![GAS.to_string(), WATER.to_string()]));

    assert_eq!(stock_level(&db, GAS).await, 1);
    assert_eq!(stock_level(&db, WATER).await, 1);
    assert!(api.orders_for_user(bob.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn missing_stock_items_are_all_reported() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (carol, _) = customer(&db, "carol").await;
    let req = NewOrderRequest::new(carol.id).with_item(gas.id, 1).with_item(998, 1).with_item(999, 1);
    let err = api.create_order(req).await.unwrap_err();
    assert_eq!(err, OrderFlowError::StockItemsNotFound(vec![998, 999]));
    assert_eq!(stock_level(&db, GAS).await, 10);
    tear_down(db).await;
}

#[tokio::test]
async fn users_and_addresses_are_checked() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let err = api.create_order(NewOrderRequest::new(4242).with_item(gas.id, 1)).await.unwrap_err();
    assert_eq!(err, OrderFlowError::UserNotFound(4242));

    let dave = customer_without_address(&db, "dave").await;
    let err = api.create_order(NewOrderRequest::new(dave.id).with_item(gas.id, 1)).await.unwrap_err();
    assert_eq!(err, OrderFlowError::UserHasNoAddress(dave.id));

    let (_erin, erins_address) = customer(&db, "erin").await;
    let req = NewOrderRequest::new(dave.id).with_item(gas.id, 1).with_address(erins_address.id);
    let err = api.create_order(req).await.unwrap_err();
    assert_eq!(err, OrderFlowError::UserHasNoAddress(dave.id));
    assert_eq!(stock_level(&db, GAS).await, 10);
    tear_down(db).await;
}

#[tokio::test]
async fn invalid_requests_never_reach_the_store() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (frank, _) = customer(&db, "frank").await;
    let err = api.create_order(NewOrderRequest::new(frank.id)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));
    let err = api.create_order(NewOrderRequest::new(frank.id).with_item(gas.id, -1)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn only_admins_can_override_state() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (grace, _) = customer(&db, "grace").await;
    let req = NewOrderRequest::new(grace.id).with_item(gas.id, 1).with_status(OrderStatusType::Started);
    let err = api.create_order(req.clone()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)));
    assert_eq!(stock_level(&db, GAS).await, 10);

    let order = api.create_order_as_admin(req).await.expect("Error creating order");
    assert_eq!(order.order.status, OrderStatusType::Started);
    assert_eq!(stock_level(&db, GAS).await, 9);
    tear_down(db).await;
}

#[tokio::test]
async fn addons_and_bottles_are_priced() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 110).await;
    let water = set_stock(&db, WATER, 10, 12).await;
    let (heidi, _) = customer(&db, "heidi").await;
    db.pool().execute("DELETE FROM addons WHERE name = 'water bottle'").await.unwrap();

    let req = NewOrderRequest::new(heidi.id).with_bottled_item(gas.id, 1).with_bottled_item(water.id, 2);
    let order = api.create_order(req).await.expect("Error creating order");
    assert_eq!(order.addons.len(), 1);
    assert_eq!(order.addons[0].name, "gas bottle");
    assert_eq!(order.addons[0].total_value, Cents::from_units(180));
    assert_eq!(order.order.total, Cents::from_units(110 + 24 + 180));

    let gas_bottle = order.addons[0].addon_id;
    let req = NewOrderRequest::new(heidi.id).with_item(water.id, 1).with_addon(gas_bottle).with_addon(77);
    let err = api.create_order(req).await.unwrap_err();
    assert_eq!(err, OrderFlowError::AddonNotFound(vec![77]));
    // The failed order's reservation was returned
    assert_eq!(stock_level(&db, WATER).await, 8);
    tear_down(db).await;
}

#[tokio::test]
async fn carried_debt_opens_the_ledger() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 100).await;
    let (ivan, _) = customer(&db, "ivan").await;
    let req = NewOrderRequest::new(ivan.id).with_item(gas.id, 1).with_overdue_amount(Cents::from_units(30), "March");
    let order = api.create_order(req).await.expect("Error creating order");
    assert_eq!(order.order.total, Cents::from_units(130));
    assert_eq!(order.order.payment_state, PaymentState::Overdue);
    assert_eq!(order.transactions.len(), 1);
    let tx = &order.transactions[0];
    assert_eq!(tx.tx_type, TransactionType::Interest);
    assert_eq!(tx.old_value, Cents::from_units(100));
    assert_eq!(tx.new_value, Cents::from_units(130));
    assert_eq!(tx.notes.as_deref(), Some("March"));
    assert!(!tx.accrued);
    assert_eq!(order.ledger_balance(), order.order.total);
    tear_down(db).await;
}

const FREEZE_STOCK: &str = r#"
    CREATE TRIGGER freeze_stock BEFORE UPDATE OF quantity ON stock
    WHEN NEW.quantity > OLD.quantity
    BEGIN
        SELECT RAISE(ABORT, 'stock is frozen');
    END;
"#;

#[tokio::test]
async fn stock_that_cannot_be_returned_is_reported() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (nina, _) = customer(&db, "nina").await;
    db.pool().execute(FREEZE_STOCK).await.unwrap();

    let req = NewOrderRequest::new(nina.id).with_item(gas.id, 2).with_addon(77);
    let err = api.create_order(req).await.unwrap_err();
    match err {
        OrderFlowError::ConcurrencyConflict(msg) => {
            assert!(msg.contains("could not release stock of gas"), "{msg}");
            assert!(msg.contains("[77]"), "{msg}");
        },
        other => panic!("Expected a concurrency conflict, got {other:?}"),
    }
    assert_eq!(stock_level(&db, GAS).await, 8);
    assert!(api.orders_for_user(nina.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn cancellation_only_sticks_once_stock_is_returned() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let water = set_stock(&db, WATER, 10, 5).await;
    let (olga, _) = customer(&db, "olga").await;
    let req = NewOrderRequest::new(olga.id).with_item(gas.id, 2).with_item(water.id, 1);
    let order = api.create_order(req).await.unwrap().order;
    db.pool().execute(FREEZE_STOCK).await.unwrap();

    let err = api.modify_status_for_order(order.id, OrderStatusType::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ConcurrencyConflict(_)), "{err:?}");
    let unchanged = api.fetch_order(order.id).await.unwrap().order;
    assert_eq!(unchanged.status, OrderStatusType::Pending);
    assert_eq!(unchanged.version, order.version);
    assert_eq!(stock_level(&db, GAS).await, 8);
    assert_eq!(stock_level(&db, WATER).await, 9);

    // Once the stock can move again, a retried cancellation goes through
    db.pool().execute("DROP TRIGGER freeze_stock").await.unwrap();
    let cancelled = api.modify_status_for_order(order.id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(stock_level(&db, GAS).await, 10);
    assert_eq!(stock_level(&db, WATER).await, 10);
    tear_down(db).await;
}

#[tokio::test]
async fn stale_cancellation_takes_stock_back() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (paul, _) = customer(&db, "paul").await;
    let order = api.create_order(NewOrderRequest::new(paul.id).with_item(gas.id, 3)).await.unwrap().order;
    // Another writer modifies the order while its stock is being returned
    let concurrent_edit = format!(
        "CREATE TRIGGER concurrent_edit AFTER UPDATE OF quantity ON stock WHEN NEW.quantity > OLD.quantity BEGIN \
         UPDATE orders SET version = version + 1 WHERE id = {}; END;",
        order.id
    );
    db.pool().execute(concurrent_edit.as_str()).await.unwrap();

    let err = api.modify_status_for_order(order.id, OrderStatusType::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ConcurrencyConflict(_)), "{err:?}");
    assert_eq!(api.fetch_order(order.id).await.unwrap().order.status, OrderStatusType::Pending);
    assert_eq!(stock_level(&db, GAS).await, 7);
    tear_down(db).await;
}

#[tokio::test]
async fn oversized_orders_leave_stock_untouched() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (quinn, _) = customer(&db, "quinn").await;
    let huge = Cents::from(i64::MAX - 1);
    let req = NewOrderRequest::new(quinn.id).with_item(gas.id, 1).with_overdue_amount(huge, "forever");
    let err = api.create_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)), "{err:?}");
    let err = api.create_order(NewOrderRequest::new(quinn.id).with_item(gas.id, i64::MAX)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ValidationError(_)), "{err:?}");
    assert_eq!(stock_level(&db, GAS).await, 10);
    assert!(api.orders_for_user(quinn.id).await.unwrap().is_empty());
    tear_down(db).await;
}

#[tokio::test]
async fn status_transitions() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (judy, _) = customer(&db, "judy").await;
    let req = NewOrderRequest::new(judy.id).with_item(gas.id, 3).with_status(OrderStatusType::Started);
    let started = api.create_order_as_admin(req).await.unwrap().order;

    let err = api.modify_status_for_order(started.id, OrderStatusType::Concluded).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::StatusChangeForbidden { .. }));
    let pending = api.modify_status_for_order(started.id, OrderStatusType::Pending).await.unwrap();
    assert_eq!(pending.status, OrderStatusType::Pending);
    assert_eq!(pending.version, started.version + 1);
    let err = api.modify_status_for_order(started.id, OrderStatusType::Pending).await.unwrap_err();
    assert_eq!(err, OrderFlowError::OrderModificationNoOp);
    let concluded = api.modify_status_for_order(started.id, OrderStatusType::Concluded).await.unwrap();
    assert_eq!(concluded.status, OrderStatusType::Concluded);
    let err = api.modify_status_for_order(started.id, OrderStatusType::Cancelled).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::StatusChangeForbidden { .. }));
    assert_eq!(stock_level(&db, GAS).await, 7);

    let order = api.create_order(NewOrderRequest::new(judy.id).with_item(gas.id, 2)).await.unwrap().order;
    assert_eq!(stock_level(&db, GAS).await, 5);
    let cancelled = api.modify_status_for_order(order.id, OrderStatusType::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(stock_level(&db, GAS).await, 7);
    let err = api.modify_status_for_order(order.id, OrderStatusType::Pending).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::StatusChangeForbidden { .. }));

    let err = api.modify_status_for_order(9999, OrderStatusType::Pending).await.unwrap_err();
    assert_eq!(err, OrderFlowError::OrderNotFound(9999));
    tear_down(db).await;
}

#[tokio::test]
async fn order_queries() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 10, 10).await;
    let (ken, _) = customer(&db, "ken").await;
    let (leo, _) = customer(&db, "leo").await;
    for user in [ken.id, ken.id, leo.id] {
        api.create_order(NewOrderRequest::new(user).with_item(gas.id, 1)).await.unwrap();
    }
    assert_eq!(api.orders_for_user(ken.id).await.unwrap().len(), 2);
    assert_eq!(api.orders_for_user(leo.id).await.unwrap().len(), 1);
    assert_eq!(api.orders_for_user(31337).await.unwrap_err(), OrderFlowError::UserNotFound(31337));

    let now = chrono::Utc::now();
    let orders = api.orders_for_user(ken.id).await.unwrap();
    backdate_order(&db, orders[0].id, 10, now).await;
    let recent = api.orders_by_date_range(now - chrono::Duration::days(1), now).await.unwrap();
    assert_eq!(recent.len(), 2);
    let all = api.orders_by_date_range(now - chrono::Duration::days(11), now).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, orders[0].id);
    assert!(api.orders_by_date_range(now, now - chrono::Duration::days(1)).await.is_err());
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let (db, api) = setup().await;
    let gas = set_stock(&db, GAS, 5, 10).await;
    let (mike, _) = customer(&db, "mike").await;
    let api = std::sync::Arc::new(api);
    let mut handles = Vec::new();
    for _ in 0..12 {
        let api = api.clone();
        let req = NewOrderRequest::new(mike.id).with_item(gas.id, 1);
        handles.push(tokio::spawn(async move { api.create_order(req).await }));
    }
    let mut placed = 0;
    for handle in handles {
        match handle.await.expect("Order task panicked") {
            Ok(_) => placed += 1,
            Err(OrderFlowError::InsufficientStock(products)) => assert_eq!(products, vec![GAS.to_string()]),
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }
    assert_eq!(placed, 5);
    assert_eq!(stock_level(&db, GAS).await, 0);
    assert_eq!(api.orders_for_user(mike.id).await.unwrap().len(), 5);
    tear_down(db).await;
}
