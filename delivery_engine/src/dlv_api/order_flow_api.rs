use std::{collections::BTreeMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db::traits::{DeliveryDatabase, FullOrder},
    db_types::{
        Address,
        Addon,
        NewOrder,
        NewTransaction,
        Order,
        OrderStatusType,
        PaymentState,
        StockItem,
    },
    dlv_api::{
        errors::OrderFlowError,
        order_objects::NewOrderRequest,
        pricing::PricingCalculator,
        stock_ledger::{StockLedger, StockLine},
    },
    events::{EventProducers, OrderCreatedEvent, OrderModifiedEvent},
};

/// `OrderFlowApi` places orders and moves them through their delivery lifecycle.
pub struct OrderFlowApi<B> {
    db: B,
    stock: StockLedger<B>,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let stock = StockLedger::new(db.clone());
        Self { db, stock, producers }
    }

    pub fn stock_ledger(&self) -> &StockLedger<B> {
        &self.stock
    }
}

impl<B> OrderFlowApi<B>
where B: DeliveryDatabase
{
    /// Places an order on behalf of a customer.
    ///
    /// Customers cannot choose the initial status or payment state of their orders, so a request carrying either
    /// override is rejected with a [`OrderFlowError::ValidationError`].
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<FullOrder, OrderFlowError> {
        if request.has_overrides() {
            return Err(OrderFlowError::ValidationError(
                "only administrators can set the status or payment state of a new order".into(),
            ));
        }
        self.place_order(request).await
    }

    /// Places an order, honouring any status and payment state overrides in the request.
    pub async fn create_order_as_admin(&self, request: NewOrderRequest) -> Result<FullOrder, OrderFlowError> {
        self.place_order(request).await
    }

    /// The order creation flow:
    /// 1. Validate the request shape.
    /// 2. Load the user and pick the delivery address.
    /// 3. Load the referenced stock items, reporting every missing id.
    /// 4. Check every product has enough stock, reporting every short product.
    /// 5. Reserve the stock. Any failure from here on releases the reservation again.
    /// 6. Resolve addons, price the order and save it with its items, addons and carried debt in one transaction.
    async fn place_order(&self, request: NewOrderRequest) -> Result<FullOrder, OrderFlowError> {
        request.validate()?;
        let user_id = request.user_id;
        let _user = self.db.fetch_user(user_id).await?.ok_or(OrderFlowError::UserNotFound(user_id))?;
        let address = self.delivery_address(user_id, request.address_id).await?;
        let quantities = request.quantities();
        let ids = quantities.keys().copied().collect::<Vec<_>>();
        let stock = self.db.fetch_stock_by_ids(&ids).await?;
        let stock = ids
            .iter()
            .filter_map(|id| stock.iter().find(|s| s.id == *id).map(|s| (*id, s.clone())))
            .collect::<BTreeMap<i64, StockItem>>();
        let missing = ids.iter().filter(|id| !stock.contains_key(id)).copied().collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(OrderFlowError::StockItemsNotFound(missing));
        }
        let short = quantities
            .iter()
            .filter_map(|(id, qty)| stock.get(id).filter(|s| s.quantity < *qty).map(|s| s.name.clone()))
            .collect::<Vec<_>>();
        if !short.is_empty() {
            debug!("📦️ Order for user #{user_id} rejected. Not enough {}", short.join(", "));
            return Err(OrderFlowError::InsufficientStock(short));
        }
        let lines = quantities
            .iter()
            .filter_map(|(id, qty)| stock.get(id).map(|s| StockLine::new(s.name.clone(), *qty)))
            .collect::<Vec<_>>();
        self.stock.reserve_all(&lines).await?;
        trace!("📦️ Stock reserved for user #{user_id}: {lines:?}");
        match self.price_and_save(request, address, &stock).await {
            Ok(order) => {
                info!(
                    "📦️ Order #{} created for user #{user_id}. Total {} ({})",
                    order.order.id, order.order.total, order.order.payment_state
                );
                self.producers.publish_order_created(OrderCreatedEvent::new(order.clone()));
                Ok(order)
            },
            Err(e) => {
                warn!("📦️ Order for user #{user_id} failed after stock was reserved. Releasing stock. {e}");
                Err(self.stock.compensate(&lines, e).await)
            },
        }
    }

    async fn price_and_save(
        &self,
        request: NewOrderRequest,
        address: Address,
        stock: &BTreeMap<i64, StockItem>,
    ) -> Result<FullOrder, OrderFlowError> {
        let addons = self.resolve_addons(&request, stock).await?;
        let lines = request
            .items
            .iter()
            .filter_map(|item| stock.get(&item.stock_id).map(|s| (s.clone(), item.quantity)))
            .collect::<Vec<_>>();
        let priced = PricingCalculator::price(&lines, &addons)?;
        let price = priced.breakdown.total;
        let overdue = request.overdue_amount.unwrap_or_default();
        let total = price.checked_add(overdue).ok_or_else(|| {
            OrderFlowError::ValidationError(format!("a carried debt of {overdue} on top of {price} is too large"))
        })?;
        let (payment_state, carried_debt) = if overdue.is_positive() {
            let debt = NewTransaction::interest(price, overdue)
                .map(|tx| tx.with_notes(request.overdue_description.clone()));
            (PaymentState::Overdue, debt)
        } else {
            (request.payment_state.unwrap_or(PaymentState::Pending), None)
        };
        let new_order = NewOrder {
            user_id: request.user_id,
            address: address.to_string(),
            status: request.status.unwrap_or(OrderStatusType::Pending),
            payment_state,
            total,
            interest_allowed: request.interest_allowed,
            items: priced.items,
            addons: priced.addons,
            carried_debt,
            created_at: Utc::now(),
        };
        let order = self.db.insert_order(new_order).await?;
        Ok(order)
    }

    async fn delivery_address(&self, user_id: i64, address_id: Option<i64>) -> Result<Address, OrderFlowError> {
        let addresses = self.db.fetch_addresses(user_id).await?;
        let address = match address_id {
            Some(id) => addresses.into_iter().find(|a| a.id == id),
            None => addresses.into_iter().next(),
        };
        address.ok_or(OrderFlowError::UserHasNoAddress(user_id))
    }

    async fn resolve_addons(
        &self,
        request: &NewOrderRequest,
        stock: &BTreeMap<i64, StockItem>,
    ) -> Result<Vec<Addon>, OrderFlowError> {
        let available = self.db.fetch_addons_by_ids(&request.addon_ids).await?;
        let mut addons = PricingCalculator::resolve_addons(&request.addon_ids, &available)?;
        for item in request.items.iter().filter(|i| i.with_bottle) {
            let Some(product) = stock.get(&item.stock_id) else { continue };
            let name = PricingCalculator::bottle_addon_name(&product.name);
            match self.db.fetch_addon_by_name(&name).await? {
                Some(addon) => addons.push(addon),
                None => warn!("📦️ Bottle requested for {}, but there is no '{name}' addon. Skipping it.", product.name),
            }
        }
        Ok(addons)
    }

    /// Changes the status of an order.
    ///
    /// | From \ To             | Pending | Concluded | Cancelled |
    /// |-----------------------|---------|-----------|-----------|
    /// | Started               | Ok      | Err       | Ok (1)    |
    /// | Pending               | No-op   | Ok        | Ok (1)    |
    /// | Concluded / Cancelled | Err     | Err       | Err       |
    ///
    /// (1) Cancelling an order returns its items to the stock.
    ///
    /// Changing a status to itself is a no-op and returns [`OrderFlowError::OrderModificationNoOp`]. The
    /// `OrderModified` event is published on success.
    ///
    /// ## Returns
    /// The updated order.
    pub async fn modify_status_for_order(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        use OrderStatusType::*;
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let updated = match (order.status, new_status) {
            (old, new) if old == new => return Err(OrderFlowError::OrderModificationNoOp),
            (Started, Pending) | (Pending, Concluded) => {
                self.db.update_order_status(order_id, order.version, new_status).await?
            },
            (Started | Pending, Cancelled) => self.cancel_order(&order).await?,
            (from, to) => return Err(OrderFlowError::StatusChangeForbidden { from, to }),
        };
        info!("📦️ Order #{order_id} status changed from {} to {}", order.status, updated.status);
        self.producers.publish_order_modified(OrderModifiedEvent::new(order, updated.clone()));
        Ok(updated)
    }

    /// The stock is returned before the status is written, and taken back if the write fails, so an order is never
    /// left cancelled while still holding stock.
    async fn cancel_order(&self, order: &Order) -> Result<Order, OrderFlowError> {
        let full = self.fetch_order(order.id).await?;
        let lines = full.items.iter().map(|i| StockLine::new(i.product.clone(), i.quantity)).collect::<Vec<_>>();
        let updated = self
            .stock
            .release_and_commit(&lines, move || async move {
                self.db
                    .update_order_status(order.id, order.version, OrderStatusType::Cancelled)
                    .await
                    .map_err(OrderFlowError::from)
            })
            .await?;
        debug!("📦️ Stock for cancelled order #{} returned: {lines:?}", order.id);
        Ok(updated)
    }

    /// Fetches the order with its items, addons and ledger.
    pub async fn fetch_order(&self, order_id: i64) -> Result<FullOrder, OrderFlowError> {
        self.db.fetch_full_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_user(user_id).await?.ok_or(OrderFlowError::UserNotFound(user_id))?;
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }

    pub async fn orders_by_date_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, OrderFlowError> {
        if since > until {
            return Err(OrderFlowError::ValidationError(format!("{since} is after {until}")));
        }
        let orders = self.db.fetch_orders_by_date_range(since, until).await?;
        Ok(orders)
    }
}
