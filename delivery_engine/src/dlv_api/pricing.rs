//! Order pricing.
//!
//! Pricing is a pure calculation over the stock rows the order references, the requested quantities and the resolved
//! addons. Item and addon values are frozen into the order when it is saved, so later price changes never alter an
//! existing order.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Addon, Cents, NewOrderAddon, NewOrderItem, StockItem},
    dlv_api::errors::OrderFlowError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub line_total: Cents,
    pub addon_total: Cents,
    pub total: Cents,
}

/// A priced order, ready to be turned into database rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub breakdown: PriceBreakdown,
    pub items: Vec<NewOrderItem>,
    pub addons: Vec<NewOrderAddon>,
}

pub struct PricingCalculator;

impl PricingCalculator {
    /// Prices each `(stock item, quantity)` line at the item's current unit price, plus one of each addon.
    ///
    /// Fails with [`OrderFlowError::ValidationError`] if any value does not fit in the money type.
    pub fn price(lines: &[(StockItem, i64)], addons: &[Addon]) -> Result<PricedOrder, OrderFlowError> {
        let items = lines
            .iter()
            .map(|(stock, quantity)| {
                let total_value = stock.unit_price.checked_mul(*quantity).ok_or_else(|| {
                    out_of_range(format!("{quantity} x {} at {}", stock.name, stock.unit_price))
                })?;
                Ok(NewOrderItem {
                    stock_id: stock.id,
                    product: stock.name.clone(),
                    quantity: *quantity,
                    unit_value: stock.unit_price,
                    total_value,
                })
            })
            .collect::<Result<Vec<_>, OrderFlowError>>()?;
        let addons = addons
            .iter()
            .map(|a| NewOrderAddon { addon_id: a.id, name: a.name.clone(), unit_value: a.price, total_value: a.price })
            .collect::<Vec<_>>();
        let line_total =
            Cents::checked_sum(items.iter().map(|i| i.total_value)).ok_or_else(|| out_of_range("item total"))?;
        let addon_total =
            Cents::checked_sum(addons.iter().map(|a| a.total_value)).ok_or_else(|| out_of_range("addon total"))?;
        let total = line_total.checked_add(addon_total).ok_or_else(|| out_of_range("order total"))?;
        let breakdown = PriceBreakdown { line_total, addon_total, total };
        Ok(PricedOrder { breakdown, items, addons })
    }

    /// Maps each requested addon id onto the addon record. Every id that is not in `available` is reported.
    pub fn resolve_addons(requested: &[i64], available: &[Addon]) -> Result<Vec<Addon>, OrderFlowError> {
        let mut missing = Vec::new();
        let mut resolved = Vec::with_capacity(requested.len());
        for id in requested {
            match available.iter().find(|a| a.id == *id) {
                Some(addon) => resolved.push(addon.clone()),
                None if !missing.contains(id) => missing.push(*id),
                None => {},
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(OrderFlowError::AddonNotFound(missing))
        }
    }

    /// The name of the addon that the legacy `with_bottle` flag stands for.
    pub fn bottle_addon_name(product: &str) -> String {
        format!("{product} bottle")
    }
}

fn out_of_range<S: Display>(what: S) -> OrderFlowError {
    OrderFlowError::ValidationError(format!("{what} is too large to be priced"))
}
