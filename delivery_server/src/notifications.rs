//! Turns engine events into notifications and hands them to a [`NotificationGateway`].
use std::sync::Arc;

use delivery_engine::{
    events::EventHooks,
    notifications::{Notification, NotificationError, NotificationGateway, NotifyFuture},
};
use futures::{future::BoxFuture, FutureExt};
use log::*;

/// A gateway that writes every notification to the log. Used when no push service is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationGateway;

impl NotificationGateway for LogNotificationGateway {
    fn notify(&self, notification: Notification) -> NotifyFuture {
        if notification.recipient.is_empty() {
            return async { Err(NotificationError::NoRecipients) }.boxed();
        }
        match serde_json::to_string(&notification) {
            Ok(json) => info!("📬️ Notification: {json}"),
            Err(e) => warn!("📬️ Could not serialize notification '{}'. {e}", notification.title),
        }
        async { Ok(()) }.boxed()
    }
}

/// Event hooks that notify administrators of new orders, and customers of status changes, payments and interest.
///
/// Modifications that leave the status unchanged (e.g. balance adjustments) do not notify anyone.
pub fn notification_hooks(gateway: Arc<dyn NotificationGateway>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let g = Arc::clone(&gateway);
    hooks.on_order_created(move |ev| send(g.as_ref(), Notification::order_created(&ev.order)));
    let g = Arc::clone(&gateway);
    hooks.on_order_modified(move |ev| {
        if ev.old_order.status == ev.new_order.status {
            return async {}.boxed();
        }
        send(g.as_ref(), Notification::status_changed(&ev.new_order))
    });
    let g = Arc::clone(&gateway);
    hooks.on_payment_received(move |ev| send(g.as_ref(), Notification::payment_received(&ev.order, &ev.transaction)));
    let g = gateway;
    hooks.on_interest_accrued(move |ev| send(g.as_ref(), Notification::interest_accrued(&ev.order, &ev.transaction)));
    hooks
}

fn send(gateway: &dyn NotificationGateway, notification: Notification) -> BoxFuture<'static, ()> {
    let title = notification.title.clone();
    let delivery = gateway.notify(notification);
    async move {
        match delivery.await {
            Ok(()) => trace!("📬️ Notification '{title}' sent"),
            Err(e) => warn!("📬️ Notification '{title}' was not delivered. {e}"),
        }
    }
    .boxed()
}
