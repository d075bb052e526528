use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    InterestAccruedEvent,
    OrderCreatedEvent,
    OrderModifiedEvent,
    PaymentReceivedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of the event system. APIs hold a copy of this and publish into every registered producer.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_modified_producer: Vec<EventProducer<OrderModifiedEvent>>,
    pub payment_received_producer: Vec<EventProducer<PaymentReceivedEvent>>,
    pub interest_accrued_producer: Vec<EventProducer<InterestAccruedEvent>>,
}

impl EventProducers {
    pub fn publish_order_created(&self, event: OrderCreatedEvent) {
        publish_all(&self.order_created_producer, event);
    }

    pub fn publish_order_modified(&self, event: OrderModifiedEvent) {
        publish_all(&self.order_modified_producer, event);
    }

    pub fn publish_payment_received(&self, event: PaymentReceivedEvent) {
        publish_all(&self.payment_received_producer, event);
    }

    pub fn publish_interest_accrued(&self, event: InterestAccruedEvent) {
        publish_all(&self.interest_accrued_producer, event);
    }
}

fn publish_all<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    for producer in producers {
        producer.publish_event(event.clone());
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_modified: Option<EventHandler<OrderModifiedEvent>>,
    pub on_payment_received: Option<EventHandler<PaymentReceivedEvent>>,
    pub on_interest_accrued: Option<EventHandler<InterestAccruedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new("OrderCreated", buffer_size, f));
        let on_order_modified = hooks.on_order_modified.map(|f| EventHandler::new("OrderModified", buffer_size, f));
        let on_payment_received =
            hooks.on_payment_received.map(|f| EventHandler::new("PaymentReceived", buffer_size, f));
        let on_interest_accrued =
            hooks.on_interest_accrued.map(|f| EventHandler::new("InterestAccrued", buffer_size, f));
        Self { on_order_created, on_order_modified, on_payment_received, on_interest_accrued }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_modified {
            result.order_modified_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_received {
            result.payment_received_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_interest_accrued {
            result.interest_accrued_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every registered handler. Each task ends once all of its producers have been dropped.
    pub fn start_handlers(self) {
        let mut count = 0;
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
            count += 1;
        }
        if let Some(handler) = self.on_order_modified {
            tokio::spawn(handler.start_handler());
            count += 1;
        }
        if let Some(handler) = self.on_payment_received {
            tokio::spawn(handler.start_handler());
            count += 1;
        }
        if let Some(handler) = self.on_interest_accrued {
            tokio::spawn(handler.start_handler());
            count += 1;
        }
        info!("📬️ {count} event handlers started");
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_modified: Option<Handler<OrderModifiedEvent>>,
    pub on_payment_received: Option<Handler<PaymentReceivedEvent>>,
    pub on_interest_accrued: Option<Handler<InterestAccruedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_modified<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderModifiedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_modified = Some(Arc::new(f));
        self
    }

    pub fn on_payment_received<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentReceivedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_received = Some(Arc::new(f));
        self
    }

    pub fn on_interest_accrued<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(InterestAccruedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_interest_accrued = Some(Arc::new(f));
        self
    }
}
