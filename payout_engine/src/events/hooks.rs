use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    RequestCreatedEvent,
    RequestPaidEvent,
    RequestRejectedEvent,
    RequestValuedEvent,
    WalletActivatedEvent,
    WalletAddedEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub request_created_producer: Vec<EventProducer<RequestCreatedEvent>>,
    pub request_valued_producer: Vec<EventProducer<RequestValuedEvent>>,
    pub request_rejected_producer: Vec<EventProducer<RequestRejectedEvent>>,
    pub request_paid_producer: Vec<EventProducer<RequestPaidEvent>>,
    pub wallet_added_producer: Vec<EventProducer<WalletAddedEvent>>,
    pub wallet_activated_producer: Vec<EventProducer<WalletActivatedEvent>>,
}

impl EventProducers {
    pub async fn publish_request_created(&self, event: RequestCreatedEvent) {
        for emitter in &self.request_created_producer {
            debug!("📬️ Notifying request created hook subscribers of request #{}", event.request.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_request_valued(&self, event: RequestValuedEvent) {
        for emitter in &self.request_valued_producer {
            debug!("📬️ Notifying request valued hook subscribers of request #{}", event.request.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_request_rejected(&self, event: RequestRejectedEvent) {
        for emitter in &self.request_rejected_producer {
            debug!("📬️ Notifying request rejected hook subscribers of request #{}", event.request.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_request_paid(&self, event: RequestPaidEvent) {
        for emitter in &self.request_paid_producer {
            debug!("📬️ Notifying request paid hook subscribers of request #{}", event.request.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_wallet_added(&self, event: WalletAddedEvent) {
        for emitter in &self.wallet_added_producer {
            debug!("📬️ Notifying wallet added hook subscribers of wallet #{}", event.wallet.id);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_wallet_activated(&self, event: WalletActivatedEvent) {
        for emitter in &self.wallet_activated_producer {
            debug!("📬️ Notifying wallet activated hook subscribers of wallet #{}", event.wallet.id);
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_request_created: Option<EventHandler<RequestCreatedEvent>>,
    pub on_request_valued: Option<EventHandler<RequestValuedEvent>>,
    pub on_request_rejected: Option<EventHandler<RequestRejectedEvent>>,
    pub on_request_paid: Option<EventHandler<RequestPaidEvent>>,
    pub on_wallet_added: Option<EventHandler<WalletAddedEvent>>,
    pub on_wallet_activated: Option<EventHandler<WalletActivatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_request_created = hooks.on_request_created.map(|f| EventHandler::new(buffer_size, f));
        let on_request_valued = hooks.on_request_valued.map(|f| EventHandler::new(buffer_size, f));
        let on_request_rejected = hooks.on_request_rejected.map(|f| EventHandler::new(buffer_size, f));
        let on_request_paid = hooks.on_request_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_wallet_added = hooks.on_wallet_added.map(|f| EventHandler::new(buffer_size, f));
        let on_wallet_activated = hooks.on_wallet_activated.map(|f| EventHandler::new(buffer_size, f));
        Self {
            on_request_created,
            on_request_valued,
            on_request_rejected,
            on_request_paid,
            on_wallet_added,
            on_wallet_activated,
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_request_created {
            result.request_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_valued {
            result.request_valued_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_rejected {
            result.request_rejected_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_paid {
            result.request_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_wallet_added {
            result.wallet_added_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_wallet_activated {
            result.wallet_activated_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every configured handler. Each one runs until all of its producers have been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_request_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_valued {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_rejected {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_wallet_added {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_wallet_activated {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_request_created: Option<Handler<RequestCreatedEvent>>,
    pub on_request_valued: Option<Handler<RequestValuedEvent>>,
    pub on_request_rejected: Option<Handler<RequestRejectedEvent>>,
    pub on_request_paid: Option<Handler<RequestPaidEvent>>,
    pub on_wallet_added: Option<Handler<WalletAddedEvent>>,
    pub on_wallet_activated: Option<Handler<WalletActivatedEvent>>,
}

impl EventHooks {
    pub fn on_request_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_created = Some(Arc::new(f));
        self
    }

    pub fn on_request_valued<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestValuedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_valued = Some(Arc::new(f));
        self
    }

    pub fn on_request_rejected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestRejectedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_rejected = Some(Arc::new(f));
        self
    }

    pub fn on_request_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_request_paid = Some(Arc::new(f));
        self
    }

    pub fn on_wallet_added<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WalletAddedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_wallet_added = Some(Arc::new(f));
        self
    }

    pub fn on_wallet_activated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WalletActivatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_wallet_activated = Some(Arc::new(f));
        self
    }
}
