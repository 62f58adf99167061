//! # Notifications
//!
//! The engine does not talk to any messaging transport itself. A host supplies a [`Notifier`], and the
//! [`NotificationDispatcher`] turns engine events into notifications for the right people:
//!
//! | Event              | Recipients                                                   |
//! |--------------------|--------------------------------------------------------------|
//! | `RequestCreated`   | the submitter, and every admin                               |
//! | `RequestValued`    | the submitter                                                |
//! | `RequestRejected`  | the submitter                                                |
//! | `RequestPaid`      | the submitter (the payment proof travels with the event)     |
//! | `WalletAdded`      | every admin, the founder only if `notify_founder_of_wallets` |
//! | `WalletActivated`  | the wallet owner                                             |
//!
//! Delivery is best-effort. A failed notification is logged and never undoes the state change that caused it.
use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use log::*;
use serde::Serialize;
use thiserror::Error;

use crate::{
    config::EngineConfig,
    db_types::ActorId,
    events::{EventHooks, EventType, HookFuture},
    traits::AdminRoster,
};

/// Why a notification is being sent to a particular recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Audience {
    /// The recipient owns the request or wallet the event is about.
    Owner,
    /// The recipient is on the admin roster.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub audience: Audience,
    pub event: EventType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("Actor {0} cannot be reached.")]
    Unreachable(ActorId),
    #[error("The notification transport failed. {0}")]
    Transport(String),
}

/// Delivers a single notification to a single actor.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: ActorId, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    roster: Arc<dyn AdminRoster>,
    notify_founder_of_wallets: bool,
}

impl Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationDispatcher (founder gets wallets: {})", self.notify_founder_of_wallets)
    }
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, roster: Arc<dyn AdminRoster>, config: &EngineConfig) -> Self {
        Self { notifier, roster, notify_founder_of_wallets: config.notify_founder_of_wallets }
    }

    /// Hooks that forward every engine event to [`Self::dispatch`].
    pub fn hooks(&self) -> EventHooks {
        let mut hooks = EventHooks::default();
        hooks
            .on_request_created(self.forward(EventType::RequestCreated))
            .on_request_valued(self.forward(EventType::RequestValued))
            .on_request_rejected(self.forward(EventType::RequestRejected))
            .on_request_paid(self.forward(EventType::RequestPaid))
            .on_wallet_added(self.forward(EventType::WalletAdded))
            .on_wallet_activated(self.forward(EventType::WalletActivated));
        hooks
    }

    fn forward<E: Send + 'static>(&self, wrap: fn(E) -> EventType) -> impl Fn(E) -> HookFuture + Send + Sync + 'static {
        let dispatcher = self.clone();
        move |event| {
            let dispatcher = dispatcher.clone();
            let fut: HookFuture = Box::pin(async move {
                let delivered = dispatcher.dispatch(wrap(event)).await;
                trace!("🔔️ {delivered} notifications delivered");
            });
            fut
        }
    }

    /// Sends `event` to everyone who should hear about it. Returns the number of notifications delivered.
    pub async fn dispatch(&self, event: EventType) -> usize {
        let owner = event.subject();
        match &event {
            EventType::RequestCreated(_) => {
                let admins = self.admins(true).await;
                let mut delivered = self.send(owner, Audience::Owner, &event).await as usize;
                for admin in admins {
                    delivered += self.send(admin, Audience::Admin, &event).await as usize;
                }
                delivered
            },
            EventType::WalletAdded(_) => {
                let mut delivered = 0;
                for admin in self.admins(self.notify_founder_of_wallets).await {
                    delivered += self.send(admin, Audience::Admin, &event).await as usize;
                }
                delivered
            },
            EventType::RequestValued(_)
            | EventType::RequestRejected(_)
            | EventType::RequestPaid(_)
            | EventType::WalletActivated(_) => self.send(owner, Audience::Owner, &event).await as usize,
        }
    }

    async fn admins(&self, include_founder: bool) -> Vec<ActorId> {
        match self.roster.fetch_admins().await {
            Ok(admins) => admins
                .into_iter()
                .filter(|a| include_founder || !a.is_founder)
                .map(|a| a.actor_id)
                .collect(),
            Err(e) => {
                error!("🔔️ Could not load the admin roster. Admins will not be notified. {e}");
                Vec::new()
            },
        }
    }

    async fn send(&self, recipient: ActorId, audience: Audience, event: &EventType) -> bool {
        let notification = Notification { audience, event: event.clone() };
        match self.notifier.notify(recipient, notification).await {
            Ok(()) => {
                trace!("🔔️ Notified {recipient} ({audience:?})");
                true
            },
            Err(NotifyError::Unreachable(id)) => {
                warn!("🔔️ Actor {id} could not be notified. They may have blocked the bot.");
                false
            },
            Err(e) => {
                error!("🔔️ Notification to {recipient} failed. {e}");
                false
            },
        }
    }
}
