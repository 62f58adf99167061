//! Transient conversational state, one slot per (actor, role).
//!
//! Each slot owns its own async mutex. A pipeline takes the slot with [`SessionStore::lock`] and holds it for the whole
//! handling of one input, so two inputs from the same actor in the same role never interleave, while different actors
//! (or the same actor acting as submitter and as reviewer) never contend. The outer map lock is only held long enough
//! to look up or create a slot.
//!
//! Sessions live in memory only. A restart abandons every in-flight flow.
use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex},
};

use log::*;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db_types::ActorId;

/// Which side of the workflow a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Submitter,
    Reviewer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Submitter => write!(f, "submitter"),
            Role::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// The step a guided flow is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Step {
    CollectingWallet,
    SelectingWallet,
    SelectingDirection,
    CollectingReferenceLink,
    CollectingProofs,
    Pricing,
    Rejecting,
    ConfirmingPayment,
}

impl Step {
    pub fn role(&self) -> Role {
        match self {
            Step::Pricing | Step::Rejecting | Step::ConfirmingPayment => Role::Reviewer,
            _ => Role::Submitter,
        }
    }

    /// A human-readable description of the input this step is waiting for.
    pub fn expects(&self) -> &'static str {
        match self {
            Step::CollectingWallet => "a wallet address",
            Step::SelectingWallet => "one of your wallets, or a new wallet",
            Step::SelectingDirection => "a direction",
            Step::CollectingReferenceLink => "a reference link",
            Step::CollectingProofs => "proof attachments or text, then done",
            Step::Pricing => "the request amount",
            Step::Rejecting => "the reason for rejection",
            Step::ConfirmingPayment => "a photo or document of the payment receipt",
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub step: Step,
    /// Fields collected so far.
    pub data: Map<String, Value>,
}

impl Session {
    pub fn new(step: Step) -> Self {
        Self { step, data: Map::new() }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

pub type SessionKey = (ActorId, Role);

type Slot = Arc<AsyncMutex<Option<Session>>>;

#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<SessionKey, Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the slot for `key`, creating it if needed. Creating a slot first drops every slot that holds no
    /// session and is not locked by anyone, so the map only keeps actors with a flow in progress.
    fn slot(&self, key: SessionKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(slot) = slots.get(&key) {
            return Arc::clone(slot);
        }
        slots.retain(|_, slot| Arc::strong_count(slot) > 1 || slot.try_lock().map(|s| s.is_some()).unwrap_or(true));
        Arc::clone(slots.entry(key).or_default())
    }

    /// Takes exclusive hold of the session slot for `(actor, role)` until the returned guard is dropped.
    pub async fn lock(&self, actor: ActorId, role: Role) -> SessionGuard {
        let guard = self.slot((actor, role)).lock_owned().await;
        SessionGuard { key: (actor, role), guard }
    }

    /// Creates the session, overwriting (and thereby abandoning) any flow that was in progress.
    pub async fn begin(&self, actor: ActorId, role: Role, step: Step) {
        self.lock(actor, role).await.begin(step);
    }

    pub async fn get(&self, actor: ActorId, role: Role) -> Option<Session> {
        self.lock(actor, role).await.session().cloned()
    }

    pub async fn set_step(&self, actor: ActorId, role: Role, step: Step) -> bool {
        self.lock(actor, role).await.set_step(step)
    }

    pub async fn merge_data(&self, actor: ActorId, role: Role, data: Map<String, Value>) -> bool {
        self.lock(actor, role).await.merge_data(data)
    }

    /// Clears the session. Returns the session that was in progress, if any.
    pub async fn end(&self, actor: ActorId, role: Role) -> Option<Session> {
        self.lock(actor, role).await.end()
    }
}

/// Exclusive access to one session slot. The mutation methods return `false` when there is no session to mutate.
pub struct SessionGuard {
    key: SessionKey,
    guard: OwnedMutexGuard<Option<Session>>,
}

impl SessionGuard {
    pub fn session(&self) -> Option<&Session> {
        self.guard.as_ref()
    }

    pub fn step(&self) -> Option<Step> {
        self.guard.as_ref().map(|s| s.step)
    }

    pub fn begin(&mut self, step: Step) {
        let (actor, role) = self.key;
        if let Some(old) = self.guard.replace(Session::new(step)) {
            debug!("💬️ {role} session for {actor} abandoned at step {}", old.step);
        }
        trace!("💬️ {role} session for {actor} started at step {step}");
    }

    pub fn set_step(&mut self, step: Step) -> bool {
        match self.guard.as_mut() {
            Some(session) => {
                trace!("💬️ {} session for {} moved from {} to {step}", self.key.1, self.key.0, session.step);
                session.step = step;
                true
            },
            None => false,
        }
    }

    pub fn merge_data(&mut self, data: Map<String, Value>) -> bool {
        match self.guard.as_mut() {
            Some(session) => {
                session.data.extend(data);
                true
            },
            None => false,
        }
    }

    /// Stores a single serializable value in the session scratch map.
    pub fn put<T: Serialize>(&mut self, key: &str, value: T) -> bool {
        match serde_json::to_value(value) {
            Ok(v) => {
                let mut data = Map::new();
                data.insert(key.to_string(), v);
                self.merge_data(data)
            },
            Err(e) => {
                error!("💬️ Could not store '{key}' in the session for {}. {e}", self.key.0);
                false
            },
        }
    }

    pub fn end(&mut self) -> Option<Session> {
        let old = self.guard.take();
        if old.is_some() {
            trace!("💬️ {} session for {} ended", self.key.1, self.key.0);
        }
        old
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn lifecycle() {
        let store = SessionStore::new();
        let me = ActorId(1);
        assert!(store.get(me, Role::Submitter).await.is_none());
        assert!(!store.set_step(me, Role::Submitter, Step::SelectingDirection).await);

        store.begin(me, Role::Submitter, Step::CollectingWallet).await;
        let mut data = Map::new();
        data.insert("creating_request".into(), json!(true));
        assert!(store.merge_data(me, Role::Submitter, data).await);
        assert!(store.set_step(me, Role::Submitter, Step::SelectingDirection).await);

        let session = store.get(me, Role::Submitter).await.unwrap();
        assert_eq!(session.step, Step::SelectingDirection);
        assert!(session.flag("creating_request"));
        assert!(store.get(me, Role::Reviewer).await.is_none());

        // Beginning again discards the old scratch data
        store.begin(me, Role::Submitter, Step::CollectingWallet).await;
        let session = store.get(me, Role::Submitter).await.unwrap();
        assert!(session.data.is_empty());

        assert!(store.end(me, Role::Submitter).await.is_some());
        assert!(store.end(me, Role::Submitter).await.is_none());
    }

    #[tokio::test]
    async fn typed_values() {
        let store = SessionStore::new();
        let mut slot = store.lock(ActorId(3), Role::Reviewer).await;
        assert!(!slot.put("request_id", 12));
        slot.begin(Step::Pricing);
        assert!(slot.put("request_id", 12));
        assert_eq!(slot.session().unwrap().get::<i64>("request_id"), Some(12));
        assert_eq!(slot.session().unwrap().get::<String>("request_id"), None);
        assert_eq!(slot.step(), Some(Step::Pricing));
    }

    #[tokio::test]
    async fn same_key_is_serialized() {
        let store = Arc::new(SessionStore::new());
        let me = ActorId(7);
        let guard = store.lock(me, Role::Submitter).await;

        let s2 = store.clone();
        let waiter = tokio::spawn(async move {
            s2.begin(me, Role::Submitter, Step::CollectingWallet).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // A different role, and a different actor, are not blocked
        store.begin(me, Role::Reviewer, Step::Pricing).await;
        store.begin(ActorId(8), Role::Submitter, Step::CollectingWallet).await;

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(store.get(me, Role::Submitter).await.unwrap().step, Step::CollectingWallet);
    }

    #[tokio::test]
    async fn idle_slots_are_dropped() {
        let store = SessionStore::new();
        for id in 0..10 {
            store.begin(ActorId(id), Role::Submitter, Step::CollectingWallet).await;
        }
        for id in 0..8 {
            store.end(ActorId(id), Role::Submitter).await;
        }
        let held = store.lock(ActorId(20), Role::Reviewer).await;
        assert!(store.get(ActorId(21), Role::Reviewer).await.is_none());
        // Actors 8 and 9 still have a flow in progress, 20 is held, 21 was just created
        assert_eq!(store.slots.lock().unwrap().len(), 4);
        assert_eq!(store.get(ActorId(9), Role::Submitter).await.unwrap().step, Step::CollectingWallet);
        drop(held);
    }

    #[test]
    fn steps_know_their_role() {
        assert_eq!(Step::CollectingProofs.role(), Role::Submitter);
        assert_eq!(Step::ConfirmingPayment.role(), Role::Reviewer);
    }
}
