// ============================
// dropmate-backend-lib/src/processor.rs
// ============================
//! Locker/request state machine.
//!
//! Every operation finishes its read-modify-write and the matching publish
//! while holding the store's per-key guard; only then does it await the
//! owner notification. Two racing decisions on one request are therefore
//! serialized, and the loser sees [`AppError::AlreadyDecided`].
//!
//! Guards are always taken in the order lockers -> requests -> fan-out.
use dashmap::DashMap;
use dropmate_common::{AccessRequest, Locker, RequestStatus, StreamEvent};
use metrics::counter;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::commands::help_text;
use crate::error::AppError;
use crate::fanout::{Hub, Subscriber, Subscription, Topic};
use crate::messaging::{Messenger, OutboundMessage};
use crate::metrics::{
    LOCKER_COMMAND, NOTIFY_FAILED, REQUEST_CREATED, REQUEST_DECIDED, REQUEST_REJECTED,
};
use crate::store::StateStore;

/// How an operation confirms itself to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack<'a> {
    /// Push a new message to the owner (HTTP link flows)
    Push,
    /// Answer the inbound chat event (webhook flows)
    Reply(&'a str),
    /// Say nothing
    Silent,
}

impl<'a> Ack<'a> {
    /// Reply when the event carried a token, otherwise stay silent.
    pub fn reply_to(reply_token: Option<&'a str>) -> Self {
        reply_token.map_or(Ack::Silent, Ack::Reply)
    }
}

/// Owner's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    fn status(self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Deny => RequestStatus::Denied,
        }
    }
}

/// Result of an owner-initiated unlock.
#[derive(Debug, Clone)]
pub struct Unlocked {
    pub request: AccessRequest,
    pub locker: Locker,
}

pub struct Processor {
    store: Arc<StateStore>,
    hub: Arc<Hub>,
    messenger: Arc<dyn Messenger>,
    owner_user_id: String,
    base_url: Url,
    door_auto_close: Option<Duration>,
    /// Unlock counter per locker; a pending auto-close only fires for the latest unlock.
    door_generations: Arc<DashMap<String, u64>>,
}

impl Processor {
    pub fn new(
        store: Arc<StateStore>,
        hub: Arc<Hub>,
        messenger: Arc<dyn Messenger>,
        owner_user_id: impl Into<String>,
        base_url: Url,
    ) -> Self {
        Self {
            store,
            hub,
            messenger,
            owner_user_id: owner_user_id.into(),
            base_url,
            door_auto_close: None,
            door_generations: Arc::new(DashMap::new()),
        }
    }

    /// Re-close the door this long after the latest unlock.
    pub fn with_door_auto_close(mut self, delay: Option<Duration>) -> Self {
        self.door_auto_close = delay;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn is_owner(&self, user_id: Option<&str>) -> bool {
        user_id == Some(self.owner_user_id.as_str())
    }

    /// Absolute link under `BASE_URL` with the given query parameters.
    pub fn link(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(endpoint);
        }
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
        url.into()
    }

    /// Visitor scan: open a pending request unless the locker is disabled.
    pub async fn request_access(&self, locker_id: &str) -> Result<AccessRequest, AppError> {
        let request = {
            let locker = self.store.locker_mut(locker_id);
            if locker.disabled {
                counter!(REQUEST_REJECTED).increment(1);
                info!(locker_id, "scan rejected, QR disabled");
                return Err(AppError::LockerDisabled(locker_id.to_string()));
            }
            self.store.create_request(locker_id, RequestStatus::Pending)
        };
        counter!(REQUEST_CREATED).increment(1);
        info!(request_id = %request.request_id, locker_id, "access requested");

        self.notify_new_request(&request).await;
        Ok(request)
    }

    pub async fn approve(&self, request_id: &str) -> Result<AccessRequest, AppError> {
        self.decide(request_id, Decision::Approve).await
    }

    pub async fn deny(&self, request_id: &str) -> Result<AccessRequest, AppError> {
        self.decide(request_id, Decision::Deny).await
    }

    /// Move a pending request to its terminal status, exactly once.
    pub async fn decide(
        &self,
        request_id: &str,
        decision: Decision,
    ) -> Result<AccessRequest, AppError> {
        let request = {
            let mut entry = self
                .store
                .request_mut(request_id)
                .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))?;
            if entry.status.is_terminal() {
                return Err(AppError::AlreadyDecided {
                    request_id: request_id.to_string(),
                    status: entry.status,
                });
            }
            entry.status = decision.status();
            let request = entry.value().clone();
            self.hub.publish(
                &Topic::Request(request.request_id.clone()),
                &StreamEvent::RequestUpdate(request.clone()),
            );
            request
        };
        counter!(REQUEST_DECIDED, "status" => request.status.as_str()).increment(1);
        info!(
            request_id,
            locker_id = %request.locker_id,
            status = %request.status,
            "request decided"
        );

        let (rid, lid) = (&request.request_id, &request.locker_id);
        let text = match decision {
            Decision::Approve => format!("✅ อนุมัติคำขอ {rid} ของตู้ {lid}"),
            Decision::Deny => format!("❌ ปฏิเสธคำขอ {rid} ของตู้ {lid}"),
        };
        self.acknowledge(Ack::Push, text).await;
        Ok(request)
    }

    /// Open or close the QR gate.
    pub async fn set_locker_disabled(
        &self,
        locker_id: &str,
        disabled: bool,
        ack: Ack<'_>,
    ) -> Locker {
        let locker = update_locker(&self.store, &self.hub, locker_id, |l| {
            l.disabled = disabled
        });
        let command = if disabled { "disable" } else { "enable" };
        counter!(LOCKER_COMMAND, "command" => command).increment(1);
        info!(locker_id, disabled, "QR gate changed");

        let text = if disabled {
            format!("⛔ ปิด QR ของตู้ {locker_id} แล้ว")
        } else {
            format!("✅ เปิด QR ของตู้ {locker_id} แล้ว")
        };
        self.acknowledge(ack, text).await;
        locker
    }

    /// Record the physical door state.
    pub fn set_door_open(&self, locker_id: &str, open: bool) -> Locker {
        let locker = update_locker(&self.store, &self.hub, locker_id, |l| l.door_open = open);
        let command = if open { "door_open" } else { "door_close" };
        counter!(LOCKER_COMMAND, "command" => command).increment(1);
        info!(locker_id, open, "door state changed");
        locker
    }

    /// Owner-initiated unlock: an already approved request plus an open door.
    pub async fn unlock(&self, locker_id: &str, ack: Ack<'_>) -> Unlocked {
        let unlocked = {
            let mut locker = self.store.locker_mut(locker_id);
            let request = self.store.create_request(locker_id, RequestStatus::Approved);
            locker.door_open = true;
            if let Some(delay) = self.door_auto_close {
                let generation = self.next_door_generation(locker_id);
                self.schedule_door_close(locker_id, delay, generation);
            }
            let locker = locker.value().clone();
            self.hub.publish(
                &Topic::Locker(locker_id.to_string()),
                &StreamEvent::LockerUpdate(locker.clone()),
            );
            self.hub.publish(
                &Topic::Request(request.request_id.clone()),
                &StreamEvent::RequestUpdate(request.clone()),
            );
            Unlocked { request, locker }
        };
        counter!(LOCKER_COMMAND, "command" => "unlock").increment(1);
        info!(locker_id, request_id = %unlocked.request.request_id, "locker unlocked");

        let text = format!(
            "🔓 ปลดล็อกตู้ {locker_id}\nrequest_id: {}",
            unlocked.request.request_id
        );
        self.acknowledge(ack, text).await;
        unlocked
    }

    /// Tell the owner the QR and door state of a locker.
    pub async fn report_status(&self, locker_id: &str, ack: Ack<'_>) -> Locker {
        let locker = self.store.locker(locker_id);
        let qr = if locker.disabled { "ปิด QR" } else { "เปิดรับคำขอ" };
        let door = if locker.door_open { "ประตูเปิด" } else { "ประตูปิด" };
        self.acknowledge(ack, format!("ℹ️ ตู้ {locker_id}\n• QR: {qr}\n• ตู้: {door}"))
            .await;
        locker
    }

    /// Answer with the command list.
    pub async fn send_help(&self, ack: Ack<'_>, default_locker_id: &str) {
        self.acknowledge(ack, help_text(default_locker_id)).await;
    }

    /// Follow a request: snapshot first, then every update.
    pub fn watch_request(
        &self,
        request_id: &str,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<Subscription, AppError> {
        let entry = self
            .store
            .request_mut(request_id)
            .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))?;
        let snapshot = StreamEvent::RequestUpdate(entry.value().clone());
        Ok(self
            .hub
            .subscribe(Topic::Request(request_id.to_string()), subscriber, &snapshot))
    }

    /// Follow a locker: snapshot first, then every update.
    pub fn watch_locker(&self, locker_id: &str, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let locker = self.store.locker_mut(locker_id);
        let snapshot = StreamEvent::LockerUpdate(locker.value().clone());
        self.hub
            .subscribe(Topic::Locker(locker_id.to_string()), subscriber, &snapshot)
    }

    /// Send `text` to the owner as `ack` says. Failures are logged only.
    pub async fn acknowledge(&self, ack: Ack<'_>, text: String) {
        self.deliver(ack, OutboundMessage::text(text)).await;
    }

    async fn deliver(&self, ack: Ack<'_>, message: OutboundMessage) {
        let result = match ack {
            Ack::Push => self.messenger.push(&self.owner_user_id, vec![message]).await,
            Ack::Reply(token) => self.messenger.reply(token, vec![message]).await,
            Ack::Silent => return,
        };
        if let Err(e) = result {
            counter!(NOTIFY_FAILED).increment(1);
            warn!(error = %e, "owner notification failed");
        }
    }

    async fn notify_new_request(&self, request: &AccessRequest) {
        let rid = request.request_id.as_str();
        let lid = request.locker_id.as_str();
        let message = OutboundMessage::text(format!(
            "📣 มีคำขอจากตู้ {lid}\nrequest_id: {rid}\n\nต้องการอนุมัติไหม?"
        ))
        .with_links([
            ("✅ อนุมัติ", self.link("decision", &[("request_id", rid), ("action", "approve")])),
            ("❌ ปฏิเสธ", self.link("decision", &[("request_id", rid), ("action", "deny")])),
            ("⛔ ปิด QR", self.link("decision", &[("locker_id", lid), ("action", "disable")])),
        ]);
        self.deliver(Ack::Push, message).await;
    }

    /// Caller holds the locker guard.
    fn next_door_generation(&self, locker_id: &str) -> u64 {
        let mut generation = self.door_generations.entry(locker_id.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn schedule_door_close(&self, locker_id: &str, delay: Duration, generation: u64) {
        let store = Arc::clone(&self.store);
        let hub = Arc::clone(&self.hub);
        let generations = Arc::clone(&self.door_generations);
        let locker_id = locker_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut locker = store.locker_mut(&locker_id);
            let latest = generations.get(&locker_id).map(|g| *g);
            if latest != Some(generation) {
                return;
            }
            locker.door_open = false;
            hub.publish(
                &Topic::Locker(locker_id.clone()),
                &StreamEvent::LockerUpdate(locker.value().clone()),
            );
            drop(locker);
            info!(locker_id = %locker_id, "door closed automatically");
        });
    }
}

/// Mutate a locker and publish the result under the same guard.
fn update_locker(
    store: &StateStore,
    hub: &Hub,
    locker_id: &str,
    apply: impl FnOnce(&mut Locker),
) -> Locker {
    let mut locker = store.locker_mut(locker_id);
    apply(locker.value_mut());
    let locker = locker.value().clone();
    hub.publish(
        &Topic::Locker(locker_id.to_string()),
        &StreamEvent::LockerUpdate(locker.clone()),
    );
    locker
}
