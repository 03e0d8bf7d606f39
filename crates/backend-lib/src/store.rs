// ============================
// dropmate-backend-lib/src/store.rs
// ============================
//! In-memory locker and request records.
//!
//! Every entry lives for the lifetime of the process. Callers that need a
//! check-and-set (deciding a request, flipping a locker flag) take the
//! per-key write guard from [`StateStore::locker_mut`] or
//! [`StateStore::request_mut`] and finish the mutation, including any
//! publish, before releasing it.
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use dropmate_common::{AccessRequest, Locker, RequestStatus};
use rand::Rng;

pub type LockerId = String;
pub type RequestId = String;

/// Alphabet and length of generated request ids (nanoid-compatible).
const ID_ALPHABET: &[u8] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";
const ID_LEN: usize = 10;

/// Process-lifetime store for lockers and requests.
#[derive(Default)]
pub struct StateStore {
    lockers: DashMap<LockerId, Locker>,
    requests: DashMap<RequestId, AccessRequest>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a locker, creating it with defaults on first reference.
    pub fn locker(&self, locker_id: &str) -> Locker {
        self.locker_mut(locker_id).value().clone()
    }

    /// Write guard on a locker, creating it with defaults on first reference.
    pub fn locker_mut(&self, locker_id: &str) -> RefMut<'_, LockerId, Locker> {
        self.lockers
            .entry(locker_id.to_string())
            .or_insert_with(|| Locker::new(locker_id))
    }

    pub fn request(&self, request_id: &str) -> Option<AccessRequest> {
        self.requests.get(request_id).map(|entry| entry.value().clone())
    }

    pub fn request_mut(&self, request_id: &str) -> Option<RefMut<'_, RequestId, AccessRequest>> {
        self.requests.get_mut(request_id)
    }

    /// Store a new request under a freshly drawn id.
    pub fn create_request(&self, locker_id: &str, status: RequestStatus) -> AccessRequest {
        loop {
            let request_id = generate_request_id();
            if let Entry::Vacant(slot) = self.requests.entry(request_id.clone()) {
                let request = AccessRequest {
                    request_id,
                    locker_id: locker_id.to_string(),
                    status,
                    created_at: chrono::Utc::now().timestamp_millis(),
                };
                slot.insert(request.clone());
                return request;
            }
            tracing::debug!(%request_id, "request id collision, drawing again");
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// All requests that refer to `locker_id`, oldest first.
    pub fn requests_for(&self, locker_id: &str) -> Vec<AccessRequest> {
        let mut found: Vec<AccessRequest> = self
            .requests
            .iter()
            .filter(|entry| entry.locker_id == locker_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|request| request.created_at);
        found
    }
}

fn generate_request_id() -> RequestId {
    let mut rng = rand::rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockers_are_created_lazily_with_defaults() {
        let store = StateStore::new();
        for id in ["LOCKER001", "L1", "ตู้-2"] {
            let locker = store.locker(id);
            assert_eq!(locker.locker_id, id);
            assert!(!locker.disabled);
            assert!(!locker.door_open);
        }
    }

    #[test]
    fn locker_mutation_is_visible_to_readers() {
        let store = StateStore::new();
        store.locker_mut("L1").disabled = true;
        assert!(store.locker("L1").disabled);
        assert!(!store.locker("L2").disabled);
    }

    #[test]
    fn created_requests_are_pending_and_unique() {
        let store = StateStore::new();
        let a = store.create_request("L1", RequestStatus::Pending);
        let b = store.create_request("L1", RequestStatus::Pending);

        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.request_id.len(), ID_LEN);
        assert!(a.request_id.bytes().all(|c| ID_ALPHABET.contains(&c)));
        assert_eq!(store.request(&a.request_id), Some(a.clone()));
        assert_eq!(store.request_count(), 2);
        assert_eq!(store.requests_for("L1").len(), 2);
        assert!(store.requests_for("L2").is_empty());
    }

    #[test]
    fn unknown_request_is_absent() {
        let store = StateStore::new();
        assert!(store.request("nope").is_none());
        assert!(store.request_mut("nope").is_none());
    }
}
