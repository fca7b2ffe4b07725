//! Per-origin connection store.
//!
//! All reads and mutations go through an in-memory [`DappState`] map guarded
//! by a mutex. Every mutation broadcasts a full snapshot to subscribers and
//! schedules a persist through a single-writer task: while a write is in
//! flight further mutations only mark the state dirty, so any burst of
//! mutations costs at most one additional write of the final state.

use crate::{error::StoreError, storage::StorageBackend};
use alloy_primitives::{Address, ChainId};
use dapp_bridge_core::{ConnectedAccount, ConnectionProps, DappConnection, DappState};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, Notify, OnceCell};
use tracing::error;

/// Capacity of the snapshot broadcast. Subscribers that lag past this see a
/// `Lagged` error and should resubscribe for a fresh snapshot.
const EVENT_CAPACITY: usize = 16;

#[derive(Default)]
struct PersistFlags {
    writing: bool,
    dirty: bool,
}

struct Inner {
    state: Mutex<DappState>,
    storage: Arc<dyn StorageBackend>,
    events: broadcast::Sender<DappState>,
    init: OnceCell<()>,
    persist: Mutex<PersistFlags>,
    idle: Notify,
}

/// Handle to the connection store. Cheap to clone.
#[derive(Clone)]
pub struct DappStore {
    inner: Arc<Inner>,
}

impl DappStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(DappState::default()),
                storage,
                events,
                init: OnceCell::new(),
                persist: Mutex::new(PersistFlags::default()),
                idle: Notify::new(),
            }),
        }
    }

    /// Loads the persisted snapshot into memory. Idempotent: concurrent and
    /// repeated calls load at most once.
    ///
    /// A missing snapshot yields an empty state; a snapshot that exists but
    /// does not parse is [`StoreError::Corrupt`] and the store stays
    /// uninitialized.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.inner
            .init
            .get_or_try_init(|| async {
                let state = match self.inner.storage.load().await? {
                    Some(raw) => serde_json::from_str(&raw).map_err(StoreError::Corrupt)?,
                    None => DappState::default(),
                };
                *self.inner.state.lock() = state;
                Ok(())
            })
            .await
            .copied()
    }

    /// Subscribes to full-state snapshots, sent after every mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<DappState> {
        self.inner.events.subscribe()
    }

    /// The connection record for `origin`, if any account is connected.
    pub fn get(&self, origin: &str) -> Result<Option<DappConnection>, StoreError> {
        self.ensure_init()?;
        Ok(self.inner.state.lock().get(origin).cloned())
    }

    /// Every origin that has `address` among its connected accounts.
    pub fn connected_dapps(&self, address: Address) -> Result<Vec<String>, StoreError> {
        self.ensure_init()?;
        Ok(self
            .inner
            .state
            .lock()
            .iter()
            .filter(|(_, record)| record.contains(address))
            .map(|(origin, _)| origin.clone())
            .collect())
    }

    /// Connected addresses for `origin` with the active address first. Empty
    /// when the origin is not connected.
    pub fn ordered_connected_addresses(&self, origin: &str) -> Result<Vec<Address>, StoreError> {
        self.ensure_init()?;
        Ok(self
            .inner
            .state
            .lock()
            .get(origin)
            .map(DappConnection::ordered_addresses)
            .unwrap_or_default())
    }

    /// Connects `account` to `origin` and makes it the active account,
    /// creating the record on first connection. Idempotent per address.
    /// `initial` display metadata is merged last, so caller-supplied fields
    /// win over whatever the record already holds.
    pub fn save_active_account(
        &self,
        origin: &str,
        account: ConnectedAccount,
        chain_id: ChainId,
        initial: Option<ConnectionProps>,
    ) -> Result<(), StoreError> {
        self.mutate(|state| {
            match state.get_mut(origin) {
                Some(record) => record.connect(account),
                None => {
                    state.insert(origin.to_string(), DappConnection::new(account, chain_id));
                }
            }
            if let Some(props) = initial {
                if let Some(record) = state.get_mut(origin) {
                    record.apply_props(props);
                }
            }
        })
    }

    /// Disconnects `origin`. With an address, only that account is removed
    /// and the record is dropped once no accounts remain; with `None` the
    /// whole record is removed regardless of remaining accounts.
    pub fn remove_connection(
        &self,
        origin: &str,
        address: Option<Address>,
    ) -> Result<(), StoreError> {
        self.mutate(|state| match address {
            None => {
                state.remove(origin);
            }
            Some(address) => {
                if let Some(record) = state.get_mut(origin) {
                    if !record.disconnect(address) {
                        state.remove(origin);
                    }
                }
            }
        })
    }

    /// Removes `address` from every origin it is connected to, dropping
    /// records that end up empty.
    pub fn remove_account_connections(&self, address: Address) -> Result<(), StoreError> {
        self.mutate(|state| {
            state.retain(|_, record| !record.contains(address) || record.disconnect(address));
        })
    }

    /// Disconnects every origin.
    pub fn remove_all_connections(&self) -> Result<(), StoreError> {
        self.mutate(DappState::clear)
    }

    /// Makes `address` the active account for every origin it is connected
    /// to. Origins that never connected the address are untouched.
    pub fn update_active_address_for_account(&self, address: Address) -> Result<(), StoreError> {
        self.mutate(|state| {
            for record in state.values_mut().filter(|record| record.contains(address)) {
                record.active_connected_address = address;
            }
        })
    }

    /// Records the chain `origin` last used. No-op for unconnected origins.
    pub fn update_last_chain_id(&self, origin: &str, chain_id: ChainId) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Some(record) = state.get_mut(origin) {
                record.last_chain_id = chain_id;
            }
        })
    }

    /// Updates the display name shown for `origin`. No-op when unconnected.
    pub fn update_display_name(
        &self,
        origin: &str,
        display_name: Option<String>,
    ) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Some(record) = state.get_mut(origin) {
                record.display_name = display_name;
            }
        })
    }

    /// Updates the icon shown for `origin`. No-op when unconnected.
    pub fn update_icon_url(&self, origin: &str, icon_url: Option<String>) -> Result<(), StoreError> {
        self.mutate(|state| {
            if let Some(record) = state.get_mut(origin) {
                record.icon_url = icon_url;
            }
        })
    }

    /// Waits until no persist is in flight or pending.
    pub async fn flush(&self) {
        loop {
            let idle = self.inner.idle.notified();
            {
                let flags = self.inner.persist.lock();
                if !flags.writing && !flags.dirty {
                    return;
                }
            }
            idle.await;
        }
    }

    fn ensure_init(&self) -> Result<(), StoreError> {
        if self.inner.init.initialized() {
            Ok(())
        } else {
            Err(StoreError::Uninitialized)
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut DappState)) -> Result<(), StoreError> {
        self.ensure_init()?;
        let snapshot = {
            let mut state = self.inner.state.lock();
            f(&mut state);
            state.clone()
        };
        // nobody listening is fine
        let _ = self.inner.events.send(snapshot);
        self.schedule_persist();
        Ok(())
    }

    /// Hands the current state to the single-writer task. If a write is
    /// already in flight the state is only marked dirty; the writer picks up
    /// the final state in one more pass.
    fn schedule_persist(&self) {
        {
            let mut flags = self.inner.persist.lock();
            if flags.writing {
                flags.dirty = true;
                return;
            }
            flags.writing = true;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let payload = {
                    let state = inner.state.lock();
                    serde_json::to_string(&*state)
                };
                match payload {
                    Ok(payload) => {
                        if let Err(err) = inner.storage.store(payload).await {
                            error!(target: "bridge::store", %err, "failed to persist connection state");
                        }
                    }
                    Err(err) => {
                        error!(target: "bridge::store", %err, "failed to serialize connection state");
                    }
                }

                let mut flags = inner.persist.lock();
                if flags.dirty {
                    flags.dirty = false;
                    continue;
                }
                flags.writing = false;
                drop(flags);
                inner.idle.notify_waiters();
                return;
            }
        });
    }
}

impl std::fmt::Debug for DappStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DappStore").field("initialized", &self.inner.init.initialized()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStorage, MemoryStorage};
    use alloy_primitives::address;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

    const APP: &str = "https://app.example.org";
    const OTHER: &str = "https://other.example.org";

    async fn fresh_store() -> DappStore {
        let store = DappStore::new(Arc::new(MemoryStorage::new()));
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn ops_require_init() {
        let store = DappStore::new(Arc::new(MemoryStorage::new()));
        assert!(matches!(store.get(APP), Err(StoreError::Uninitialized)));
        store.init().await.unwrap();
        assert_eq!(store.get(APP).unwrap(), None);
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = DappStore::new(Arc::new(MemoryStorage::new()));
        store.init().await.unwrap();
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.init().await.unwrap();
        assert!(store.get(APP).unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_loudly() {
        let store = DappStore::new(Arc::new(MemoryStorage::with_value("not json")));
        assert!(matches!(store.init().await, Err(StoreError::Corrupt(_))));
        // still uninitialized, not silently empty
        assert!(matches!(store.get(APP), Err(StoreError::Uninitialized)));
    }

    #[tokio::test]
    async fn save_and_ordered_addresses() {
        let store = fresh_store().await;
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();

        let record = store.get(APP).unwrap().unwrap();
        assert_eq!(record.active_connected_address, BOB);
        assert_eq!(store.ordered_connected_addresses(APP).unwrap(), vec![BOB, ALICE]);
        assert_eq!(store.ordered_connected_addresses(OTHER).unwrap(), Vec::<Address>::new());

        // reconnecting an existing address only moves the active marker
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        assert_eq!(store.get(APP).unwrap().unwrap().connected_accounts.len(), 2);
        assert_eq!(store.ordered_connected_addresses(APP).unwrap(), vec![ALICE, BOB]);
    }

    #[tokio::test]
    async fn connected_dapps_filters_by_address() {
        let store = fresh_store().await;
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();
        store.save_active_account(OTHER, BOB.into(), 1, None).unwrap();

        let mut dapps = store.connected_dapps(BOB).unwrap();
        dapps.sort();
        assert_eq!(dapps, vec![APP.to_string(), OTHER.to_string()]);
        assert_eq!(store.connected_dapps(ALICE).unwrap(), vec![APP.to_string()]);

        store.remove_account_connections(BOB).unwrap();
        assert!(store.connected_dapps(BOB).unwrap().is_empty());
    }

    #[tokio::test]
    async fn initial_props_merge_on_save() {
        let store = fresh_store().await;
        store
            .save_active_account(
                APP,
                ALICE.into(),
                1,
                Some(ConnectionProps { display_name: Some("Example".into()), icon_url: None }),
            )
            .unwrap();
        let record = store.get(APP).unwrap().unwrap();
        assert_eq!(record.display_name.as_deref(), Some("Example"));
        assert_eq!(record.icon_url, None);

        // later saves only overwrite the fields they supply
        store
            .save_active_account(
                APP,
                BOB.into(),
                1,
                Some(ConnectionProps {
                    icon_url: Some("https://app.example.org/icon.png".into()),
                    display_name: None,
                }),
            )
            .unwrap();
        let record = store.get(APP).unwrap().unwrap();
        assert_eq!(record.display_name.as_deref(), Some("Example"));
        assert_eq!(record.icon_url.as_deref(), Some("https://app.example.org/icon.png"));
    }

    #[tokio::test]
    async fn remove_connection_semantics() {
        let store = fresh_store().await;
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();

        // removing one address keeps the record, reassigns active
        store.remove_connection(APP, Some(BOB)).unwrap();
        let record = store.get(APP).unwrap().unwrap();
        assert_eq!(record.active_connected_address, ALICE);

        // removing the last address drops the record entirely
        store.remove_connection(APP, Some(ALICE)).unwrap();
        assert_eq!(store.get(APP).unwrap(), None);

        // origin-level removal drops the record even with accounts remaining
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();
        store.remove_connection(APP, None).unwrap();
        assert_eq!(store.get(APP).unwrap(), None);
    }

    #[tokio::test]
    async fn remove_account_connections_spans_origins() {
        let store = fresh_store().await;
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();
        store.save_active_account(OTHER, ALICE.into(), 137, None).unwrap();

        store.remove_account_connections(ALICE).unwrap();
        // APP keeps BOB, OTHER had only ALICE and is gone
        assert_eq!(store.ordered_connected_addresses(APP).unwrap(), vec![BOB]);
        assert_eq!(store.get(OTHER).unwrap(), None);
    }

    #[tokio::test]
    async fn update_active_address_only_where_connected() {
        let store = fresh_store().await;
        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();
        store.save_active_account(OTHER, BOB.into(), 1, None).unwrap();

        store.update_active_address_for_account(ALICE).unwrap();
        assert_eq!(store.get(APP).unwrap().unwrap().active_connected_address, ALICE);
        // OTHER never connected ALICE
        assert_eq!(store.get(OTHER).unwrap().unwrap().active_connected_address, BOB);
    }

    #[tokio::test]
    async fn mutations_broadcast_snapshots() {
        let store = fresh_store().await;
        let mut events = store.subscribe();

        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        let snapshot = events.recv().await.unwrap();
        assert!(snapshot.contains_key(APP));

        store.remove_all_connections().unwrap();
        let snapshot = events.recv().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");

        let store = DappStore::new(Arc::new(JsonFileStorage::new(&path)));
        store.init().await.unwrap();
        store.save_active_account(APP, ALICE.into(), 137, None).unwrap();
        store.update_display_name(APP, Some("Example".into())).unwrap();
        store.flush().await;

        let reloaded = DappStore::new(Arc::new(JsonFileStorage::new(&path)));
        reloaded.init().await.unwrap();
        let record = reloaded.get(APP).unwrap().unwrap();
        assert_eq!(record.last_chain_id, 137);
        assert_eq!(record.active_connected_address, ALICE);
        assert_eq!(record.display_name.as_deref(), Some("Example"));
    }

    /// Backend that blocks each write on a semaphore permit and counts them.
    struct GatedStorage {
        writes: AtomicUsize,
        started: AtomicUsize,
        gate: tokio::sync::Semaphore,
        last: Mutex<Option<String>>,
    }

    impl GatedStorage {
        fn new() -> Self {
            Self {
                writes: AtomicUsize::new(0),
                started: AtomicUsize::new(0),
                gate: tokio::sync::Semaphore::new(0),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for GatedStorage {
        async fn load(&self) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn store(&self, payload: String) -> Result<(), StoreError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            *self.last.lock() = Some(payload);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn bursts_coalesce_into_one_trailing_write() {
        let storage = Arc::new(GatedStorage::new());
        let store = DappStore::new(storage.clone());
        store.init().await.unwrap();

        store.save_active_account(APP, ALICE.into(), 1, None).unwrap();
        // wait until the first write is in flight
        while storage.started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // burst of mutations while the write is blocked
        store.save_active_account(APP, BOB.into(), 1, None).unwrap();
        store.update_last_chain_id(APP, 137).unwrap();
        store.save_active_account(OTHER, ALICE.into(), 1, None).unwrap();
        store.update_icon_url(APP, Some("https://app.example.org/icon.png".into())).unwrap();

        storage.gate.add_permits(2);
        store.flush().await;

        // first write plus exactly one coalesced write of the final state
        assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
        let last = storage.last.lock().clone().unwrap();
        let state: DappState = serde_json::from_str(&last).unwrap();
        assert_eq!(state[APP].last_chain_id, 137);
        assert!(state.contains_key(OTHER));
    }
}
