use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{RwLock, watch};
use tracing::debug;

use super::{Subscription, file};
use crate::models::RepositoryRecord;

type RecordSender = watch::Sender<Option<RepositoryRecord>>;

/// Storage of all configured repositories, kept in memory and persisted as a single JSON file.
#[derive(Clone)]
pub struct RepoRepository {
    inner: Arc<Inner>,
}

struct Inner {
    file: Utf8PathBuf,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    records: BTreeMap<u64, RepositoryRecord>,
    watchers: HashMap<u64, RecordSender>,
}

/// Outcome of storing a repository whose address must not belong to any other repository.
#[derive(Debug, PartialEq)]
pub enum Stored {
    Saved(RepositoryRecord),
    /// The address is already used by the repository with this ID.
    AddressInUse(u64),
}

impl State {
    fn notify(&mut self, id: u64) {
        self.watchers.retain(|_, tx| !tx.is_closed());

        if let Some(tx) = self.watchers.get(&id) {
            tx.send_replace(self.records.get(&id).cloned());
        }
    }

    fn watch(&mut self, id: u64) -> watch::Receiver<Option<RepositoryRecord>> {
        self.watchers.retain(|_, tx| !tx.is_closed());

        let current = self.records.get(&id).cloned();
        self.watchers
            .entry(id)
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }

    /// ID of another repository than `except` that uses the address as main address or mirror.
    fn address_owner(&self, address: &str, except: Option<u64>) -> Option<u64> {
        self.records
            .values()
            .filter(|r| Some(r.id) != except)
            .find(|r| r.address == address || r.mirrors.iter().any(|m| m == address))
            .map(|r| r.id)
    }

    fn next_id(&self) -> u64 {
        self.records.last_key_value().map_or(1, |(id, _)| id + 1)
    }
}

impl RepoRepository {
    pub async fn open(dir: &Utf8Path) -> Result<Self> {
        let file = dir.join("repos.json");
        let records = file::load::<Vec<RepositoryRecord>>(&file)
            .await
            .context("failed loading repositories")?;

        debug!(count = records.len(), "loaded repositories");

        Ok(Self {
            inner: Arc::new(Inner {
                file,
                state: RwLock::new(State {
                    records: records.into_iter().map(|r| (r.id, r)).collect(),
                    watchers: HashMap::new(),
                }),
            }),
        })
    }

    pub async fn list(&self) -> Vec<RepositoryRecord> {
        self.inner.state.read().await.records.values().cloned().collect()
    }

    pub async fn get(&self, id: u64) -> Option<RepositoryRecord> {
        self.inner.state.read().await.records.get(&id).cloned()
    }

    /// Observe a single repository. The value turns `None` once the repository is deleted.
    pub async fn subscribe(&self, id: u64) -> Subscription<Option<RepositoryRecord>> {
        Subscription::new(self.inner.state.write().await.watch(id))
    }

    /// Store a new repository, assigning it the next free ID.
    pub async fn create(&self, mut record: RepositoryRecord) -> Result<RepositoryRecord> {
        let mut state = self.inner.state.write().await;

        record.id = state.next_id();
        self.store(&mut state, record.clone()).await?;

        Ok(record)
    }

    /// Store a new repository unless its address is already in use.
    pub async fn create_unique(&self, mut record: RepositoryRecord) -> Result<Stored> {
        let mut state = self.inner.state.write().await;

        if let Some(other) = state.address_owner(&record.address, None) {
            return Ok(Stored::AddressInUse(other));
        }

        record.id = state.next_id();
        self.store(&mut state, record.clone()).await?;

        Ok(Stored::Saved(record))
    }

    /// Replace an existing repository. Returns `false` if it doesn't exist.
    pub async fn update(&self, record: RepositoryRecord) -> Result<bool> {
        let mut state = self.inner.state.write().await;

        if !state.records.contains_key(&record.id) {
            return Ok(false);
        }

        self.store(&mut state, record).await?;

        Ok(true)
    }

    /// Replace an existing repository unless another one already uses its address. Returns
    /// `None` if it doesn't exist.
    pub async fn update_unique(&self, record: RepositoryRecord) -> Result<Option<Stored>> {
        let mut state = self.inner.state.write().await;

        if !state.records.contains_key(&record.id) {
            return Ok(None);
        }

        if let Some(other) = state.address_owner(&record.address, Some(record.id)) {
            return Ok(Some(Stored::AddressInUse(other)));
        }

        self.store(&mut state, record.clone()).await?;

        Ok(Some(Stored::Saved(record)))
    }

    /// Remove a repository. Returns `false` if it didn't exist.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        let mut state = self.inner.state.write().await;

        let Some(old) = state.records.remove(&id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&state).await {
            state.records.insert(id, old);
            return Err(e);
        }

        state.notify(id);

        Ok(true)
    }

    /// Insert or replace the record and persist, restoring the previous state if writing fails.
    async fn store(&self, state: &mut State, record: RepositoryRecord) -> Result<()> {
        let id = record.id;
        let old = state.records.insert(id, record);

        if let Err(e) = self.persist(state).await {
            match old {
                Some(old) => state.records.insert(id, old),
                None => state.records.remove(&id),
            };
            return Err(e);
        }

        state.notify(id);

        Ok(())
    }

    async fn persist(&self, state: &State) -> Result<()> {
        let records = state.records.values().collect::<Vec<_>>();
        file::save(&self.inner.file, &records)
            .await
            .context("failed saving repositories")
    }
}
