use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{RwLock, watch};
use tracing::debug;

use super::{Subscription, file};

/// Package names of the apps each repository provides.
#[derive(Clone)]
pub struct ProductRepository {
    inner: Arc<Inner>,
}

struct Inner {
    file: Utf8PathBuf,
    state: RwLock<State>,
}

struct State {
    products: BTreeMap<u64, BTreeSet<String>>,
    watchers: HashMap<u64, watch::Sender<u64>>,
}

impl State {
    fn count(&self, repo_id: u64) -> u64 {
        self.products
            .get(&repo_id)
            .map_or(0, |packages| packages.len() as u64)
    }

    fn notify(&mut self, repo_id: u64) {
        self.watchers.retain(|_, tx| !tx.is_closed());

        if let Some(tx) = self.watchers.get(&repo_id) {
            tx.send_replace(self.count(repo_id));
        }
    }
}

impl ProductRepository {
    pub async fn open(dir: &Utf8Path) -> Result<Self> {
        let file = dir.join("products.json");
        let products = file::load::<BTreeMap<u64, BTreeSet<String>>>(&file)
            .await
            .context("failed loading products")?;

        debug!(repos = products.len(), "loaded products");

        Ok(Self {
            inner: Arc::new(Inner {
                file,
                state: RwLock::new(State {
                    products,
                    watchers: HashMap::new(),
                }),
            }),
        })
    }

    pub async fn count(&self, repo_id: u64) -> u64 {
        self.inner.state.read().await.count(repo_id)
    }

    /// Observe the amount of apps a repository provides.
    pub async fn subscribe_count(&self, repo_id: u64) -> Subscription<u64> {
        let mut state = self.inner.state.write().await;
        state.watchers.retain(|_, tx| !tx.is_closed());

        let current = state.count(repo_id);
        let rx = state
            .watchers
            .entry(repo_id)
            .or_insert_with(|| watch::channel(current).0)
            .subscribe();

        Subscription::new(rx)
    }

    /// Replace the full product list of a repository, as done after a sync.
    pub async fn replace(
        &self,
        repo_id: u64,
        packages: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        let mut state = self.inner.state.write().await;
        let packages = packages.into_iter().collect::<BTreeSet<_>>();

        let old = if packages.is_empty() {
            state.products.remove(&repo_id)
        } else {
            state.products.insert(repo_id, packages)
        };

        if let Err(e) = self.persist(&state).await {
            match old {
                Some(old) => state.products.insert(repo_id, old),
                None => state.products.remove(&repo_id),
            };
            return Err(e);
        }

        state.notify(repo_id);

        Ok(())
    }

    /// Drop all products of a repository, returning how many there were.
    pub async fn remove_for(&self, repo_id: u64) -> Result<u64> {
        let mut state = self.inner.state.write().await;

        let Some(old) = state.products.remove(&repo_id) else {
            return Ok(0);
        };
        let removed = old.len() as u64;

        if let Err(e) = self.persist(&state).await {
            state.products.insert(repo_id, old);
            return Err(e);
        }

        state.notify(repo_id);

        Ok(removed)
    }

    async fn persist(&self, state: &State) -> Result<()> {
        file::save(&self.inner.file, &state.products)
            .await
            .context("failed saving products")
    }
}
