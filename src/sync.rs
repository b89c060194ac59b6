use std::future::Future;

use anyhow::Result;
use tracing::{info, instrument};

use crate::repositories::{ProductRepository, RepoRepository};

/// Operations of the background sync service that the repository sheet relies on.
pub trait SyncBinder {
    /// Remove a repository together with everything synced from it. Returns `false` if there was
    /// no such repository.
    fn delete_repository(&self, id: u64) -> impl Future<Output = Result<bool>> + Send;
}

/// Sync binder working directly on the local stores.
#[derive(Clone)]
pub struct LocalSync {
    repos: RepoRepository,
    products: ProductRepository,
}

impl LocalSync {
    pub fn new(repos: RepoRepository, products: ProductRepository) -> Self {
        Self { repos, products }
    }
}

impl SyncBinder for LocalSync {
    #[instrument(skip(self))]
    async fn delete_repository(&self, id: u64) -> Result<bool> {
        let removed = self.products.remove_for(id).await?;
        let deleted = self.repos.delete(id).await?;

        info!(deleted, products = removed, "deleted repository");

        Ok(deleted)
    }
}
