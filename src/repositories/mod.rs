pub use self::{
    product::ProductRepository,
    repo::{RepoRepository, Stored},
    settings::SettingsRepository,
    subscription::Subscription,
};

mod file;
mod product;
mod repo;
mod settings;
mod subscription;
