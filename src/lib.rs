#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod de;
pub mod dirs;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod sheet;
pub mod sync;
pub mod text;
pub mod validate;
