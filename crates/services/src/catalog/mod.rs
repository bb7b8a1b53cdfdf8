mod local;
mod service;

pub use crate::error::CatalogError;
pub use local::{Keyed, LocalCollection};
pub use service::CatalogService;
