//! Core traits for the reconciliation executor
//!
//! - [`CollectionClient`]: remote collection read/add/remove seam
//! - [`Selector`] / [`Entry`]: diffing vocabulary
//! - [`Resource`]: host-facing Create/Read/Update/Delete lifecycle

pub mod collection_client;
pub mod resource;

pub use collection_client::{CollectionClient, Entry, MatchAll, Selector};
pub use resource::Resource;
