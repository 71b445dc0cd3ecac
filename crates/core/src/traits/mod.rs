pub mod filestore;
pub mod notifier;
pub mod repository;

pub use filestore::*;
pub use notifier::*;
pub use repository::*;
