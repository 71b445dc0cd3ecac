pub mod admin;
pub mod health;
pub mod metrics;
pub mod nodes;
pub mod sync;
pub mod upload;
