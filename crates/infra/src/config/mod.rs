//! Configuration loading
//!
//! Loads backend settings from environment variables. Client settings are
//! resolved by [`ClientSettings`](crate::api::ClientSettings) itself.

pub mod loader;

// Re-export commonly used items
pub use loader::{load_object_store_settings, load_object_store_settings_with};
