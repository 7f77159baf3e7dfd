//! Local settings persistence.
//!
//! Settings share the counter's store under their own key but are never
//! reconciled or published.

use clicker_sync_types::Settings;

use crate::store::{StateStore, StoreError};

/// Load settings, falling back to defaults when absent or unreadable.
pub async fn load_settings<S: StateStore + ?Sized>(store: &S, key: &str) -> Settings {
    match store.get(key).await {
        Ok(Some(payload)) => Settings::from_payload(&payload),
        Ok(None) => Settings::default(),
        Err(e) => {
            tracing::warn!("Failed to read settings, using defaults: {}", e);
            Settings::default()
        }
    }
}

/// Persist settings under `key`.
pub async fn save_settings<S: StateStore + ?Sized>(
    store: &S,
    key: &str,
    settings: &Settings,
) -> Result<(), StoreError> {
    store.put(key, settings.to_payload()).await
}
