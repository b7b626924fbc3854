// ============================================================================
// Structure : Favorites
// ============================================================================
// Ids des cryptos marquées en favori (étoile), persistés en write-through.
// Une écriture ratée annule la bascule
// ============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::persistence::store::{load_json_list, save_json_list, KeyValueStore, FAVORITES_KEY};

/// Favoris persistés, dans l'ordre où ils ont été ajoutés
pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
    ids: Vec<String>,
}

impl Favorites {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut ids: Vec<String> = load_json_list(store.as_ref(), FAVORITES_KEY);
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));

        info!(count = ids.len(), "Favorites loaded");
        Self { store, ids }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.ids.iter().any(|f| f == id)
    }

    /// Bascule l'état favori d'un id
    ///
    /// Retourne le nouvel état (true = favori)
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let previous = self.ids.clone();
        let now_favorite = if let Some(position) = self.ids.iter().position(|f| f == id) {
            self.ids.remove(position);
            false
        } else {
            self.ids.push(id.to_string());
            true
        };

        if let Err(e) = save_json_list(self.store.as_ref(), FAVORITES_KEY, &self.ids) {
            warn!(coin = %id, "Favorites write failed, toggle rolled back");
            self.ids = previous;
            return Err(e);
        }

        debug!(coin = %id, favorite = now_favorite, "Favorite toggled");
        Ok(now_favorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryStore;

    #[test]
    fn test_toggle_and_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut favorites = Favorites::load(store.clone());

        assert!(favorites.toggle("bitcoin").unwrap());
        assert!(favorites.toggle("ethereum").unwrap());
        assert!(!favorites.toggle("bitcoin").unwrap());

        let reloaded = Favorites::load(store.clone());
        assert_eq!(reloaded.ids(), &["ethereum".to_string()]);
        assert!(reloaded.is_favorite("ethereum"));
        assert!(!reloaded.is_favorite("bitcoin"));

        // Format du stockage : tableau JSON d'ids
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some(r#"["ethereum"]"#));
    }

    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("read-only store")
        }

        fn remove(&self, _key: &str) -> Result<()> {
            anyhow::bail!("read-only store")
        }
    }

    #[test]
    fn test_failed_write_rolls_back_toggle() {
        let inner = MemoryStore::new();
        inner.set(FAVORITES_KEY, r#"["bitcoin"]"#).unwrap();
        let mut favorites = Favorites::load(Arc::new(ReadOnlyStore(inner)));

        assert!(favorites.toggle("ethereum").is_err());
        assert!(!favorites.is_favorite("ethereum"));

        assert!(favorites.toggle("bitcoin").is_err());
        assert!(favorites.is_favorite("bitcoin"));
        assert_eq!(favorites.ids(), &["bitcoin".to_string()]);
    }

    #[test]
    fn test_corrupted_favorites_load_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(FAVORITES_KEY, "{\"oops\": 1}").unwrap();

        let favorites = Favorites::load(store);
        assert!(favorites.ids().is_empty());
    }
}
