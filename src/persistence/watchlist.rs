// ============================================================================
// Structure : Watchlist
// ============================================================================
// Liste des cryptos suivies, persistée en write-through
//
// CONCEPTS RUST :
// 1. Arc<dyn KeyValueStore> : trait object, le même code tourne sur disque
//    ou en mémoire
// 2. Invariant : jamais deux entrées avec le même id
// 3. Write-through : chaque ajout/suppression est écrit immédiatement.
//    Si l'écriture échoue, la modification en mémoire est annulée : la
//    liste affichée reste celle du disque
// ============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::models::{CoinRecord, WatchlistEntry};
use crate::persistence::store::{load_json_list, save_json_list, KeyValueStore, WATCHLIST_KEY};

/// Watchlist persistée
pub struct Watchlist {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<WatchlistEntry>,
}

impl Watchlist {
    /// Charge la watchlist depuis le store (vide si absente ou corrompue)
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<WatchlistEntry> = load_json_list(store.as_ref(), WATCHLIST_KEY);

        // Un fichier édité à la main peut contenir des doublons
        let mut seen = std::collections::HashSet::new();
        entries.retain(|e| seen.insert(e.id.clone()));

        info!(count = entries.len(), "Watchlist loaded");
        Self { store, entries }
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Ids dans l'ordre d'ajout
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&WatchlistEntry> {
        self.entries.get(index)
    }

    /// Ajoute une entrée
    ///
    /// Retourne Ok(false) si l'id est déjà présent (rien n'est écrit)
    pub fn add(&mut self, entry: WatchlistEntry) -> Result<bool> {
        if self.contains(&entry.id) {
            return Ok(false);
        }

        info!(coin = %entry.id, "Adding coin to watchlist");
        self.entries.push(entry);
        if let Err(e) = self.persist() {
            let rolled_back = self.entries.pop();
            warn!(coin = ?rolled_back.map(|e| e.id), "Watchlist write failed, add rolled back");
            return Err(e);
        }
        Ok(true)
    }

    /// Retire une entrée par id
    pub fn remove(&mut self, id: &str) -> Result<Option<WatchlistEntry>> {
        let position = match self.entries.iter().position(|e| e.id == id) {
            Some(position) => position,
            None => return Ok(None),
        };

        let removed = self.entries.remove(position);
        if let Err(e) = self.persist() {
            warn!(coin = %removed.id, "Watchlist write failed, remove rolled back");
            self.entries.insert(position, removed);
            return Err(e);
        }

        info!(coin = %removed.id, "Removed coin from watchlist");
        Ok(Some(removed))
    }

    /// Met à jour les prix des entrées depuis un fetch récent
    ///
    /// Retourne le nombre d'entrées rafraîchies. Pas d'écriture disque :
    /// les prix de la watchlist sont un cache d'affichage
    pub fn refresh_prices(&mut self, coins: &[CoinRecord]) -> usize {
        let mut refreshed = 0;
        for entry in &mut self.entries {
            if let Some(coin) = coins.iter().find(|c| c.id == entry.id) {
                entry.refresh_from(coin);
                refreshed += 1;
            }
        }
        refreshed
    }

    fn persist(&self) -> Result<()> {
        save_json_list(self.store.as_ref(), WATCHLIST_KEY, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryStore;

    /// Store dont les écritures échouent toujours (disque plein, droits...)
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

    fn entry(id: &str) -> WatchlistEntry {
        WatchlistEntry::from(&CoinRecord::new(id, id.to_uppercase(), id).with_price(1.0))
    }

    #[test]
    fn test_round_trip_keeps_order() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut watchlist = Watchlist::load(store.clone());
        assert!(watchlist.is_empty());
        for id in ["solana", "bitcoin", "cardano"] {
            assert!(watchlist.add(entry(id)).unwrap());
        }

        let reloaded = Watchlist::load(store);
        assert_eq!(reloaded.ids(), vec!["solana", "bitcoin", "cardano"]);
        assert_eq!(reloaded.entries(), watchlist.entries());
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut watchlist = Watchlist::load(store);

        assert!(watchlist.add(entry("bitcoin")).unwrap());
        assert!(!watchlist.add(entry("bitcoin")).unwrap());
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn test_remove_writes_through() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut watchlist = Watchlist::load(store.clone());
        watchlist.add(entry("bitcoin")).unwrap();
        watchlist.add(entry("ethereum")).unwrap();

        let removed = watchlist.remove("bitcoin").unwrap();
        assert_eq!(removed.map(|e| e.id), Some("bitcoin".to_string()));
        assert_eq!(watchlist.remove("bitcoin").unwrap(), None);

        let reloaded = Watchlist::load(store);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("ethereum"));
    }

    #[test]
    fn test_failed_write_rolls_back_add_and_remove() {
        let inner = MemoryStore::new();
        let json = serde_json::to_string(&vec![entry("bitcoin"), entry("ethereum")]).unwrap();
        inner.set(WATCHLIST_KEY, &json).unwrap();

        let mut watchlist = Watchlist::load(Arc::new(ReadOnlyStore(inner)));
        assert_eq!(watchlist.ids(), vec!["bitcoin", "ethereum"]);

        assert!(watchlist.add(entry("solana")).is_err());
        assert_eq!(watchlist.ids(), vec!["bitcoin", "ethereum"]);

        // La suppression annulée remet l'entrée à sa place
        assert!(watchlist.remove("bitcoin").is_err());
        assert_eq!(watchlist.ids(), vec!["bitcoin", "ethereum"]);
    }

    #[test]
    fn test_corrupted_storage_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(WATCHLIST_KEY, "definitely not json").unwrap();

        let watchlist = Watchlist::load(store);
        assert!(watchlist.is_empty());
    }

    #[test]
    fn test_duplicates_in_storage_are_dropped() {
        let store = Arc::new(MemoryStore::new());
        let json = serde_json::to_string(&vec![entry("btc"), entry("eth"), entry("btc")]).unwrap();
        store.set(WATCHLIST_KEY, &json).unwrap();

        let watchlist = Watchlist::load(store);
        assert_eq!(watchlist.len(), 2);
    }

    #[test]
    fn test_refresh_prices() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut watchlist = Watchlist::load(store);
        watchlist.add(entry("bitcoin")).unwrap();

        let coins = vec![
            CoinRecord::new("bitcoin", "Bitcoin", "btc").with_price(70000.0),
            CoinRecord::new("ethereum", "Ethereum", "eth").with_price(3000.0),
        ];
        assert_eq!(watchlist.refresh_prices(&coins), 1);
        assert_eq!(watchlist.entries()[0].current_price, Some(70000.0));
    }
}
