// ============================================================================
// Module : persistence
// ============================================================================
// Persistance locale des préférences utilisateur (watchlist, favoris)
// ============================================================================

pub mod favorites; // Ids favoris
pub mod store;     // Trait KeyValueStore + implémentations mémoire / fichier
pub mod watchlist; // Watchlist write-through

pub use favorites::Favorites;
pub use store::{FileStore, KeyValueStore, MemoryStore, FAVORITES_KEY, WATCHLIST_KEY};
pub use watchlist::Watchlist;
