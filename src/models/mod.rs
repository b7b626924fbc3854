// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod coin;            // Snapshot de marché d'une crypto
pub mod market;          // Stats globales et prix ponctuel
pub mod overlay;         // Favoris + prix live, joints au rendu
pub mod watchlist_entry; // Entrée persistée de la watchlist

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use coindeck::models::coin::CoinRecord;
// On peut faire : use coindeck::models::CoinRecord;
pub use coin::{CoinRecord, Sparkline, Timeframe};
pub use market::{GlobalStats, SimplePrice};
pub use overlay::{CoinOverlay, CoinView, LivePrice};
pub use watchlist_entry::WatchlistEntry;
