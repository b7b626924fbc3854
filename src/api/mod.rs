// ============================================================================
// Module : api
// ============================================================================
// Ce module contient le client de l'API de marché (CoinGecko)
// ============================================================================

pub mod coingecko; // Client API CoinGecko

// Re-export des types principaux
pub use coingecko::{CoinGeckoClient, MarketsQuery};
