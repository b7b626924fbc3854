// ============================================================================
// Structures : GlobalStats, SimplePrice
// ============================================================================
// Statistiques globales du marché et prix ponctuel d'une crypto
// ============================================================================

use serde::{Deserialize, Serialize};

/// Statistiques agrégées de tout le marché crypto
///
/// CONCEPT RUST : #[derive(Default)]
/// - Toutes les valeurs à zéro
/// - C'est exactement le fallback affiché quand /global échoue
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalStats {
    pub active_cryptocurrencies: u64,

    /// Capitalisation totale dans la devise de référence
    pub total_market_cap: f64,

    /// Volume total sur 24h
    pub total_volume: f64,

    /// Dominance de Bitcoin en %
    pub btc_dominance: f64,

    /// Dominance d'Ethereum en %
    pub eth_dominance: f64,

    /// Variation de la capitalisation totale sur 24h en %
    pub market_cap_change_percentage_24h: f64,
}

impl GlobalStats {
    /// Vrai si les stats viennent d'une vraie réponse (pas du fallback)
    pub fn is_available(&self) -> bool {
        self.active_cryptocurrencies > 0
    }
}

/// Réponse de /simple/price pour un identifiant
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SimplePrice {
    pub usd: f64,

    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}
