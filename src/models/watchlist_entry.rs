// ============================================================================
// Structure : WatchlistEntry
// ============================================================================
// Une crypto suivie par l'utilisateur, persistée sur disque
//
// CONCEPTS RUST :
// 1. Sous-ensemble : on ne garde que les champs utiles de CoinRecord
// 2. Serialize + Deserialize : l'entrée fait l'aller-retour en JSON
// 3. From<&CoinRecord> : conversion idiomatique depuis un record fetché
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::CoinRecord;

/// Une crypto dans la watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Identifiant CoinGecko, unique dans la watchlist
    pub id: String,

    pub name: String,

    pub symbol: String,

    /// Prix au moment de l'ajout (rafraîchi à chaque fetch)
    #[serde(default)]
    pub current_price: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    #[serde(default)]
    pub market_cap: Option<f64>,

    #[serde(default)]
    pub image: Option<String>,
}

impl WatchlistEntry {
    /// Met à jour les champs de marché depuis un record plus récent
    ///
    /// L'identité (id, nom, symbole) ne change jamais
    pub fn refresh_from(&mut self, coin: &CoinRecord) {
        self.current_price = coin.current_price;
        self.price_change_percentage_24h = coin.price_change_percentage_24h;
        self.market_cap = coin.market_cap;
    }

    pub fn is_positive(&self) -> bool {
        self.price_change_percentage_24h
            .map(|c| c >= 0.0)
            .unwrap_or(false)
    }
}

impl From<&CoinRecord> for WatchlistEntry {
    fn from(coin: &CoinRecord) -> Self {
        Self {
            id: coin.id.clone(),
            name: coin.name.clone(),
            symbol: coin.symbol.clone(),
            current_price: coin.current_price,
            price_change_percentage_24h: coin.price_change_percentage_24h,
            market_cap: coin.market_cap,
            image: coin.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coin_record() {
        let coin = CoinRecord::new("solana", "Solana", "sol")
            .with_price(140.0)
            .with_change(-3.2)
            .with_market_cap(6.5e10);

        let entry = WatchlistEntry::from(&coin);
        assert_eq!(entry.id, "solana");
        assert_eq!(entry.current_price, Some(140.0));
        assert!(!entry.is_positive());
    }

    #[test]
    fn test_refresh_keeps_identity() {
        let coin = CoinRecord::new("solana", "Solana", "sol").with_price(140.0);
        let mut entry = WatchlistEntry::from(&coin);

        let newer = CoinRecord::new("solana", "Renamed", "xxx")
            .with_price(150.0)
            .with_change(7.1);
        entry.refresh_from(&newer);

        assert_eq!(entry.name, "Solana");
        assert_eq!(entry.current_price, Some(150.0));
        assert!(entry.is_positive());
    }
}
