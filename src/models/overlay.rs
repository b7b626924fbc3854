// ============================================================================
// Structure : CoinOverlay
// ============================================================================
// État utilisateur "collé" par-dessus les records fetchés
//
// CONCEPT : Overlay plutôt que mutation
// - Les CoinRecord sont remplacés en bloc à chaque fetch
// - Les favoris et les prix live survivent au refetch car ils sont indexés
//   par id dans des maps séparées
// - La jointure se fait au moment du rendu (voir filter::apply_filters)
// ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{CoinRecord, SimplePrice};

/// Prix rafraîchi à la demande pour une crypto
#[derive(Debug, Clone, PartialEq)]
pub struct LivePrice {
    pub price: f64,
    pub change_24h: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl LivePrice {
    pub fn from_simple(price: SimplePrice, at: DateTime<Utc>) -> Self {
        Self {
            price: price.usd,
            change_24h: price.usd_24h_change,
            last_updated: at,
        }
    }

    /// Âge lisible du prix : "12s ago", "3m ago", "1h ago"
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let seconds = (now - self.last_updated).num_seconds().max(0);
        if seconds < 60 {
            format!("{}s ago", seconds)
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }
}

/// Favoris + prix live, indexés par id de crypto
#[derive(Debug, Clone, Default)]
pub struct CoinOverlay {
    favorites: HashSet<String>,
    live_prices: HashMap<String, LivePrice>,
}

impl CoinOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remplace l'ensemble des favoris (après chargement ou toggle)
    pub fn set_favorites<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.favorites = ids.into_iter().collect();
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn set_live_price(&mut self, id: &str, live: LivePrice) {
        self.live_prices.insert(id.to_string(), live);
    }

    pub fn live_price(&self, id: &str) -> Option<&LivePrice> {
        self.live_prices.get(id)
    }

    /// Jointure : construit la vue d'un record
    pub fn view<'a>(&'a self, coin: &'a CoinRecord) -> CoinView<'a> {
        CoinView {
            coin,
            favorite: self.is_favorite(&coin.id),
            live: self.live_price(&coin.id),
        }
    }
}

/// Record + état utilisateur, tel qu'affiché
///
/// CONCEPT RUST : Lifetime 'a
/// - CoinView emprunte le record et l'overlay, aucune copie
/// - Ne peut pas vivre plus longtemps que les données qu'il référence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinView<'a> {
    pub coin: &'a CoinRecord,
    pub favorite: bool,
    pub live: Option<&'a LivePrice>,
}

impl<'a> CoinView<'a> {
    /// Prix affiché : live s'il existe, sinon celui du snapshot
    pub fn display_price(&self) -> Option<f64> {
        self.live
            .map(|l| l.price)
            .or(self.coin.current_price)
    }

    /// Écart entre le prix live et le prix du snapshot
    pub fn live_delta(&self) -> Option<f64> {
        let live = self.live?;
        let base = self.coin.current_price?;
        Some(live.price - base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_view_joins_overlay() {
        let coin = CoinRecord::new("bitcoin", "Bitcoin", "btc").with_price(100.0);
        let mut overlay = CoinOverlay::new();
        overlay.set_favorites(vec!["bitcoin".to_string()]);

        let view = overlay.view(&coin);
        assert!(view.favorite);
        assert_eq!(view.display_price(), Some(100.0));
        assert_eq!(view.live_delta(), None);

        overlay.set_live_price(
            "bitcoin",
            LivePrice { price: 105.0, change_24h: Some(1.0), last_updated: Utc::now() },
        );
        let view = overlay.view(&coin);
        assert_eq!(view.display_price(), Some(105.0));
        assert_eq!(view.live_delta(), Some(5.0));
        // Le record de base n'est pas touché
        assert_eq!(coin.current_price, Some(100.0));
    }

    #[test]
    fn test_age_label() {
        let now = Utc::now();
        let live = LivePrice { price: 1.0, change_24h: None, last_updated: now - Duration::seconds(42) };
        assert_eq!(live.age_label(now), "42s ago");

        let live = LivePrice { price: 1.0, change_24h: None, last_updated: now - Duration::seconds(125) };
        assert_eq!(live.age_label(now), "2m ago");

        let live = LivePrice { price: 1.0, change_24h: None, last_updated: now - Duration::seconds(7300) };
        assert_eq!(live.age_label(now), "2h ago");
    }
}
