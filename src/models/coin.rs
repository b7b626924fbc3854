// ============================================================================
// Structure : CoinRecord
// ============================================================================
// Snapshot des données de marché d'une cryptomonnaie
//
// CONCEPTS RUST :
// 1. #[derive(Deserialize)] : la structure matche directement le JSON de
//    /coins/markets (les noms de champs CoinGecko sont déjà en snake_case)
// 2. Option<f64> : CoinGecko renvoie parfois `null` (market cap inconnue,
//    supply non publiée...). None est trié en dernier par le moteur de tri
// 3. Immutabilité : un CoinRecord n'est jamais modifié après le fetch,
//    il est remplacé en bloc au fetch suivant. Le prix live vit à côté,
//    dans l'overlay (voir overlay.rs)
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Timeframe : période de variation du leaderboard
// ============================================================================

/// Période sur laquelle on classe les hausses et les baisses
///
/// CONCEPT RUST : enum + méthodes de cycle
/// - all() / next() / label() pour parcourir les valeurs au clavier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    H24,
    D7,
    D30,
}

impl Timeframe {
    pub fn all() -> &'static [Timeframe] {
        &[Timeframe::H24, Timeframe::D7, Timeframe::D30]
    }

    /// Période suivante (boucle)
    pub fn next(&self) -> Timeframe {
        match self {
            Timeframe::H24 => Timeframe::D7,
            Timeframe::D7 => Timeframe::D30,
            Timeframe::D30 => Timeframe::H24,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::H24 => "24h",
            Timeframe::D7 => "7d",
            Timeframe::D30 => "30d",
        }
    }

    /// Valeur du paramètre `price_change_percentage` de /coins/markets
    pub fn param(&self) -> &'static str {
        self.label()
    }
}

/// Historique de prix sur 7 jours (sparkline)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

/// Données de marché d'une crypto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    /// Identifiant CoinGecko (ex: "bitcoin")
    pub id: String,

    /// Nom affiché (ex: "Bitcoin")
    pub name: String,

    /// Ticker (ex: "btc"), CoinGecko le renvoie en minuscules
    pub symbol: String,

    /// Prix actuel en USD
    #[serde(default)]
    pub current_price: Option<f64>,

    /// Variation sur 24h en pourcentage (signée)
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    /// Variations 7 et 30 jours, présentes si la requête les demande
    /// via `price_change_percentage=7d,30d`
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_30d_in_currency: Option<f64>,

    #[serde(default)]
    pub market_cap: Option<f64>,

    /// Rang par capitalisation (1 = la plus grosse)
    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    /// Volume échangé sur 24h
    #[serde(default)]
    pub total_volume: Option<f64>,

    #[serde(default)]
    pub circulating_supply: Option<f64>,

    #[serde(default)]
    pub high_24h: Option<f64>,

    #[serde(default)]
    pub low_24h: Option<f64>,

    /// URL du logo (null pour certains tokens récents)
    #[serde(default)]
    pub image: Option<String>,

    /// Présent seulement si la requête demande sparkline=true
    #[serde(default, rename = "sparkline_in_7d")]
    pub sparkline: Option<Sparkline>,
}

impl CoinRecord {
    /// Crée un record minimal, sans données de marché
    pub fn new(id: impl Into<String>, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol: symbol.into(),
            current_price: None,
            price_change_percentage_24h: None,
            price_change_percentage_7d_in_currency: None,
            price_change_percentage_30d_in_currency: None,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            circulating_supply: None,
            high_24h: None,
            low_24h: None,
            image: None,
            sparkline: None,
        }
    }

    // Builders pour construire des records à la main (tests, fixtures)
    // CONCEPT RUST : self par valeur
    // - Consomme le record et le renvoie modifié, permet le chaînage

    pub fn with_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    pub fn with_change(mut self, change: f64) -> Self {
        self.price_change_percentage_24h = Some(change);
        self
    }

    /// Variation sur une autre période que 24h
    pub fn with_change_over(mut self, timeframe: Timeframe, change: f64) -> Self {
        match timeframe {
            Timeframe::H24 => self.price_change_percentage_24h = Some(change),
            Timeframe::D7 => self.price_change_percentage_7d_in_currency = Some(change),
            Timeframe::D30 => self.price_change_percentage_30d_in_currency = Some(change),
        }
        self
    }

    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.market_cap_rank = Some(rank);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.total_volume = Some(volume);
        self
    }

    /// Ticker en majuscules pour l'affichage
    pub fn display_symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    /// Variation en pourcentage sur la période demandée
    ///
    /// Pas de repli sur la variation 24h : une période inconnue reste None
    pub fn change_for(&self, timeframe: Timeframe) -> Option<f64> {
        match timeframe {
            Timeframe::H24 => self.price_change_percentage_24h,
            Timeframe::D7 => self.price_change_percentage_7d_in_currency,
            Timeframe::D30 => self.price_change_percentage_30d_in_currency,
        }
    }

    /// Vrai si la variation 24h est positive ou nulle
    ///
    /// Un record sans variation connue est considéré neutre (false)
    pub fn is_positive(&self) -> bool {
        self.price_change_percentage_24h
            .map(|c| c >= 0.0)
            .unwrap_or(false)
    }

    /// Points de la sparkline (slice vide si absente)
    pub fn sparkline_prices(&self) -> &[f64] {
        self.sparkline
            .as_ref()
            .map(|s| s.price.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_markets_item() {
        let json = r#"{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://example.com/btc.png",
            "current_price": 63000.5,
            "market_cap": 1240000000000,
            "market_cap_rank": 1,
            "total_volume": 35000000000,
            "high_24h": 64000,
            "low_24h": 62000,
            "price_change_percentage_24h": -1.25,
            "price_change_percentage_7d_in_currency": 4.5,
            "price_change_percentage_30d_in_currency": null,
            "circulating_supply": 19700000.0,
            "max_supply": 21000000.0,
            "sparkline_in_7d": { "price": [1.0, 2.0, 3.0] }
        }"#;

        let coin: CoinRecord = serde_json::from_str(json).unwrap();
        assert_eq!(coin.id, "bitcoin");
        assert_eq!(coin.display_symbol(), "BTC");
        assert_eq!(coin.market_cap, Some(1.24e12));
        assert_eq!(coin.market_cap_rank, Some(1));
        assert!(!coin.is_positive());
        assert_eq!(coin.sparkline_prices(), &[1.0, 2.0, 3.0]);
        assert_eq!(coin.image.as_deref(), Some("https://example.com/btc.png"));

        assert_eq!(coin.change_for(Timeframe::H24), Some(-1.25));
        assert_eq!(coin.change_for(Timeframe::D7), Some(4.5));
        assert_eq!(coin.change_for(Timeframe::D30), None);
    }

    #[test]
    fn test_deserialize_nulls() {
        let json = r#"{
            "id": "obscure",
            "symbol": "obs",
            "name": "Obscure",
            "current_price": null,
            "market_cap": null,
            "market_cap_rank": null,
            "image": null
        }"#;

        let coin: CoinRecord = serde_json::from_str(json).unwrap();
        assert_eq!(coin.current_price, None);
        assert_eq!(coin.market_cap_rank, None);
        assert_eq!(coin.image, None);
        assert!(coin.sparkline_prices().is_empty());
    }

    #[test]
    fn test_builders() {
        let coin = CoinRecord::new("eth", "Ethereum", "eth")
            .with_price(3400.0)
            .with_change(2.5)
            .with_rank(2);

        assert_eq!(coin.current_price, Some(3400.0));
        assert!(coin.is_positive());
        assert_eq!(coin.market_cap_rank, Some(2));
    }

    #[test]
    fn test_timeframe_cycle() {
        assert_eq!(Timeframe::default(), Timeframe::H24);
        assert_eq!(Timeframe::H24.next(), Timeframe::D7);
        assert_eq!(Timeframe::D30.next(), Timeframe::H24);

        let labels: Vec<&str> = Timeframe::all().iter().map(|t| t.label()).collect();
        assert_eq!(labels, vec!["24h", "7d", "30d"]);
    }
}
