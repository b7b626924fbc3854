// ============================================================================
// Module : filter
// ============================================================================
// Moteur de filtre / tri des cryptos affichées
//
// CONCEPTS RUST :
// 1. Fonctions pures : apply_filters ne modifie rien, elle renvoie une vue
//    dérivée. On peut l'appeler à chaque frame sans effet de bord
// 2. Iterator chaining : filter().filter()...collect()
// 3. sort_by est un tri stable : les ex-aequo gardent leur ordre d'entrée
// 4. Option<f64> + Ordering : les valeurs absentes sont toujours en fin de
//    liste, quel que soit le sens du tri
// ============================================================================

use std::cmp::Ordering;

use crate::models::{CoinOverlay, CoinRecord, CoinView, Timeframe};

/// Seuil "large cap" : 10 milliards
pub const LARGE_CAP_THRESHOLD: f64 = 10_000_000_000.0;

/// Seuil "mid cap" : 1 milliard
pub const MID_CAP_THRESHOLD: f64 = 1_000_000_000.0;

// ============================================================================
// Enums de configuration
// ============================================================================
// CONCEPT : Cycle d'états (comme Interval::next/previous)
// - Chaque enum sait passer au variant suivant
// - Une seule touche suffit pour faire défiler les options dans le TUI
// ============================================================================

/// Tranche de capitalisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketCapBucket {
    #[default]
    All,
    /// >= 10B
    Large,
    /// [1B, 10B)
    Mid,
    /// < 1B
    Small,
}

impl MarketCapBucket {
    /// Vrai si la capitalisation tombe dans la tranche
    ///
    /// Une capitalisation inconnue ne passe que le filtre All
    pub fn matches(&self, market_cap: Option<f64>) -> bool {
        match (self, market_cap) {
            (MarketCapBucket::All, _) => true,
            (_, None) => false,
            (MarketCapBucket::Large, Some(cap)) => cap >= LARGE_CAP_THRESHOLD,
            (MarketCapBucket::Mid, Some(cap)) => {
                cap >= MID_CAP_THRESHOLD && cap < LARGE_CAP_THRESHOLD
            }
            (MarketCapBucket::Small, Some(cap)) => cap < MID_CAP_THRESHOLD,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            MarketCapBucket::All => MarketCapBucket::Large,
            MarketCapBucket::Large => MarketCapBucket::Mid,
            MarketCapBucket::Mid => MarketCapBucket::Small,
            MarketCapBucket::Small => MarketCapBucket::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MarketCapBucket::All => "All caps",
            MarketCapBucket::Large => "Large cap ($10B+)",
            MarketCapBucket::Mid => "Mid cap ($1B-$10B)",
            MarketCapBucket::Small => "Small cap (<$1B)",
        }
    }
}

/// Filtre sur le signe de la variation 24h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeFilter {
    #[default]
    All,
    Positive,
    Negative,
}

impl ChangeFilter {
    /// Une variation nulle (0.0) n'est ni positive ni négative
    pub fn matches(&self, change: Option<f64>) -> bool {
        match (self, change) {
            (ChangeFilter::All, _) => true,
            (_, None) => false,
            (ChangeFilter::Positive, Some(c)) => c > 0.0,
            (ChangeFilter::Negative, Some(c)) => c < 0.0,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ChangeFilter::All => ChangeFilter::Positive,
            ChangeFilter::Positive => ChangeFilter::Negative,
            ChangeFilter::Negative => ChangeFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeFilter::All => "All changes",
            ChangeFilter::Positive => "Gainers",
            ChangeFilter::Negative => "Losers",
        }
    }
}

/// Colonne de tri
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    MarketCapRank,
    Name,
    CurrentPrice,
    PriceChange24h,
    MarketCap,
    TotalVolume,
}

impl SortKey {
    pub fn all() -> [SortKey; 6] {
        [
            SortKey::MarketCapRank,
            SortKey::Name,
            SortKey::CurrentPrice,
            SortKey::PriceChange24h,
            SortKey::MarketCap,
            SortKey::TotalVolume,
        ]
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        let index = all.iter().position(|k| k == self).unwrap_or(0);
        all[(index + 1) % all.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::MarketCapRank => "#",
            SortKey::Name => "Name",
            SortKey::CurrentPrice => "Price",
            SortKey::PriceChange24h => "24h %",
            SortKey::MarketCap => "Market Cap",
            SortKey::TotalVolume => "Volume",
        }
    }

    /// Sens par défaut quand on choisit une nouvelle colonne
    ///
    /// Rang et nom : croissant. Tout le reste : décroissant
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortKey::MarketCapRank | SortKey::Name => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    /// Valeur numérique de la colonne (None pour Name)
    fn numeric_value(&self, coin: &CoinRecord) -> Option<f64> {
        match self {
            SortKey::MarketCapRank => coin.market_cap_rank.map(f64::from),
            SortKey::Name => None,
            SortKey::CurrentPrice => coin.current_price,
            SortKey::PriceChange24h => coin.price_change_percentage_24h,
            SortKey::MarketCap => coin.market_cap,
            SortKey::TotalVolume => coin.total_volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Colonne + sens du tri
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Clic sur une colonne
    ///
    /// - Même colonne : on inverse le sens
    /// - Nouvelle colonne : sens par défaut de la colonne
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.reversed();
        } else {
            self.key = key;
            self.direction = key.default_direction();
        }
    }
}

// ============================================================================
// FilterConfig
// ============================================================================

/// Configuration complète du filtre, re-dérivée à chaque rendu
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterConfig {
    /// Recherche insensible à la casse sur nom ou symbole
    pub search: String,

    /// Borne basse du prix (None = 0)
    pub min_price: Option<f64>,

    /// Borne haute du prix (None = +infini)
    pub max_price: Option<f64>,

    pub market_cap: MarketCapBucket,

    pub change: ChangeFilter,

    /// Ne garder que les favoris
    pub favorites_only: bool,

    pub sort: SortConfig,
}

impl FilterConfig {
    /// Vrai si au moins un filtre restreint la liste
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.market_cap != MarketCapBucket::All
            || self.change != ChangeFilter::All
            || self.favorites_only
    }

    /// Remet les filtres à zéro, en gardant le tri courant
    pub fn reset_filters(&mut self) {
        *self = Self {
            sort: self.sort,
            ..Self::default()
        };
    }

    fn matches_price(&self, price: Option<f64>) -> bool {
        // Sans borne explicite, même un prix inconnu passe
        if self.min_price.is_none() && self.max_price.is_none() {
            return true;
        }

        let min = self.min_price.unwrap_or(0.0);
        let max = self.max_price.unwrap_or(f64::INFINITY);
        price.map(|p| p >= min && p <= max).unwrap_or(false)
    }
}

/// Parse une borne de prix saisie par l'utilisateur
///
/// Chaîne vide ou invalide : pas de borne
pub fn parse_price_bound(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Vrai si le nom ou le symbole contient la recherche (insensible à la casse)
///
/// La requête est prise telle quelle : seule la chaîne vide désactive la
/// recherche, les espaces comptent comme des caractères
pub fn matches_search(coin: &CoinRecord, query: &str) -> bool {
    let query = query.to_lowercase();
    if query.is_empty() {
        return true;
    }
    coin.name.to_lowercase().contains(&query) || coin.symbol.to_lowercase().contains(&query)
}

/// Filtre simple par recherche, dans l'ordre d'entrée (dialogue d'ajout)
pub fn search_coins<'a>(coins: &'a [CoinRecord], query: &str) -> Vec<&'a CoinRecord> {
    coins.iter().filter(|c| matches_search(c, query)).collect()
}

/// Candidats du dialogue d'ajout : correspondent à la recherche et ne sont
/// pas encore dans la watchlist
pub fn add_candidates<'a>(coins: &'a [CoinRecord], watched: &[&str], query: &str) -> Vec<&'a CoinRecord> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    coins
        .iter()
        .filter(|c| matches_search(c, query) && !watched.contains(&c.id.as_str()))
        .collect()
}

// ============================================================================
// apply_filters
// ============================================================================

/// Applique filtres + tri et renvoie la vue dérivée
///
/// CONCEPT RUST : Lifetimes
/// - Les CoinView empruntent `coins` et `overlay`
/// - Aucune copie de record, la vue est reconstruite à chaque frame
///
/// Entrée vide ou tout filtré : Vec vide, jamais d'erreur
pub fn apply_filters<'a>(
    coins: &'a [CoinRecord],
    overlay: &'a CoinOverlay,
    config: &FilterConfig,
) -> Vec<CoinView<'a>> {
    let mut views: Vec<CoinView<'a>> = coins
        .iter()
        .filter(|coin| matches_search(coin, &config.search))
        .filter(|coin| config.matches_price(coin.current_price))
        .filter(|coin| config.market_cap.matches(coin.market_cap))
        .filter(|coin| config.change.matches(coin.price_change_percentage_24h))
        .map(|coin| overlay.view(coin))
        .filter(|view| !config.favorites_only || view.favorite)
        .collect();

    // sort_by est stable : les ex-aequo restent dans l'ordre d'entrée
    views.sort_by(|a, b| compare_coins(a.coin, b.coin, config.sort));
    views
}

/// Compare deux records selon la config de tri
fn compare_coins(a: &CoinRecord, b: &CoinRecord, sort: SortConfig) -> Ordering {
    let ordering = match sort.key {
        SortKey::Name => {
            // Les noms ne sont jamais absents
            let ordering = a.name.to_lowercase().cmp(&b.name.to_lowercase());
            return directed(ordering, sort.direction);
        }
        key => (key.numeric_value(a), key.numeric_value(b)),
    };

    match ordering {
        (None, None) => Ordering::Equal,
        // Nulls en dernier, indépendamment du sens
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => directed(x.partial_cmp(&y).unwrap_or(Ordering::Equal), sort.direction),
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Top hausses / top baisses
#[derive(Debug, Clone, Default)]
pub struct Leaderboard<'a> {
    /// Variations positives, de la plus forte à la plus faible
    pub gainers: Vec<&'a CoinRecord>,

    /// Variations négatives, de la plus forte baisse à la plus faible
    pub losers: Vec<&'a CoinRecord>,
}

impl<'a> Leaderboard<'a> {
    pub fn len(&self) -> usize {
        self.gainers.len() + self.losers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ligne `index` en parcourant les hausses puis les baisses
    pub fn get(&self, index: usize) -> Option<&'a CoinRecord> {
        match self.gainers.get(index) {
            Some(coin) => Some(*coin),
            None => self.losers.get(index - self.gainers.len()).copied(),
        }
    }
}

/// Calcule le leaderboard après filtre de recherche, classé sur `timeframe`
///
/// Une crypto sans variation connue sur la période n'apparaît dans aucune
/// colonne
pub fn leaderboard<'a>(
    coins: &'a [CoinRecord],
    search: &str,
    limit: usize,
    timeframe: Timeframe,
) -> Leaderboard<'a> {
    let matching = search_coins(coins, search);
    let change = |c: &CoinRecord| c.change_for(timeframe);

    let mut gainers: Vec<&CoinRecord> = matching
        .iter()
        .copied()
        .filter(|c| change(c).map(|v| v > 0.0).unwrap_or(false))
        .collect();
    // sort_by stable : à variation égale, l'ordre du listing est conservé
    gainers.sort_by(|a, b| {
        let (x, y) = (change(a).unwrap_or(0.0), change(b).unwrap_or(0.0));
        y.partial_cmp(&x).unwrap_or(Ordering::Equal)
    });
    gainers.truncate(limit);

    let mut losers: Vec<&CoinRecord> = matching
        .into_iter()
        .filter(|c| change(c).map(|v| v < 0.0).unwrap_or(false))
        .collect();
    losers.sort_by(|a, b| {
        let (x, y) = (change(a).unwrap_or(0.0), change(b).unwrap_or(0.0));
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    });
    losers.truncate(limit);

    Leaderboard { gainers, losers }
}

// ============================================================================
// Tests unitaires
// ============================================================================
