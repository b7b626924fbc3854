// ============================================================================
// API Client : CoinGecko
// ============================================================================
// Récupère les données de marché depuis l'API publique CoinGecko v3
//
// Endpoints utilisés :
// - /coins/markets : liste paginée (prix, variation, market cap, sparkline)
// - /global        : statistiques agrégées du marché
// - /simple/price  : prix ponctuel d'une crypto (rafraîchissement live)
//
// Politique d'erreur :
// - fetch_markets / fetch_global ne remontent jamais d'erreur : elles loggent
//   et renvoient une liste vide / des stats à zéro
// - fetch_simple_price renvoie un Result typé, l'appelant garde le dernier
//   prix connu et affiche l'erreur
// - Un seul essai par appel, pas de retry ni de backoff
// ============================================================================

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{CoinRecord, GlobalStats, SimplePrice, Timeframe};

// Browser-like User-Agent, CoinGecko bloque parfois les clients "nus"
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ============================================================================
// Structures pour parser la réponse JSON de /global
// ============================================================================
// CoinGecko enveloppe tout dans { "data": { ... } } et indexe les montants
// par devise : "total_market_cap": { "usd": 2.3e12, "eur": ... }
// ============================================================================

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    active_cryptocurrencies: u64,
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: f64,
}

// ============================================================================
// Paramètres de /coins/markets
// ============================================================================

/// Requête de liste de marchés
#[derive(Debug, Clone, PartialEq)]
pub struct MarketsQuery {
    pub vs_currency: String,
    pub per_page: u32,
    pub page: u32,
    pub sparkline: bool,

    /// Périodes de variation demandées en plus des champs de base
    pub timeframes: Vec<Timeframe>,
}

impl MarketsQuery {
    pub fn from_config(config: &Config) -> Self {
        Self {
            vs_currency: config.vs_currency.clone(),
            per_page: config.per_page,
            page: 1,
            sparkline: config.sparkline,
            // Un seul fetch alimente le leaderboard sur toutes les périodes
            timeframes: Timeframe::all().to_vec(),
        }
    }
}

impl Default for MarketsQuery {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client CoinGecko
///
/// CONCEPT : Un seul reqwest::Client réutilisé
/// - Le Client garde un pool de connexions
/// - Le cloner est peu coûteux (Arc interne)
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoClient {
    /// Crée un client depuis la config
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liste des marchés, vide en cas d'échec
    ///
    /// Vide = "pas de données", indiscernable de "zéro résultat".
    /// L'appelant affiche un message générique + retry
    #[instrument(skip(self, query), fields(page = query.page, per_page = query.per_page))]
    pub async fn fetch_markets(&self, query: &MarketsQuery) -> Vec<CoinRecord> {
        match self.try_fetch_markets(query).await {
            Ok(coins) => {
                info!(coins = coins.len(), "Fetched market listing");
                coins
            }
            Err(e) => {
                error!(error = %e, "Error fetching market listing");
                Vec::new()
            }
        }
    }

    /// Liste des marchés, avec l'erreur typée
    pub async fn try_fetch_markets(&self, query: &MarketsQuery) -> Result<Vec<CoinRecord>, FetchError> {
        let url = build_markets_url(&self.base_url, query);
        let body = self.get_text(&url).await?;
        parse_markets_body(&body)
    }

    /// Stats globales, à zéro en cas d'échec
    #[instrument(skip(self))]
    pub async fn fetch_global(&self) -> GlobalStats {
        let url = format!("{}/global", self.base_url);

        let result = match self.get_text(&url).await {
            Ok(body) => parse_global_body(&body, &self.vs_currency),
            Err(e) => Err(e),
        };

        match result {
            Ok(stats) => {
                info!(active = stats.active_cryptocurrencies, "Fetched global stats");
                stats
            }
            Err(e) => {
                error!(error = %e, "Error fetching global stats");
                GlobalStats::default()
            }
        }
    }

    /// Prix ponctuel d'une crypto
    ///
    /// Le texte "Throttled" ou un HTTP 429 donnent FetchError::RateLimited,
    /// pour que l'appelant arme son limiteur
    #[instrument(skip(self))]
    pub async fn fetch_simple_price(&self, id: &str) -> Result<SimplePrice, FetchError> {
        let url = build_simple_price_url(&self.base_url, id, &self.vs_currency);
        let body = self.get_text(&url).await?;
        let price = parse_simple_price_body(&body, id)?;
        debug!(coin = %id, price = price.usd, "Fetched live price");
        Ok(price)
    }

    /// GET + vérification du statut
    ///
    /// CONCEPT RUST : ? et From
    /// - reqwest::Error est converti en FetchError::Transport par From
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Sending HTTP request to CoinGecko");

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "Received HTTP response");

        check_status(status.as_u16(), body)
    }
}

// ============================================================================
// Fonctions pures (testables sans réseau)
// ============================================================================

/// URL de /coins/markets
pub fn build_markets_url(base_url: &str, query: &MarketsQuery) -> String {
    let mut url = format!(
        "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page={}&sparkline={}",
        base_url.trim_end_matches('/'),
        query.vs_currency,
        query.per_page,
        query.page,
        query.sparkline
    );

    if !query.timeframes.is_empty() {
        let periods: Vec<&str> = query.timeframes.iter().map(|t| t.param()).collect();
        url.push_str("&price_change_percentage=");
        url.push_str(&periods.join(","));
    }
    url
}

/// URL de /simple/price
pub fn build_simple_price_url(base_url: &str, id: &str, vs_currency: &str) -> String {
    format!(
        "{}/simple/price?ids={}&vs_currencies={}&include_24hr_change=true",
        base_url.trim_end_matches('/'),
        id,
        vs_currency
    )
}

/// Transforme un statut HTTP + corps en Result
fn check_status(status: u16, body: String) -> Result<String, FetchError> {
    if (200..300).contains(&status) {
        return Ok(body);
    }

    if status == 429 || body.contains("Throttled") {
        warn!(status, "CoinGecko is throttling requests");
        return Err(FetchError::RateLimited);
    }

    error!(status, "CoinGecko returned error status");
    Err(FetchError::Status { status, body })
}

/// Parse le corps de /coins/markets
pub fn parse_markets_body(body: &str) -> Result<Vec<CoinRecord>, FetchError> {
    let coins: Vec<CoinRecord> = serde_json::from_str(body)?;
    Ok(coins)
}

/// Parse le corps de /global pour une devise donnée
pub fn parse_global_body(body: &str, vs_currency: &str) -> Result<GlobalStats, FetchError> {
    let response: GlobalResponse = serde_json::from_str(body)?;
    let data = response.data;

    Ok(GlobalStats {
        active_cryptocurrencies: data.active_cryptocurrencies,
        total_market_cap: data.total_market_cap.get(vs_currency).copied().unwrap_or(0.0),
        total_volume: data.total_volume.get(vs_currency).copied().unwrap_or(0.0),
        btc_dominance: data.market_cap_percentage.get("btc").copied().unwrap_or(0.0),
        eth_dominance: data.market_cap_percentage.get("eth").copied().unwrap_or(0.0),
        market_cap_change_percentage_24h: data.market_cap_change_percentage_24h_usd,
    })
}

/// Parse le corps de /simple/price et extrait l'id demandé
///
/// La réponse est indexée par id : { "bitcoin": { "usd": 63000, ... } }
pub fn parse_simple_price_body(body: &str, id: &str) -> Result<SimplePrice, FetchError> {
    let mut prices: HashMap<String, SimplePrice> = serde_json::from_str(body)?;
    prices
        .remove(id)
        .ok_or_else(|| FetchError::NotFound(id.to_string()))
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_markets_url() {
        let query = MarketsQuery {
            vs_currency: "usd".to_string(),
            per_page: 50,
            page: 2,
            sparkline: true,
            timeframes: vec![Timeframe::D7],
        };
        let url = build_markets_url("https://api.coingecko.com/api/v3/", &query);

        assert!(url.starts_with("https://api.coingecko.com/api/v3/coins/markets?"));
        assert!(url.contains("vs_currency=usd"));
        assert!(url.contains("order=market_cap_desc"));
        assert!(url.contains("per_page=50"));
        assert!(url.contains("page=2"));
        assert!(url.contains("sparkline=true"));
        assert!(url.ends_with("&price_change_percentage=7d"));
    }

    #[test]
    fn test_default_markets_url_requests_every_timeframe() {
        let url = build_markets_url("http://localhost:1", &MarketsQuery::default());
        assert!(url.ends_with("&price_change_percentage=24h,7d,30d"));

        let query = MarketsQuery { timeframes: Vec::new(), ..MarketsQuery::default() };
        assert!(!build_markets_url("http://localhost:1", &query).contains("price_change_percentage"));
    }

    #[test]
    fn test_build_simple_price_url() {
        let url = build_simple_price_url("http://localhost:1", "bitcoin", "usd");
        assert_eq!(
            url,
            "http://localhost:1/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true"
        );
    }

    #[test]
    fn test_parse_markets_body() {
        let body = r#"[
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 63000, "market_cap_rank": 1},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": 3400.5, "market_cap_rank": 2}
        ]"#;

        let coins = parse_markets_body(body).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[1].current_price, Some(3400.5));
    }

    #[test]
    fn test_parse_markets_body_with_null_image_and_periods() {
        let body = r#"[
            {"id": "newcoin", "symbol": "new", "name": "New Coin", "image": null,
             "price_change_percentage_24h": 1.0,
             "price_change_percentage_7d_in_currency": -8.5,
             "price_change_percentage_30d_in_currency": 42.0}
        ]"#;

        let coins = parse_markets_body(body).unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].image, None);
        assert_eq!(coins[0].change_for(Timeframe::D7), Some(-8.5));
        assert_eq!(coins[0].change_for(Timeframe::D30), Some(42.0));
    }

    #[test]
    fn test_parse_markets_body_malformed() {
        let err = parse_markets_body(r#"{"status": {"error_code": 429}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_global_body() {
        let body = r#"{"data": {
            "active_cryptocurrencies": 10483,
            "total_market_cap": {"usd": 2345678901234.0, "eur": 1.0},
            "total_volume": {"usd": 123456789012.0},
            "market_cap_percentage": {"btc": 42.3, "eth": 17.1},
            "market_cap_change_percentage_24h_usd": 1.45
        }}"#;

        let stats = parse_global_body(body, "usd").unwrap();
        assert_eq!(stats.active_cryptocurrencies, 10483);
        assert_eq!(stats.total_market_cap, 2345678901234.0);
        assert_eq!(stats.btc_dominance, 42.3);
        assert_eq!(stats.eth_dominance, 17.1);
        assert!(stats.is_available());
    }

    #[test]
    fn test_parse_simple_price_body() {
        let body = r#"{"bitcoin": {"usd": 63000.0, "usd_24h_change": -0.5}}"#;
        let price = parse_simple_price_body(body, "bitcoin").unwrap();
        assert_eq!(price.usd, 63000.0);
        assert_eq!(price.usd_24h_change, Some(-0.5));

        let err = parse_simple_price_body("{}", "bitcoin").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(id) if id == "bitcoin"));
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(200, "ok".to_string()).unwrap(), "ok");
        assert!(check_status(429, String::new()).unwrap_err().is_rate_limited());
        assert!(check_status(503, "Throttled".to_string()).unwrap_err().is_rate_limited());
        assert!(matches!(
            check_status(500, "boom".to_string()),
            Err(FetchError::Status { status: 500, .. })
        ));
    }

    // Aucun serveur n'écoute sur le port 1 : connexion refusée
    fn unreachable_client() -> CoinGeckoClient {
        let config = Config {
            api_base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ..Config::default()
        };
        CoinGeckoClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_markets_degrades_to_empty() {
        let client = unreachable_client();
        let coins = client.fetch_markets(&MarketsQuery::default()).await;
        assert!(coins.is_empty());

        let err = client.try_fetch_markets(&MarketsQuery::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_global_degrades_to_default() {
        let client = unreachable_client();
        assert_eq!(client.fetch_global().await, GlobalStats::default());
    }

    #[tokio::test]
    async fn test_fetch_simple_price_reports_transport_error() {
        let client = unreachable_client();
        let err = client.fetch_simple_price("bitcoin").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
