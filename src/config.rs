// ============================================================================
// Module : config
// ============================================================================
// Configuration de l'application, lue depuis un fichier JSON optionnel
//
// Emplacement :
// - $COINDECK_CONFIG si défini
// - sinon <config_dir>/coindeck/config.json
//   (Linux : ~/.config/coindeck/config.json)
//
// CONCEPT RUST : #[serde(default)]
// - Chaque champ absent du fichier prend la valeur de Default
// - Un fichier `{}` est donc une config valide
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::persistence::FileStore;

/// Variable d'environnement pour un chemin de config alternatif
pub const CONFIG_ENV: &str = "COINDECK_CONFIG";

/// Variable d'environnement pour surcharger l'URL de l'API
pub const API_BASE_ENV: &str = "COINDECK_API_BASE";

pub const DEFAULT_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL de base de l'API CoinGecko
    pub api_base_url: String,

    /// Devise de référence
    pub vs_currency: String,

    /// Nombre de cryptos par page du tableau de marché
    pub per_page: u32,

    /// Demande l'historique 7j avec les marchés
    pub sparkline: bool,

    pub request_timeout_secs: u64,

    /// Rafraîchissement du tableau de marché
    pub markets_poll_secs: u64,

    /// Rafraîchissement des stats globales
    pub global_poll_secs: u64,

    /// Rafraîchissement du prix live de la crypto sélectionnée
    pub live_price_poll_secs: u64,

    /// Répertoire de stockage de la watchlist et des favoris
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            vs_currency: "usd".to_string(),
            per_page: 100,
            sparkline: true,
            request_timeout_secs: 10,
            markets_poll_secs: 60,
            global_poll_secs: 120,
            live_price_poll_secs: 15,
            data_dir: None,
        }
    }
}

impl Config {
    /// Chemin du fichier de config
    pub fn path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coindeck")
            .join("config.json")
    }

    /// Charge la config depuis l'emplacement par défaut
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::path())?;
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            info!(api_base_url = %base, "API base URL overridden from environment");
            config.api_base_url = base;
        }
        Ok(config)
    }

    /// Charge la config depuis un fichier
    ///
    /// Fichier absent : config par défaut. Fichier invalide : erreur
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Config invalide dans {}", path.display()))?;

        info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Répertoire de données effectif
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(FileStore::default_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn markets_poll_interval(&self) -> Duration {
        Duration::from_secs(self.markets_poll_secs)
    }

    pub fn global_poll_interval(&self) -> Duration {
        Duration::from_secs(self.global_poll_secs)
    }

    pub fn live_price_poll_interval(&self) -> Duration {
        Duration::from_secs(self.live_price_poll_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("coindeck-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(&temp_file("missing.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.markets_poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_file("partial.json");
        std::fs::write(&path, r#"{ "per_page": 25, "data_dir": "/tmp/coindeck" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.per_page, 25);
        assert_eq!(config.vs_currency, "usd");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/coindeck"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_file("broken.json");
        std::fs::write(&path, "{ per_page: ").unwrap();

        assert!(Config::load_from(&path).is_err());

        let _ = std::fs::remove_file(path);
    }
}
