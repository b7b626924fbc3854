// ============================================================================
// Module : error
// ============================================================================
// Erreurs typées du client CoinGecko
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère l'implémentation de std::error::Error
// - #[error("...")] définit le message Display de chaque variant
// - Le reste de l'application (config, stockage, terminal) reste sur anyhow
// ============================================================================

use thiserror::Error;

/// Erreurs possibles lors d'un appel à l'API de marché
#[derive(Error, Debug)]
pub enum FetchError {
    /// Échec réseau (DNS, connexion refusée, timeout...)
    #[error("Network error: {0}")]
    Transport(String),

    /// Réponse HTTP non-2xx
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Corps de réponse illisible
    #[error("Malformed response body: {0}")]
    Malformed(String),

    /// Le fournisseur (ou le limiteur local) refuse l'appel
    #[error("API rate limited. Try again later.")]
    RateLimited,

    /// Aucune donnée retournée pour cet identifiant
    #[error("No data returned for {0}")]
    NotFound(String),
}

impl FetchError {
    /// Vrai si l'erreur doit armer le throttle du limiteur
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = FetchError::Status { status: 500, body: "oops".to_string() };
        assert_eq!(err.to_string(), "API returned HTTP 500: oops");
        assert_eq!(
            FetchError::RateLimited.to_string(),
            "API rate limited. Try again later."
        );
    }

    #[test]
    fn test_json_error_is_malformed() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: FetchError = json_err.into();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(!err.is_rate_limited());
    }
}
