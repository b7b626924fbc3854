// ============================================================================
// CoinDeck - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;          // Client API CoinGecko
pub mod app;          // État de l'application
pub mod config;       // Configuration (fichier JSON + variables d'environnement)
pub mod error;        // Erreurs typées des appels réseau
pub mod filter;       // Filtre / tri du tableau de marché, leaderboard
pub mod models;       // Structures de données
pub mod persistence;  // Watchlist et favoris sur disque
pub mod rate_limiter; // Limiteur d'appels pour le rafraîchissement des prix
pub mod ui;           // Interface utilisateur
