// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Encapsulation : les composants de l'UI lisent depuis App, toutes les
//    modifications passent par ses méthodes
//
// PATTERN : Cette structure suit le pattern "Application State"
// - Les données fetchées (coins, global) sont remplacées en bloc
// - L'état utilisateur (favoris, prix live) vit dans l'overlay
// - La vue affichée est re-dérivée à chaque frame par filter::apply_filters
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::filter::{self, apply_filters, FilterConfig, Leaderboard};
use crate::models::{
    CoinOverlay, CoinRecord, CoinView, GlobalStats, LivePrice, SimplePrice, Timeframe, WatchlistEntry,
};
use crate::persistence::{Favorites, KeyValueStore, Watchlist};
use crate::rate_limiter::RateLimiterStatus;

/// Durée d'affichage d'un avertissement transitoire
const WARNING_TTL: Duration = Duration::from_secs(5);

/// Taille des listes du leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

// ============================================================================
// Enum : Screen
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul écran actif à la fois
// - Le compilateur force à gérer tous les cas (exhaustivité)
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Tableau de marché filtrable
    Markets,

    /// Cryptos suivies par l'utilisateur
    Watchlist,

    /// Top hausses / top baisses
    Leaderboard,

    /// Détail + historique 7j de la crypto sélectionnée
    CoinDetail,

    /// Mode saisie (recherche, bornes de prix, ajout)
    InputMode,
}

/// Ce que la saisie en cours va modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Search,
    MinPrice,
    MaxPrice,
    AddCoin,
}

impl InputTarget {
    pub fn prompt(&self) -> &'static str {
        match self {
            InputTarget::Search => "Search: ",
            InputTarget::MinPrice => "Min price: ",
            InputTarget::MaxPrice => "Max price: ",
            InputTarget::AddCoin => "Add coin: ",
        }
    }

    /// Caractères acceptés pour cette saisie
    pub fn accepts(&self, c: char) -> bool {
        match self {
            InputTarget::MinPrice | InputTarget::MaxPrice => c.is_ascii_digit() || c == '.',
            InputTarget::Search | InputTarget::AddCoin => {
                c.is_alphanumeric() || c == ' ' || c == '-' || c == '.'
            }
        }
    }
}

/// Résultat de l'ajout d'une crypto à la watchlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(String),
    AlreadyPresent(String),
    NotFound(String),
}

// ============================================================================
// Polling
// ============================================================================
// CONCEPT : Échéances indépendantes
// - Marchés, stats globales et prix live ont chacun leur intervalle
// - Ils ne sont pas coordonnés entre eux ni avec le limiteur
// ============================================================================

/// Fetchs à déclencher à ce tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueFetches {
    pub markets: bool,
    pub global: bool,
    /// Id de la crypto dont le prix live doit être rafraîchi
    pub live_price: Option<String>,
}

impl DueFetches {
    pub fn is_empty(&self) -> bool {
        !self.markets && !self.global && self.live_price.is_none()
    }
}

#[derive(Debug, Clone)]
struct PollSchedule {
    markets_every: Duration,
    global_every: Duration,
    live_every: Duration,
    next_markets: Instant,
    next_global: Instant,
    next_live: Instant,
}

impl PollSchedule {
    fn new(config: &Config, now: Instant) -> Self {
        Self {
            markets_every: config.markets_poll_interval(),
            global_every: config.global_poll_interval(),
            live_every: config.live_price_poll_interval(),
            next_markets: now + config.markets_poll_interval(),
            next_global: now + config.global_poll_interval(),
            next_live: now + config.live_price_poll_interval(),
        }
    }
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Écran de retour (après détail ou saisie)
    pub previous_screen: Screen,

    /// Dernière liste de marchés fetchée
    pub coins: Vec<CoinRecord>,

    /// Stats globales (à zéro si indisponibles)
    pub global: GlobalStats,

    /// Favoris + prix live
    pub overlay: CoinOverlay,

    /// Filtre et tri du tableau de marché
    pub filter: FilterConfig,

    pub watchlist: Watchlist,

    pub favorites: Favorites,

    /// Index de la ligne sélectionnée dans la liste affichée
    pub selected_index: usize,

    /// Crypto ouverte en détail, fixée à l'ouverture
    ///
    /// Un re-tri ou un nouveau fetch ne change pas la crypto affichée
    pub detail_id: Option<String>,

    /// Période de classement du leaderboard
    pub leaderboard_timeframe: Timeframe,

    /// Two-step quit pour éviter les sorties accidentelles
    pub confirm_quit: bool,

    /// Two-step delete sur la watchlist
    pub confirm_delete: bool,

    pub is_loading: bool,

    pub loading_message: Option<String>,

    /// Buffer de saisie pour le mode Input
    pub input_buffer: String,

    pub input_target: Option<InputTarget>,

    /// Erreur de fetch persistante (avec invitation au retry)
    pub error_message: Option<String>,

    /// Avertissement transitoire (rate limit, doublon...)
    pub warning: Option<(String, Instant)>,

    /// Heure du dernier fetch de marché réussi
    pub last_updated: Option<DateTime<Utc>>,

    /// Dernier état connu du limiteur (renvoyé par le worker)
    pub limiter_status: Option<RateLimiterStatus>,

    schedule: PollSchedule,
}

impl App {
    /// Crée l'application à partir du store et de la config
    ///
    /// CONCEPT RUST : Arc<dyn Trait>
    /// - Watchlist et Favorites partagent le même store
    pub fn new(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        let watchlist = Watchlist::load(store.clone());
        let favorites = Favorites::load(store);

        let mut overlay = CoinOverlay::new();
        overlay.set_favorites(favorites.ids().iter().cloned());

        Self {
            running: true,
            current_screen: Screen::Markets,
            previous_screen: Screen::Markets,
            coins: Vec::new(),
            global: GlobalStats::default(),
            overlay,
            filter: FilterConfig::default(),
            watchlist,
            favorites,
            selected_index: 0,
            detail_id: None,
            leaderboard_timeframe: Timeframe::default(),
            confirm_quit: false,
            confirm_delete: false,
            is_loading: false,
            loading_message: None,
            input_buffer: String::new(),
            input_target: None,
            error_message: None,
            warning: None,
            last_updated: None,
            limiter_status: None,
            schedule: PollSchedule::new(config, Instant::now()),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Données
    // ========================================================================

    /// Remplace la liste de marchés
    ///
    /// Une liste vide est traitée comme "pas de données" : on garde les
    /// anciennes et on affiche une erreur avec retry
    pub fn apply_markets(&mut self, coins: Vec<CoinRecord>) {
        if coins.is_empty() {
            warn!("Market fetch returned no data");
            self.error_message =
                Some("No data available. The API may be rate limited. [r] Retry".to_string());
            return;
        }

        info!(coins = coins.len(), "Applying market listing");
        self.watchlist.refresh_prices(&coins);
        self.coins = coins;
        self.error_message = None;
        self.last_updated = Some(Utc::now());
        self.clamp_selection();
    }

    pub fn apply_global(&mut self, stats: GlobalStats) {
        // Le fallback à zéro n'écrase pas des stats valides
        if stats.is_available() || !self.global.is_available() {
            self.global = stats;
        }
    }

    pub fn apply_live_price(&mut self, id: &str, price: SimplePrice) {
        debug!(coin = %id, price = price.usd, "Live price updated");
        self.overlay.set_live_price(id, LivePrice::from_simple(price, Utc::now()));
    }

    // ========================================================================
    // Vues dérivées
    // ========================================================================

    /// Lignes du tableau de marché, filtrées et triées
    pub fn market_view(&self) -> Vec<CoinView<'_>> {
        apply_filters(&self.coins, &self.overlay, &self.filter)
    }

    pub fn leaderboard(&self) -> Leaderboard<'_> {
        filter::leaderboard(
            &self.coins,
            &self.filter.search,
            LEADERBOARD_SIZE,
            self.leaderboard_timeframe,
        )
    }

    /// Passe à la période suivante (24h → 7d → 30d)
    pub fn cycle_timeframe(&mut self) {
        self.leaderboard_timeframe = self.leaderboard_timeframe.next();
        debug!(timeframe = self.leaderboard_timeframe.label(), "Leaderboard timeframe changed");
        self.clamp_selection();
    }

    /// Nombre de lignes navigables sur l'écran courant
    pub fn visible_len(&self) -> usize {
        match self.list_screen() {
            Screen::Watchlist => self.watchlist.len(),
            Screen::Leaderboard => self.leaderboard().len(),
            _ => self.market_view().len(),
        }
    }

    /// Écran de liste sous-jacent (détail et saisie pointent vers l'écran d'origine)
    pub fn list_screen(&self) -> Screen {
        match self.current_screen {
            Screen::CoinDetail | Screen::InputMode => self.previous_screen,
            screen => screen,
        }
    }

    /// Id de la crypto sélectionnée
    ///
    /// Sur l'écran de détail, c'est la crypto ouverte et non la ligne
    /// courante de la liste
    pub fn selected_coin_id(&self) -> Option<String> {
        if self.current_screen == Screen::CoinDetail {
            return self.detail_id.clone();
        }

        match self.list_screen() {
            Screen::Watchlist => self.watchlist.get(self.selected_index).map(|e| e.id.clone()),
            Screen::Leaderboard => self.leaderboard().get(self.selected_index).map(|c| c.id.clone()),
            _ => self
                .market_view()
                .get(self.selected_index)
                .map(|v| v.coin.id.clone()),
        }
    }

    /// Record de la crypto sélectionnée (si présente dans le dernier fetch)
    pub fn selected_coin(&self) -> Option<&CoinRecord> {
        let id = self.selected_coin_id()?;
        self.coins.iter().find(|c| c.id == id)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.visible_len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    fn clamp_selection(&mut self) {
        let max_index = self.visible_len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max_index);
    }

    /// Change d'écran de liste (Markets, Watchlist, Leaderboard)
    pub fn switch_to(&mut self, screen: Screen) {
        if self.current_screen != screen {
            debug!(?screen, "Switching screen");
        }
        self.current_screen = screen;
        self.previous_screen = screen;
        self.selected_index = 0;
        self.detail_id = None;
        self.confirm_delete = false;
    }

    /// Onglet suivant : Markets → Watchlist → Leaderboard → Markets
    pub fn next_tab(&mut self) {
        let next = match self.list_screen() {
            Screen::Markets => Screen::Watchlist,
            Screen::Watchlist => Screen::Leaderboard,
            _ => Screen::Markets,
        };
        self.switch_to(next);
    }

    pub fn show_detail(&mut self) {
        if let Some(id) = self.selected_coin_id() {
            debug!(coin = %id, "Opening detail");
            self.previous_screen = self.list_screen();
            self.current_screen = Screen::CoinDetail;
            self.detail_id = Some(id);
        }
    }

    /// Retour à l'écran de liste
    pub fn back(&mut self) {
        self.current_screen = self.previous_screen;
        self.detail_id = None;
    }

    pub fn is_on(&self, screen: Screen) -> bool {
        self.current_screen == screen
    }

    // ========================================================================
    // Confirmations two-step
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Annule toutes les confirmations en attente
    pub fn cancel_confirmations(&mut self) {
        self.cancel_quit();
        self.cancel_delete();
    }

    // ========================================================================
    // Chargement et messages
    // ========================================================================

    pub fn start_loading(&mut self, message: Option<String>) {
        self.is_loading = true;
        self.loading_message = message;
    }

    pub fn stop_loading(&mut self) {
        self.is_loading = false;
        self.loading_message = None;
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.warning = Some((message.into(), Instant::now()));
    }

    /// Avertissement courant, s'il n'a pas expiré
    pub fn active_warning(&self) -> Option<&str> {
        self.warning
            .as_ref()
            .filter(|(_, at)| at.elapsed() < WARNING_TTL)
            .map(|(msg, _)| msg.as_str())
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    // ========================================================================
    // Input Mode
    // ========================================================================

    /// Entre en mode input
    ///
    /// Le buffer est pré-rempli avec la valeur courante pour la recherche
    pub fn start_input(&mut self, target: InputTarget) {
        self.previous_screen = self.list_screen();
        self.current_screen = Screen::InputMode;
        self.input_target = Some(target);
        self.input_buffer = match target {
            InputTarget::Search => self.filter.search.clone(),
            InputTarget::MinPrice => self.filter.min_price.map(|v| v.to_string()).unwrap_or_default(),
            InputTarget::MaxPrice => self.filter.max_price.map(|v| v.to_string()).unwrap_or_default(),
            InputTarget::AddCoin => String::new(),
        };
    }

    pub fn cancel_input(&mut self) {
        self.current_screen = self.previous_screen;
        self.input_buffer.clear();
        self.input_target = None;
    }

    /// Valide la saisie et retourne (cible, valeur)
    pub fn submit_input(&mut self) -> Option<(InputTarget, String)> {
        let target = self.input_target.take()?;
        let value = std::mem::take(&mut self.input_buffer);
        self.current_screen = self.previous_screen;
        Some((target, value))
    }

    pub fn append_char(&mut self, c: char) {
        if self.input_target.map(|t| t.accepts(c)).unwrap_or(false) {
            self.input_buffer.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::InputMode
    }

    pub fn input_prompt(&self) -> &'static str {
        self.input_target.map(|t| t.prompt()).unwrap_or("")
    }

    /// Applique une saisie validée au filtre ou à la watchlist
    pub fn apply_input(&mut self, target: InputTarget, value: &str) -> Result<()> {
        match target {
            InputTarget::Search => {
                self.filter.search = value.to_string();
            }
            InputTarget::MinPrice => {
                self.filter.min_price = filter::parse_price_bound(value);
            }
            InputTarget::MaxPrice => {
                self.filter.max_price = filter::parse_price_bound(value);
            }
            InputTarget::AddCoin => {
                match self.add_to_watchlist_by_query(value)? {
                    AddOutcome::Added(name) => self.set_warning(format!("{} has been added to your watchlist.", name)),
                    AddOutcome::AlreadyPresent(name) => self.set_warning(format!("{} is already in your watchlist.", name)),
                    AddOutcome::NotFound(query) => self.set_warning(format!("No coin matches \"{}\".", query)),
                }
            }
        }
        self.selected_index = 0;
        Ok(())
    }

    // ========================================================================
    // Filtres
    // ========================================================================

    pub fn cycle_sort_key(&mut self) {
        let next = self.filter.sort.key.next();
        self.filter.sort.toggle(next);
    }

    pub fn reverse_sort(&mut self) {
        let key = self.filter.sort.key;
        self.filter.sort.toggle(key);
    }

    pub fn cycle_market_cap(&mut self) {
        self.filter.market_cap = self.filter.market_cap.next();
        self.clamp_selection();
    }

    pub fn cycle_change_filter(&mut self) {
        self.filter.change = self.filter.change.next();
        self.clamp_selection();
    }

    pub fn toggle_favorites_only(&mut self) {
        self.filter.favorites_only = !self.filter.favorites_only;
        self.clamp_selection();
    }

    pub fn reset_filters(&mut self) {
        self.filter.reset_filters();
        self.selected_index = 0;
    }

    // ========================================================================
    // Favoris et watchlist
    // ========================================================================

    /// Bascule le favori de la crypto sélectionnée
    pub fn toggle_selected_favorite(&mut self) -> Result<Option<bool>> {
        let id = match self.selected_coin_id() {
            Some(id) => id,
            None => return Ok(None),
        };

        let favorite = self.favorites.toggle(&id)?;
        self.overlay.set_favorites(self.favorites.ids().iter().cloned());
        self.clamp_selection();
        Ok(Some(favorite))
    }

    /// Ajoute la crypto sélectionnée du tableau de marché à la watchlist
    pub fn add_selected_to_watchlist(&mut self) -> Result<AddOutcome> {
        let coin = match self.selected_coin() {
            Some(coin) => coin.clone(),
            None => return Ok(AddOutcome::NotFound(String::new())),
        };
        self.add_coin(&coin)
    }

    /// Ajoute une crypto par recherche
    ///
    /// Priorité à une correspondance exacte sur l'id ou le symbole, sinon
    /// première correspondance par sous-chaîne
    pub fn add_to_watchlist_by_query(&mut self, query: &str) -> Result<AddOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(AddOutcome::NotFound(String::new()));
        }

        let lowered = query.to_lowercase();
        let is_exact = |c: &CoinRecord| c.id == lowered || c.symbol.to_lowercase() == lowered;

        let candidates = filter::add_candidates(&self.coins, &self.watchlist.ids(), query);
        let chosen = candidates
            .iter()
            .find(|c| is_exact(c))
            .or_else(|| candidates.first())
            .map(|c| (*c).clone());

        if let Some(coin) = chosen {
            return self.add_coin(&coin);
        }

        // Tout ce qui correspond est déjà suivi
        let already = filter::search_coins(&self.coins, query)
            .into_iter()
            .find(|c| self.watchlist.contains(&c.id))
            .map(|c| c.name.clone());

        Ok(match already {
            Some(name) => AddOutcome::AlreadyPresent(name),
            None => AddOutcome::NotFound(query.to_string()),
        })
    }

    fn add_coin(&mut self, coin: &CoinRecord) -> Result<AddOutcome> {
        if self.watchlist.add(WatchlistEntry::from(coin))? {
            Ok(AddOutcome::Added(coin.name.clone()))
        } else {
            Ok(AddOutcome::AlreadyPresent(coin.name.clone()))
        }
    }

    /// Supprime l'entrée sélectionnée de la watchlist
    pub fn delete_selected(&mut self) -> Result<Option<WatchlistEntry>> {
        self.confirm_delete = false;

        let id = match self.watchlist.get(self.selected_index) {
            Some(entry) => entry.id.clone(),
            None => return Ok(None),
        };

        let removed = self.watchlist.remove(&id)?;
        self.clamp_selection();
        Ok(removed)
    }

    // ========================================================================
    // Tick et polling
    // ========================================================================

    /// Appelé à chaque itération de la boucle
    pub fn tick(&mut self) {
        if self.warning.is_some() && self.active_warning().is_none() {
            self.warning = None;
        }
    }

    /// Renvoie les fetchs arrivés à échéance et replanifie
    pub fn poll_due(&mut self, now: Instant) -> DueFetches {
        let mut due = DueFetches::default();

        if now >= self.schedule.next_markets {
            due.markets = true;
            self.schedule.next_markets = now + self.schedule.markets_every;
        }

        if now >= self.schedule.next_global {
            due.global = true;
            self.schedule.next_global = now + self.schedule.global_every;
        }

        if now >= self.schedule.next_live {
            self.schedule.next_live = now + self.schedule.live_every;
            // Seul le prix de la crypto sélectionnée est rafraîchi en continu
            if matches!(self.current_screen, Screen::CoinDetail | Screen::Watchlist) {
                due.live_price = self.selected_coin_id();
            }
        }

        due
    }

    /// Replanifie les fetchs de marché après un refresh manuel
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.schedule.next_markets = now + self.schedule.markets_every;
        self.schedule.next_global = now + self.schedule.global_every;
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ChangeFilter, SortConfig, SortDirection, SortKey};
    use crate::persistence::MemoryStore;

    fn sample_coins() -> Vec<CoinRecord> {
        vec![
            CoinRecord::new("bitcoin", "Bitcoin", "btc").with_rank(1).with_price(63000.0).with_change(2.0),
            CoinRecord::new("ethereum", "Ethereum", "eth").with_rank(2).with_price(3400.0).with_change(-1.0),
            CoinRecord::new("solana", "Solana", "sol").with_rank(5).with_price(140.0).with_change(4.0),
        ]
    }

    fn app_with_coins() -> App {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut app = App::new(store, &Config::default());
        app.apply_markets(sample_coins());
        app
    }

    #[test]
    fn test_app_creation() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let app = App::new(store, &Config::default());
        assert!(app.is_running());
        assert!(app.coins.is_empty());
        assert!(app.watchlist.is_empty());
        assert_eq!(app.current_screen, Screen::Markets);
    }

    #[test]
    fn test_empty_fetch_keeps_previous_data() {
        let mut app = app_with_coins();
        assert!(app.last_updated.is_some());

        app.apply_markets(Vec::new());
        assert_eq!(app.coins.len(), 3);
        assert!(app.error_message.is_some());

        app.apply_markets(sample_coins());
        assert!(app.error_message.is_none());
    }

    #[test]
    fn test_global_fallback_does_not_overwrite() {
        let mut app = app_with_coins();
        let stats = GlobalStats { active_cryptocurrencies: 10, ..GlobalStats::default() };
        app.apply_global(stats.clone());
        app.apply_global(GlobalStats::default());
        assert_eq!(app.global, stats);
    }

    #[test]
    fn test_navigation_follows_filtered_view() {
        let mut app = app_with_coins();
        assert_eq!(app.selected_coin_id().as_deref(), Some("bitcoin"));

        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_coin_id().as_deref(), Some("solana"));

        app.filter.change = ChangeFilter::Negative;
        app.cycle_market_cap();
        app.reset_filters();
        app.filter.change = ChangeFilter::Negative;
        assert_eq!(app.selected_coin_id().as_deref(), Some("ethereum"));

        app.navigate_up();
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_search_input_flow() {
        let mut app = app_with_coins();
        app.start_input(InputTarget::Search);
        assert!(app.is_in_input_mode());

        for c in "sol".chars() {
            app.append_char(c);
        }
        let (target, value) = app.submit_input().unwrap();
        app.apply_input(target, &value).unwrap();

        assert_eq!(app.current_screen, Screen::Markets);
        assert_eq!(app.market_view().len(), 1);
        assert_eq!(app.selected_coin_id().as_deref(), Some("solana"));
    }

    #[test]
    fn test_price_input_rejects_letters() {
        let mut app = app_with_coins();
        app.start_input(InputTarget::MinPrice);
        for c in "1a0x00".chars() {
            app.append_char(c);
        }
        assert_eq!(app.input_buffer, "1000");

        let (target, value) = app.submit_input().unwrap();
        app.apply_input(target, &value).unwrap();
        assert_eq!(app.filter.min_price, Some(1000.0));
        assert_eq!(app.market_view().len(), 2);
    }

    #[test]
    fn test_cancel_input_restores_screen() {
        let mut app = app_with_coins();
        app.switch_to(Screen::Watchlist);
        app.start_input(InputTarget::AddCoin);
        app.append_char('x');
        app.cancel_input();

        assert_eq!(app.current_screen, Screen::Watchlist);
        assert!(app.input_buffer.is_empty());
        assert!(app.submit_input().is_none());
    }

    #[test]
    fn test_favorite_toggle_updates_overlay() {
        let mut app = app_with_coins();
        assert_eq!(app.toggle_selected_favorite().unwrap(), Some(true));
        assert!(app.overlay.is_favorite("bitcoin"));

        app.toggle_favorites_only();
        assert_eq!(app.market_view().len(), 1);

        assert_eq!(app.toggle_selected_favorite().unwrap(), Some(false));
        assert!(app.market_view().is_empty());
    }

    #[test]
    fn test_add_to_watchlist_by_query() {
        let mut app = app_with_coins();

        assert_eq!(
            app.add_to_watchlist_by_query("ETH").unwrap(),
            AddOutcome::Added("Ethereum".to_string())
        );
        assert_eq!(
            app.add_to_watchlist_by_query("ethereum").unwrap(),
            AddOutcome::AlreadyPresent("Ethereum".to_string())
        );
        assert_eq!(
            app.add_to_watchlist_by_query("doge").unwrap(),
            AddOutcome::NotFound("doge".to_string())
        );
        assert_eq!(app.watchlist.len(), 1);
    }

    #[test]
    fn test_watchlist_delete_selected() {
        let mut app = app_with_coins();
        app.add_selected_to_watchlist().unwrap();
        app.navigate_down();
        app.add_selected_to_watchlist().unwrap();

        app.switch_to(Screen::Watchlist);
        assert_eq!(app.visible_len(), 2);

        app.navigate_down();
        let removed = app.delete_selected().unwrap().unwrap();
        assert_eq!(removed.id, "ethereum");
        assert_eq!(app.selected_index, 0);
        assert_eq!(app.selected_coin_id().as_deref(), Some("bitcoin"));
    }

    #[test]
    fn test_detail_and_back() {
        let mut app = app_with_coins();
        app.switch_to(Screen::Watchlist);
        // Watchlist vide : pas de détail
        app.show_detail();
        assert_eq!(app.current_screen, Screen::Watchlist);

        app.switch_to(Screen::Markets);
        app.show_detail();
        assert_eq!(app.current_screen, Screen::CoinDetail);
        assert_eq!(app.selected_coin().map(|c| c.id.as_str()), Some("bitcoin"));

        app.back();
        assert_eq!(app.current_screen, Screen::Markets);
    }

    #[test]
    fn test_detail_keeps_coin_when_rows_reorder() {
        let mut app = app_with_coins();
        app.filter.sort = SortConfig::new(SortKey::PriceChange24h, SortDirection::Descending);

        // solana (4%), bitcoin (2%), ethereum (-1%)
        app.navigate_down();
        app.show_detail();
        assert_eq!(app.selected_coin_id().as_deref(), Some("bitcoin"));

        // Nouveau fetch : bitcoin passe en tête, la ligne 1 devient solana
        let mut coins = sample_coins();
        coins[0].price_change_percentage_24h = Some(10.0);
        app.apply_markets(coins);
        assert_eq!(app.selected_coin().map(|c| c.id.as_str()), Some("bitcoin"));
        assert_eq!(app.selected_coin().and_then(|c| c.price_change_percentage_24h), Some(10.0));

        // Le tri inverse ne change pas non plus la crypto ouverte
        app.reverse_sort();
        assert_eq!(app.selected_coin_id().as_deref(), Some("bitcoin"));
        assert_eq!(app.poll_due(Instant::now() + Duration::from_secs(3600)).live_price.as_deref(), Some("bitcoin"));

        app.back();
        assert_eq!(app.detail_id, None);
        assert_eq!(app.current_screen, Screen::Markets);
    }

    #[test]
    fn test_leaderboard_rows_are_selectable() {
        let mut app = app_with_coins();
        app.switch_to(Screen::Leaderboard);

        // Hausses : solana, bitcoin. Baisses : ethereum
        assert_eq!(app.visible_len(), 3);
        assert_eq!(app.selected_coin_id().as_deref(), Some("solana"));

        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_index, 2);
        assert_eq!(app.selected_coin_id().as_deref(), Some("ethereum"));

        app.show_detail();
        assert_eq!(app.current_screen, Screen::CoinDetail);
        assert_eq!(app.selected_coin().map(|c| c.id.as_str()), Some("ethereum"));

        app.back();
        assert_eq!(app.current_screen, Screen::Leaderboard);
    }

    #[test]
    fn test_cycle_timeframe_reranks_leaderboard() {
        let mut app = app_with_coins();
        let mut coins = sample_coins();
        coins[1] = coins[1].clone().with_change_over(Timeframe::D7, 12.0);
        app.apply_markets(coins);
        app.switch_to(Screen::Leaderboard);
        app.navigate_down();
        app.navigate_down();

        app.cycle_timeframe();
        assert_eq!(app.leaderboard_timeframe, Timeframe::D7);
        // Seul ethereum a une variation 7j
        assert_eq!(app.visible_len(), 1);
        assert_eq!(app.selected_index, 0);
        assert_eq!(app.selected_coin_id().as_deref(), Some("ethereum"));

        app.cycle_timeframe();
        app.cycle_timeframe();
        assert_eq!(app.leaderboard_timeframe, Timeframe::H24);
    }

    #[test]
    fn test_tabs_cycle() {
        let mut app = app_with_coins();
        app.next_tab();
        assert_eq!(app.current_screen, Screen::Watchlist);
        app.next_tab();
        assert_eq!(app.current_screen, Screen::Leaderboard);
        app.next_tab();
        assert_eq!(app.current_screen, Screen::Markets);
    }

    #[test]
    fn test_sort_cycle() {
        let mut app = app_with_coins();
        app.cycle_sort_key();
        assert_eq!(app.filter.sort.key, SortKey::Name);
        app.cycle_sort_key();
        assert_eq!(app.filter.sort.key, SortKey::CurrentPrice);
        assert_eq!(app.selected_coin_id().as_deref(), Some("bitcoin"));

        app.reverse_sort();
        assert_eq!(app.selected_coin_id().as_deref(), Some("solana"));
    }

    #[test]
    fn test_live_price_overlay() {
        let mut app = app_with_coins();
        app.apply_live_price("bitcoin", SimplePrice { usd: 64000.0, usd_24h_change: Some(3.0) });

        let view = app.market_view();
        assert_eq!(view[0].display_price(), Some(64000.0));
        assert_eq!(app.coins[0].current_price, Some(63000.0));
    }

    #[test]
    fn test_poll_schedule() {
        let mut app = app_with_coins();
        let now = Instant::now();

        assert!(app.poll_due(now).is_empty());

        let later = now + Duration::from_secs(61);
        let due = app.poll_due(later);
        assert!(due.markets);
        assert!(!due.global);
        // Sur le tableau de marché, pas de rafraîchissement live
        assert_eq!(due.live_price, None);

        app.show_detail();
        let due = app.poll_due(later + Duration::from_secs(60));
        assert!(due.global);
        assert_eq!(due.live_price.as_deref(), Some("bitcoin"));

        app.mark_refreshed(later + Duration::from_secs(60));
        assert!(!app.poll_due(later + Duration::from_secs(61)).markets);
    }

    #[test]
    fn test_warning_is_transient() {
        let mut app = app_with_coins();
        app.set_warning("API rate limited. Try again later.");
        assert_eq!(app.active_warning(), Some("API rate limited. Try again later."));

        app.warning = Some(("old".to_string(), Instant::now() - Duration::from_secs(10)));
        assert_eq!(app.active_warning(), None);
        app.tick();
        assert!(app.warning.is_none());
    }
}
