// ============================================================================
// CoinDeck - Tableau de bord crypto dans le terminal
// ============================================================================
// Programme TUI : tableau de marché filtrable, watchlist, favoris,
// leaderboard et détail avec historique 7 jours. Données CoinGecko.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Async dans sync : tokio::runtime::Runtime dans un worker thread
// 4. Channels : l'UI envoie des commandes, le worker renvoie des résultats
// ============================================================================

use std::io;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use coindeck::api::{CoinGeckoClient, MarketsQuery};
use coindeck::app::{AddOutcome, App, DueFetches, InputTarget, Screen};
use coindeck::config::Config;
use coindeck::error::FetchError;
use coindeck::models::{CoinRecord, GlobalStats, SimplePrice};
use coindeck::persistence::{FileStore, KeyValueStore};
use coindeck::rate_limiter::{DenyReason, Permit, RateLimiter, RateLimiterStatus};
use coindeck::ui::{events::EventHandler, render};

// ============================================================================
// AppCommand / AppResult : protocole entre l'UI et le worker
// ============================================================================
// CONCEPT RUST : Command pattern avec channels
// - L'event loop envoie des commandes au worker thread
// - Le worker exécute les appels réseau et renvoie un résultat
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Recharger le tableau de marché
    FetchMarkets,

    /// Recharger les stats globales
    FetchGlobal,

    /// Rafraîchir le prix live d'une crypto
    /// - force : contourne le cooldown et le throttle du limiteur
    /// - manual : demandé par l'utilisateur (un refus est affiché)
    RefreshPrice { id: String, force: bool, manual: bool },
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    MarketsLoaded(Vec<CoinRecord>),

    MarketsError(String),

    GlobalLoaded(GlobalStats),

    PriceLoaded { id: String, price: SimplePrice },

    /// Le limiteur a refusé l'appel
    PriceDenied { id: String, reason: DenyReason, manual: bool },

    PriceError { id: String, error: FetchError },

    /// État du limiteur après une demande de prix
    LimiterStatus(RateLimiterStatus),
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// ```bash
/// tail -f logs/coindeck.log.*
/// RUST_LOG=coindeck=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "coindeck.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour coindeck, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coindeck=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

/// Verrouille l'état partagé
///
/// CONCEPT RUST : PoisonError
/// - Si un thread a paniqué avec le lock, on récupère quand même l'état
fn lock_app(app: &Mutex<App>) -> MutexGuard<'_, App> {
    app.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("CoinDeck starting up");
    println!("CoinDeck starting up");

    // Une config invalide n'empêche pas de démarrer
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = ?e, "Invalid config, falling back to defaults");
        eprintln!("⚠️  {:#}", e);
        Config::default()
    });

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir()));
    let client = CoinGeckoClient::new(&config)?;
    let limiter = RateLimiter::default();
    let query = MarketsQuery::from_config(&config);

    // Chargement initial avant de passer en mode TUI
    println!("📊 Chargement des marchés depuis {}...", client.base_url());
    let runtime = tokio::runtime::Runtime::new()?;
    let (coins, global) = runtime.block_on(async {
        tokio::join!(client.fetch_markets(&query), client.fetch_global())
    });
    drop(runtime);

    if coins.is_empty() {
        println!("  ⚠ Aucune donnée, nouvel essai dans le TUI avec [r]");
    } else {
        println!("  ✓ {} cryptos chargées", coins.len());
    }

    let mut app = App::new(store, &config);
    app.apply_markets(coins);
    app.apply_global(global);
    info!(
        watchlist = app.watchlist.len(),
        favorites = app.favorites.ids().len(),
        "User data loaded"
    );

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    // CONCEPT RUST : Arc<Mutex<>> pour partage entre threads
    // - Le worker met à jour l'indicateur de chargement
    let app = Arc::new(Mutex::new(app));

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(client, query, limiter, command_rx, result_tx, app.clone());

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, app, &events, command_tx, result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Background async worker avec channels
// - Thread séparé avec son propre runtime tokio
// - Possède le client HTTP et une copie du limiteur
// - Permet de faire des appels API sans bloquer l'UI
// ============================================================================

fn spawn_background_worker(
    client: CoinGeckoClient,
    query: MarketsQuery,
    limiter: RateLimiter,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
    app: Arc<Mutex<App>>,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = ?e, "Failed to create worker runtime");
                return;
            }
        };

        // Le channel se ferme quand l'event loop se termine
        while let Ok(command) = command_rx.recv() {
            debug!(?command, "Worker received command");

            let result = match command {
                AppCommand::FetchMarkets => {
                    lock_app(&app).start_loading(Some("Refreshing markets...".to_string()));
                    let result = runtime.block_on(client.try_fetch_markets(&query));
                    lock_app(&app).stop_loading();

                    match result {
                        Ok(coins) => AppResult::MarketsLoaded(coins),
                        Err(e) => {
                            error!(error = %e, "Market refresh failed");
                            AppResult::MarketsError(e.to_string())
                        }
                    }
                }

                AppCommand::FetchGlobal => AppResult::GlobalLoaded(runtime.block_on(client.fetch_global())),

                AppCommand::RefreshPrice { id, force, manual } => {
                    let result = match limiter.try_acquire(force) {
                        Permit::Denied(reason) => AppResult::PriceDenied { id, reason, manual },
                        Permit::Granted => match runtime.block_on(client.fetch_simple_price(&id)) {
                            Ok(price) => AppResult::PriceLoaded { id, price },
                            Err(error) => {
                                // Le fournisseur nous limite : on arrête de l'appeler un moment
                                if error.is_rate_limited() {
                                    warn!(coin = %id, "Provider rate limit hit, arming throttle");
                                    limiter.arm_throttle();
                                }
                                AppResult::PriceError { id, error }
                            }
                        },
                    };
                    let _ = result_tx.send(AppResult::LimiterStatus(limiter.status()));
                    result
                }
            };

            if result_tx.send(result).is_err() {
                break;
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// CONCEPT : Game Loop / Event Loop Pattern
// - Résultats du worker → Render → Input → Update + polling
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: Arc<Mutex<App>>,
    events: &EventHandler,
    command_tx: mpsc::Sender<AppCommand>,
    result_rx: mpsc::Receiver<AppResult>,
) -> Result<()> {
    let mut worker_alive = true;

    loop {
        if !lock_app(&app).is_running() {
            break;
        }

        // ========================================
        // 0. RÉSULTATS : tout ce que le worker a produit depuis le dernier tour
        // ========================================
        loop {
            match result_rx.try_recv() {
                Ok(result) => apply_result(&mut lock_app(&app), result),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if worker_alive {
                        error!("Worker thread disconnected!");
                        lock_app(&app).set_error("Background worker stopped. Restart CoinDeck to refresh data.");
                        worker_alive = false;
                    }
                    break;
                }
            }
        }

        // ========================================
        // 1. RENDER
        // ========================================
        {
            let app_lock = lock_app(&app);
            terminal.draw(|frame| render(frame, &app_lock))?;
        }

        // ========================================
        // 2. INPUT
        // ========================================
        match events.next() {
            Ok(event) => handle_event(&mut lock_app(&app), event, &command_tx),
            Err(e) => debug!(error = ?e, "Failed to read terminal event"),
        }

        // ========================================
        // 3. UPDATE : expiration des messages + polling
        // ========================================
        let due = {
            let mut app_lock = lock_app(&app);
            app_lock.tick();
            app_lock.poll_due(Instant::now())
        };
        send_due(&command_tx, due);
    }

    Ok(())
}

/// Envoie les fetchs périodiques arrivés à échéance
fn send_due(command_tx: &mpsc::Sender<AppCommand>, due: DueFetches) {
    if due.is_empty() {
        return;
    }
    debug!(?due, "Polling");

    if due.markets {
        let _ = command_tx.send(AppCommand::FetchMarkets);
    }
    if due.global {
        let _ = command_tx.send(AppCommand::FetchGlobal);
    }
    if let Some(id) = due.live_price {
        let _ = command_tx.send(AppCommand::RefreshPrice { id, force: false, manual: false });
    }
}

/// Applique un résultat du worker à l'état
fn apply_result(app: &mut App, result: AppResult) {
    match result {
        AppResult::MarketsLoaded(coins) => app.apply_markets(coins),

        AppResult::MarketsError(error) => {
            app.set_error(format!("Failed to load market data: {} [r] Retry", error));
        }

        AppResult::GlobalLoaded(stats) => app.apply_global(stats),

        AppResult::PriceLoaded { id, price } => app.apply_live_price(&id, price),

        AppResult::PriceDenied { id, reason, manual } => {
            debug!(coin = %id, ?reason, manual, "Live price refresh denied");
            if manual {
                match reason {
                    DenyReason::Cooldown => app.set_warning("Please wait a moment before refreshing again."),
                    DenyReason::Throttled { until } => {
                        let secs = until.saturating_duration_since(Instant::now()).as_secs();
                        app.set_warning(format!("API rate limited. Try again in {}s.", secs))
                    }
                }
            }
        }

        AppResult::LimiterStatus(status) => app.limiter_status = Some(status),

        AppResult::PriceError { id, error } => {
            warn!(coin = %id, error = %error, "Live price refresh failed");
            if error.is_rate_limited() {
                app.set_warning("API rate limited. Try again later.");
            } else {
                app.set_warning(format!("Failed to refresh {}: {}", id, error));
            }
        }
    }
}

// ============================================================================
// Gestion des événements
// ============================================================================
// CONCEPT RUST : Pattern matching avec guards
// - L'ordre des bras compte : le mode input passe avant tout le reste
// ============================================================================

fn handle_event(app: &mut App, event: coindeck::ui::events::Event, command_tx: &mpsc::Sender<AppCommand>) {
    use coindeck::ui::events::{
        get_char_from_event, is_add_event, is_backspace_event, is_char_event, is_delete_event,
        is_down_event, is_enter_event, is_escape_event, is_quit_event, is_refresh_event,
        is_search_event, is_tab_event, is_up_event, tab_index, Event,
    };

    if let Event::Tick = event {
        return;
    }

    // ========================================
    // Input Mode : la saisie capture toutes les touches
    // ========================================
    if app.is_in_input_mode() {
        if is_escape_event(&event) {
            debug!("User cancelled input");
            app.cancel_input();
        } else if is_enter_event(&event) {
            if let Some((target, value)) = app.submit_input() {
                info!(?target, value = %value, "User submitted input");
                if let Err(e) = app.apply_input(target, &value) {
                    error!(error = ?e, "Failed to apply input");
                    app.set_error(format!("Could not save watchlist: {}", e));
                }
            }
        } else if is_backspace_event(&event) {
            app.backspace();
        } else if let Some(c) = get_char_from_event(&event) {
            app.append_char(c);
        }
        return;
    }

    let on_markets = app.is_on(Screen::Markets);
    let on_watchlist = app.is_on(Screen::Watchlist);
    let on_list = on_markets || on_watchlist || app.is_on(Screen::Leaderboard);
    let on_detail = app.is_on(Screen::CoinDetail);

    // Two-step : une deuxième pression confirme, toute autre touche annule
    if is_quit_event(&event) {
        app.cancel_delete();
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return;
    }

    if is_delete_event(&event) && on_watchlist && !app.watchlist.is_empty() {
        app.cancel_quit();
        if app.is_awaiting_delete_confirmation() {
            match app.delete_selected() {
                Ok(Some(entry)) => {
                    info!(coin = %entry.id, "User removed coin from watchlist");
                    app.set_warning(format!("{} has been removed from your watchlist.", entry.name));
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = ?e, "Failed to save watchlist");
                    app.set_error(format!("Could not save watchlist: {}", e));
                }
            }
        } else {
            info!("User requested delete (awaiting confirmation)");
            app.request_delete();
        }
        return;
    }

    app.cancel_confirmations();

    match event {
        Event::Key(_) if is_escape_event(&event) && on_detail => app.back(),

        Event::Key(_) if is_tab_event(&event) && (on_list || on_detail) => app.next_tab(),

        Event::Key(_) if tab_index(&event).is_some() => {
            let screen = match tab_index(&event) {
                Some(1) => Screen::Watchlist,
                Some(2) => Screen::Leaderboard,
                _ => Screen::Markets,
            };
            app.switch_to(screen);
        }

        Event::Key(_) if is_up_event(&event) && on_list => app.navigate_up(),
        Event::Key(_) if is_down_event(&event) && on_list => app.navigate_down(),

        Event::Key(_) if is_enter_event(&event) && on_list => {
            app.show_detail();
            // On rafraîchit tout de suite le prix de la crypto ouverte
            if let Some(id) = app.selected_coin_id().filter(|_| app.is_on(Screen::CoinDetail)) {
                info!(coin = %id, "User opened coin detail");
                let _ = command_tx.send(AppCommand::RefreshPrice { id, force: false, manual: false });
            }
        }

        // ========================================
        // Filtres et tri
        // ========================================
        Event::Key(_) if is_search_event(&event) && (on_markets || app.is_on(Screen::Leaderboard)) => {
            app.start_input(InputTarget::Search);
        }
        Event::Key(_) if is_char_event(&event, 's') && on_markets => app.cycle_sort_key(),
        Event::Key(_) if is_char_event(&event, 'S') && on_markets => app.reverse_sort(),
        Event::Key(_) if is_char_event(&event, 'm') && on_markets => app.start_input(InputTarget::MinPrice),
        Event::Key(_) if is_char_event(&event, 'M') && on_markets => app.start_input(InputTarget::MaxPrice),
        Event::Key(_) if is_char_event(&event, 'c') && on_markets => app.cycle_market_cap(),
        Event::Key(_) if is_char_event(&event, 'g') && on_markets => app.cycle_change_filter(),
        Event::Key(_) if is_char_event(&event, 'F') && on_markets => app.toggle_favorites_only(),
        Event::Key(_) if is_char_event(&event, 'x') && on_markets => app.reset_filters(),
        Event::Key(_) if is_char_event(&event, 't') && app.is_on(Screen::Leaderboard) => app.cycle_timeframe(),

        // ========================================
        // Favoris et watchlist
        // ========================================
        Event::Key(_) if is_char_event(&event, 'f') && (on_list || on_detail) => {
            match app.toggle_selected_favorite() {
                Ok(Some(favorite)) => debug!(favorite, "Favorite toggled"),
                Ok(None) => {}
                Err(e) => {
                    error!(error = ?e, "Failed to save favorites");
                    app.set_error(format!("Could not save favorites: {}", e));
                }
            }
        }

        Event::Key(_) if is_add_event(&event) && on_watchlist => app.start_input(InputTarget::AddCoin),

        Event::Key(_) if is_add_event(&event) && (on_markets || on_detail) => {
            match app.add_selected_to_watchlist() {
                Ok(AddOutcome::Added(name)) => app.set_warning(format!("{} has been added to your watchlist.", name)),
                Ok(AddOutcome::AlreadyPresent(name)) => app.set_warning(format!("{} is already in your watchlist.", name)),
                Ok(AddOutcome::NotFound(_)) => {}
                Err(e) => {
                    error!(error = ?e, "Failed to save watchlist");
                    app.set_error(format!("Could not save watchlist: {}", e));
                }
            }
        }

        // ========================================
        // Rafraîchissements
        // ========================================
        Event::Key(_) if is_refresh_event(&event) => {
            info!("User requested market refresh");
            let _ = command_tx.send(AppCommand::FetchMarkets);
            let _ = command_tx.send(AppCommand::FetchGlobal);
            app.mark_refreshed(Instant::now());
        }

        Event::Key(_) if is_char_event(&event, 'p') || is_char_event(&event, 'P') => {
            let force = is_char_event(&event, 'P');
            if let Some(id) = app.selected_coin_id() {
                info!(coin = %id, force, "User requested live price refresh");
                let _ = command_tx.send(AppCommand::RefreshPrice { id, force, manual: true });
            }
        }

        _ => {}
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
