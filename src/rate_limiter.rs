// ============================================================================
// Module : rate_limiter
// ============================================================================
// Limiteur d'appels pour le rafraîchissement des prix live
//
// Règles :
// - 2 secondes minimum entre deux appels autorisés (cooldown)
// - 10 appels maximum sur toute fenêtre glissante de 60 secondes
// - Au-delà : throttle de 60 secondes, tout est refusé jusqu'au reset
// - Un refresh forcé ignore le cooldown et le throttle, mais il est compté
//   et peut lui-même armer le throttle pour les appels suivants
//
// CONCEPTS RUST :
// 1. Arc<Mutex<State>> : état partagé entre threads, cloner le handle
//    partage le même compteur
// 2. Check-and-update atomique : la vérification et la mise à jour se font
//    sous le même lock, deux appelants ne peuvent pas passer ensemble
// 3. Instant injecté : les méthodes *_at(now) rendent les tests déterministes
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Paramètres du limiteur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    /// Délai minimum entre deux appels autorisés
    pub min_interval: Duration,

    /// Nombre max d'appels par fenêtre
    pub max_calls: u32,

    /// Durée de la fenêtre glissante de comptage
    pub window: Duration,

    /// Durée du throttle une fois armé
    pub throttle: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(2000),
            max_calls: 10,
            window: Duration::from_secs(60),
            throttle: Duration::from_secs(60),
        }
    }
}

/// Raison d'un refus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Moins de min_interval depuis le dernier appel
    Cooldown,

    /// Throttle actif jusqu'à `until`
    Throttled { until: Instant },
}

/// Résultat d'une demande de permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Granted,
    Denied(DenyReason),
}

impl Permit {
    pub fn is_granted(&self) -> bool {
        matches!(self, Permit::Granted)
    }
}

/// Vue instantanée de l'état, pour l'affichage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterStatus {
    pub call_count: u32,
    pub max_calls: u32,
    pub throttled: bool,

    /// Temps restant avant la fin du throttle
    pub throttle_remaining: Option<Duration>,
}

/// État interne, toujours manipulé sous le lock
///
/// CONCEPT RUST : VecDeque
/// - Les appels autorisés sont ajoutés à la fin, les plus vieux sortent
///   par le début quand ils quittent la fenêtre
#[derive(Debug, Default)]
struct State {
    last_call: Option<Instant>,

    /// Instants des appels autorisés encore dans la fenêtre
    calls: VecDeque<Instant>,
    throttled: bool,
    reset_at: Option<Instant>,
}

impl State {
    fn reset(&mut self) {
        self.throttled = false;
        self.reset_at = None;
        self.calls.clear();
    }

    /// Retire les appels sortis de la fenêtre [now - window, now]
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_in_window(&self, now: Instant, window: Duration) -> u32 {
        self.calls
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < window)
            .count() as u32
    }

    fn arm(&mut self, now: Instant, throttle: Duration) -> Instant {
        let until = now + throttle;
        self.throttled = true;
        self.reset_at = Some(until);
        until
    }
}

/// Limiteur partagé
///
/// CONCEPT RUST : Clone sur un handle
/// - #[derive(Clone)] clone l'Arc, pas l'état
/// - Tous les clones voient et modifient le même compteur
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Arc<Mutex<State>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Prend le lock, même si un autre thread a paniqué en le tenant
    ///
    /// L'état reste cohérent : chaque mise à jour est faite d'un bloc
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Demande la permission de faire un appel maintenant
    pub fn try_acquire(&self, force: bool) -> Permit {
        self.try_acquire_at(Instant::now(), force)
    }

    /// Demande la permission de faire un appel à l'instant `now`
    ///
    /// Vérification et enregistrement se font sous le même lock
    pub fn try_acquire_at(&self, now: Instant, force: bool) -> Permit {
        let mut state = self.lock();

        // 1. Throttle : expiré -> on repart de zéro, sinon refus
        if state.throttled {
            match state.reset_at {
                Some(reset_at) if now < reset_at => {
                    if !force {
                        debug!(remaining_ms = (reset_at - now).as_millis() as u64, "Call denied (throttled)");
                        return Permit::Denied(DenyReason::Throttled { until: reset_at });
                    }
                }
                _ => {
                    debug!("Throttle expired, resetting counters");
                    state.reset();
                }
            }
        }

        // 2. Fenêtre glissante : on oublie les appels de plus de `window`
        state.prune(now, self.config.window);

        if !force {
            // 3. Cooldown entre deux appels
            if let Some(last) = state.last_call {
                if now.saturating_duration_since(last) < self.config.min_interval {
                    return Permit::Denied(DenyReason::Cooldown);
                }
            }

            // 4. Quota de la fenêtre atteint : on arme le throttle
            if state.calls.len() as u32 >= self.config.max_calls {
                let until = state.arm(now, self.config.throttle);
                warn!(calls = state.calls.len(), "Rate limit reached, throttling price refreshes");
                return Permit::Denied(DenyReason::Throttled { until });
            }
        }

        // 5. Appel autorisé : on l'enregistre
        state.last_call = Some(now);
        state.calls.push_back(now);

        if force && state.calls.len() as u32 >= self.config.max_calls && !state.throttled {
            state.arm(now, self.config.throttle);
            warn!(calls = state.calls.len(), "Forced refresh reached the limit, throttle armed");
        }

        Permit::Granted
    }

    /// Arme le throttle suite à une réponse "Throttled" du serveur
    pub fn arm_throttle(&self) {
        self.arm_throttle_at(Instant::now());
    }

    pub fn arm_throttle_at(&self, now: Instant) {
        let mut state = self.lock();
        state.arm(now, self.config.throttle);
        warn!("Server-side throttling detected, throttle armed");
    }

    pub fn status(&self) -> RateLimiterStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> RateLimiterStatus {
        let state = self.lock();
        let throttle_remaining = match (state.throttled, state.reset_at) {
            (true, Some(reset_at)) if now < reset_at => Some(reset_at - now),
            _ => None,
        };

        RateLimiterStatus {
            call_count: state.count_in_window(now, self.config.window),
            max_calls: self.config.max_calls,
            throttled: throttle_remaining.is_some(),
            throttle_remaining,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
