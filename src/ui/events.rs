// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier et les ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching : un helper par raccourci clavier
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (polling, expiration des avertissements)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - Si pas d'événement avant tick_rate, retourne Ok(Event::Tick)
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : Convertir KeyEvent en action
// ============================================================================
// CONCEPT RUST : Pattern matching avec if let + matches!
// - Destructure Event::Key et vérifie le KeyCode en une ligne
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    if let Event::Key(key) = event {
        Some(key.code)
    } else {
        None
    }
}

/// Vrai si l'événement est exactement ce caractère (sensible à la casse)
pub fn is_char_event(event: &Event, c: char) -> bool {
    key_code(event) == Some(KeyCode::Char(c))
}

/// 'q' : quitter (two-step)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up | KeyCode::Char('k')))
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down | KeyCode::Char('j')))
}

/// Tab : onglet suivant
pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

/// '1', '2', '3' : accès direct aux onglets
pub fn tab_index(event: &Event) -> Option<usize> {
    match key_code(event) {
        Some(KeyCode::Char(c @ '1'..='3')) => c.to_digit(10).map(|d| d as usize - 1),
        _ => None,
    }
}

/// '/' : recherche
pub fn is_search_event(event: &Event) -> bool {
    is_char_event(event, '/')
}

/// 'a' : ajouter à la watchlist
pub fn is_add_event(event: &Event) -> bool {
    is_char_event(event, 'a')
}

/// 'd' : supprimer de la watchlist (two-step)
pub fn is_delete_event(event: &Event) -> bool {
    is_char_event(event, 'd')
}

/// 'r' : rafraîchir les marchés maintenant (retry)
pub fn is_refresh_event(event: &Event) -> bool {
    is_char_event(event, 'r')
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match key_code(event) {
        Some(KeyCode::Char(c)) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_char_events_are_case_sensitive() {
        assert!(is_char_event(&key(KeyCode::Char('p')), 'p'));
        assert!(!is_char_event(&key(KeyCode::Char('P')), 'p'));
        assert!(is_add_event(&key(KeyCode::Char('a'))));
        assert!(!is_add_event(&key(KeyCode::Char('A'))));
    }

    #[test]
    fn test_tab_index() {
        assert_eq!(tab_index(&key(KeyCode::Char('1'))), Some(0));
        assert_eq!(tab_index(&key(KeyCode::Char('3'))), Some(2));
        assert_eq!(tab_index(&key(KeyCode::Char('4'))), None);
        assert_eq!(tab_index(&Event::Tick), None);
    }

    #[test]
    fn test_navigation_keys() {
        assert!(is_up_event(&key(KeyCode::Up)));
        assert!(is_up_event(&key(KeyCode::Char('k'))));
        assert!(is_down_event(&key(KeyCode::Char('j'))));
        assert!(!is_down_event(&key(KeyCode::Char('J'))));
    }
}
