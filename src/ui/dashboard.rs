// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
// CONCEPTS RUST :
// 1. Lifetimes : les CoinView empruntent l'état de App le temps d'une frame
// 2. Builder pattern : construction fluide des widgets
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Table + TableState : tableau avec ligne sélectionnée qui suit le scroll
// 3. Layout : découpage de l'espace en zones
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, Screen};
use crate::filter::{ChangeFilter, MarketCapBucket, SortKey};
use crate::models::{CoinRecord, Timeframe, WatchlistEntry};
use crate::ui::chart;
use crate::ui::format::{format_change, format_compact, format_price};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Le compilateur garantit l'exhaustivité (tous les écrans gérés)
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    match app.list_screen() {
        _ if app.current_screen == Screen::CoinDetail => chart::render_detail(frame, app, chunks[1]),
        Screen::Watchlist => render_watchlist(frame, app, chunks[1]),
        Screen::Leaderboard => render_leaderboard(frame, app, chunks[1]),
        _ => render_markets(frame, app, chunks[1]),
    }

    if app.is_in_input_mode() {
        render_input_footer(frame, app, chunks[2]);
    } else {
        render_footer(frame, app, chunks[2]);
    }
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header : onglets + stats globales
            Constraint::Min(0),    // Content
            Constraint::Length(4), // Footer : statut + raccourcis
        ])
        .split(area)
        .to_vec()
}

fn key_style(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn change_style(change: Option<f64>) -> Style {
    match change {
        Some(c) if c >= 0.0 => Style::default().fg(Color::Green),
        Some(_) => Style::default().fg(Color::Red),
        None => Style::default().fg(Color::Gray),
    }
}

// ============================================================================
// Header : onglets + stats globales
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" CoinDeck ")
        .title_alignment(Alignment::Center);

    let mut tabs = Vec::new();
    for (index, (screen, label)) in [
        (Screen::Markets, "Markets"),
        (Screen::Watchlist, "Watchlist"),
        (Screen::Leaderboard, "Leaderboard"),
    ]
    .into_iter()
    .enumerate()
    {
        let style = if app.list_screen() == screen {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        tabs.push(Span::styled(format!(" {} {} ", index + 1, label), style));
        tabs.push(Span::raw(" "));
    }

    if app.is_loading {
        let message = app.loading_message.as_deref().unwrap_or("Loading...");
        tabs.push(Span::styled(format!("  ⟳ {}", message), Style::default().fg(Color::Yellow)));
    } else if let Some(updated) = app.last_updated {
        tabs.push(Span::styled(
            format!("  Updated {}", updated.format("%H:%M:%S UTC")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let stats = &app.global;
    let stats_line = if stats.is_available() {
        let change = Some(stats.market_cap_change_percentage_24h);
        Line::from(vec![
            Span::styled("Coins: ", Style::default().fg(Color::Gray)),
            Span::raw(stats.active_cryptocurrencies.to_string()),
            Span::styled("  Market cap: ", Style::default().fg(Color::Gray)),
            Span::raw(format_compact(Some(stats.total_market_cap))),
            Span::raw(" "),
            Span::styled(format_change(change), change_style(change)),
            Span::styled("  Volume: ", Style::default().fg(Color::Gray)),
            Span::raw(format_compact(Some(stats.total_volume))),
            Span::styled("  BTC: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{:.1}%", stats.btc_dominance)),
            Span::styled("  ETH: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{:.1}%", stats.eth_dominance)),
        ])
    } else {
        Line::from(Span::styled("Global stats unavailable", Style::default().fg(Color::DarkGray)))
    };

    let paragraph = Paragraph::new(vec![Line::from(tabs), stats_line]).block(block);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Markets : tableau filtré et trié
// ============================================================================

/// Titre du tableau avec le résumé des filtres actifs
fn markets_title(app: &App, shown: usize) -> String {
    let filter = &app.filter;
    let mut parts = vec![format!(" Markets ({}/{})", shown, app.coins.len())];

    if !filter.search.is_empty() {
        parts.push(format!("search \"{}\"", filter.search));
    }
    if filter.min_price.is_some() || filter.max_price.is_some() {
        parts.push(format!(
            "price {} - {}",
            filter.min_price.map(|v| format_price(Some(v))).unwrap_or_else(|| "$0".to_string()),
            filter.max_price.map(|v| format_price(Some(v))).unwrap_or_else(|| "∞".to_string()),
        ));
    }
    if filter.market_cap != MarketCapBucket::All {
        parts.push(filter.market_cap.label().to_string());
    }
    if filter.change != ChangeFilter::All {
        parts.push(filter.change.label().to_string());
    }
    if filter.favorites_only {
        parts.push("★ only".to_string());
    }

    format!("{} ", parts.join(" · "))
}

/// En-tête de colonne avec la flèche de tri sur la colonne active
fn sort_header(app: &App, key: SortKey) -> Cell<'static> {
    let sort = app.filter.sort;
    if sort.key == key {
        Cell::from(format!("{} {}", key.label(), sort.direction.arrow()))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else {
        Cell::from(key.label())
    }
}

fn render_markets(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.market_view();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(markets_title(app, view.len()));

    if view.is_empty() {
        let message = if app.coins.is_empty() {
            "No market data yet"
        } else {
            "No coins match the current filters ([x] to reset)"
        };
        render_empty(frame, area, block, message);
        return;
    }

    let header = Row::new(vec![
        Cell::from("★"),
        sort_header(app, SortKey::MarketCapRank),
        sort_header(app, SortKey::Name),
        sort_header(app, SortKey::CurrentPrice),
        sort_header(app, SortKey::PriceChange24h),
        sort_header(app, SortKey::MarketCap),
        sort_header(app, SortKey::TotalVolume),
    ])
    .style(Style::default().fg(Color::Gray));

    let rows: Vec<Row> = view
        .iter()
        .map(|v| {
            let coin = v.coin;
            let star = if v.favorite { "★" } else { " " };
            let in_watchlist = if app.watchlist.contains(&coin.id) { " •" } else { "" };
            let price = format_price(v.display_price());
            let price_cell = if v.live.is_some() {
                Cell::from(price).style(Style::default().fg(Color::Magenta))
            } else {
                Cell::from(price)
            };

            Row::new(vec![
                Cell::from(star).style(Style::default().fg(Color::Yellow)),
                Cell::from(coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())),
                Cell::from(format!("{} ({}){}", coin.name, coin.display_symbol(), in_watchlist)),
                price_cell,
                Cell::from(format_change(coin.price_change_percentage_24h))
                    .style(change_style(coin.price_change_percentage_24h)),
                Cell::from(format_compact(coin.market_cap)),
                Cell::from(format_compact(coin.total_volume)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(11),
        Constraint::Length(12),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

    // CONCEPT RATATUI : TableState
    // - Porte la sélection et fait défiler le tableau pour la garder visible
    let mut state = TableState::default().with_selected(Some(app.selected_index));
    frame.render_stateful_widget(table, area, &mut state);
}

// ============================================================================
// Watchlist
// ============================================================================

fn watchlist_row(entry: &WatchlistEntry, coin: Option<&CoinRecord>, app: &App) -> Row<'static> {
    // Le prix live prime sur le cache de la watchlist
    let price = coin
        .map(|c| app.overlay.view(c).display_price())
        .unwrap_or(entry.current_price);
    let change = entry.price_change_percentage_24h;

    Row::new(vec![
        Cell::from(entry.symbol.to_uppercase()),
        Cell::from(entry.name.clone()),
        Cell::from(format_price(price)),
        Cell::from(format_change(change)).style(change_style(change)),
        Cell::from(format_compact(entry.market_cap)),
    ])
}

fn render_watchlist(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Watchlist ({}) ", app.watchlist.len()));

    if app.watchlist.is_empty() {
        render_empty(frame, area, block, "Your watchlist is empty. [a] to add a coin");
        return;
    }

    let header = Row::new(vec!["Symbol", "Name", "Price", "24h %", "Market Cap"])
        .style(Style::default().fg(Color::Gray));

    let rows: Vec<Row> = app
        .watchlist
        .entries()
        .iter()
        .map(|entry| {
            let coin = app.coins.iter().find(|c| c.id == entry.id);
            watchlist_row(entry, coin, app)
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(11),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

    let mut state = TableState::default().with_selected(Some(app.selected_index));
    frame.render_stateful_widget(table, area, &mut state);
}

// ============================================================================
// Leaderboard : top hausses / top baisses
// ============================================================================

fn leaderboard_items(coins: &[&CoinRecord], timeframe: Timeframe) -> Vec<ListItem<'static>> {
    coins
        .iter()
        .enumerate()
        .map(|(index, coin)| {
            let change = coin.change_for(timeframe);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}. ", index + 1), Style::default().fg(Color::Gray)),
                Span::raw(format!("{:<18}", coin.name)),
                Span::raw(format!("{:>14}  ", format_price(coin.current_price))),
                Span::styled(format_change(change), change_style(change)),
            ]))
        })
        .collect()
}

/// Deux colonnes, la sélection parcourt les hausses puis les baisses
///
/// CONCEPT RATATUI : ListState
/// - Une seule colonne porte la ligne sélectionnée, l'autre a un état vide
fn render_leaderboard(frame: &mut Frame, app: &App, area: Rect) {
    let board = app.leaderboard();
    let timeframe = app.leaderboard_timeframe;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area)
        .to_vec();

    let (gainer_selected, loser_selected) = if app.selected_index < board.gainers.len() {
        (Some(app.selected_index), None)
    } else {
        (None, Some(app.selected_index - board.gainers.len()))
    };

    for (coins, arrow, name, color, column, selected) in [
        (&board.gainers, "▲", "Top Gainers", Color::Green, columns[0], gainer_selected),
        (&board.losers, "▼", "Top Losers", Color::Red, columns[1], loser_selected),
    ] {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(format!(" {} {} ({}) ", arrow, name, timeframe.label()));

        if coins.is_empty() {
            render_empty(frame, column, block, "Nothing to show");
        } else {
            let list = List::new(leaderboard_items(coins, timeframe))
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
            let mut state = ListState::default().with_selected(selected);
            frame.render_stateful_widget(list, column, &mut state);
        }
    }
}

/// Message centré dans un bloc vide
fn render_empty(frame: &mut Frame, area: Rect, block: Block, message: &str) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Gray))),
    ];
    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : statut + raccourcis
// ============================================================================

/// Ligne de statut : confirmation, avertissement, erreur ou rien
fn status_line(app: &App) -> Line<'static> {
    let warn_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let blink = Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::BOLD)
        .add_modifier(Modifier::SLOW_BLINK);

    if app.is_awaiting_delete_confirmation() {
        let name = app
            .watchlist
            .get(app.selected_index)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "?".to_string());
        Line::from(vec![
            Span::styled("⚠  Press ", warn_style),
            Span::styled("[d]", blink),
            Span::styled(format!(" again to remove {} or any other key to cancel ⚠", name), warn_style),
        ])
    } else if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled("⚠  Press ", warn_style),
            Span::styled("[q]", blink),
            Span::styled(" again to quit, or any other key to cancel ⚠", warn_style),
        ])
    } else if let Some(warning) = app.active_warning() {
        Line::from(Span::styled(warning.to_string(), Style::default().fg(Color::Yellow)))
    } else if let Some(error) = &app.error_message {
        Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
    } else {
        Line::from("")
    }
}

fn shortcuts_line(app: &App) -> Line<'static> {
    let mut spans = vec![
        Span::styled("[q]", key_style(Color::Yellow)),
        Span::raw(" Quit  "),
        Span::styled("[Tab/1-3]", key_style(Color::Yellow)),
        Span::raw(" Tabs  "),
        Span::styled("[Enter]", key_style(Color::Yellow)),
        Span::raw(" Detail  "),
        Span::styled("[r]", key_style(Color::Yellow)),
        Span::raw(" Refresh  "),
    ];

    match app.list_screen() {
        Screen::Watchlist => spans.extend([
            Span::styled("[a]", key_style(Color::Green)),
            Span::raw(" Add  "),
            Span::styled("[d]", key_style(Color::Red)),
            Span::raw(" Delete  "),
            Span::styled("[p/P]", key_style(Color::Yellow)),
            Span::raw(" Price"),
        ]),
        Screen::Leaderboard => spans.extend([
            Span::styled("[/]", key_style(Color::Yellow)),
            Span::raw(" Search  "),
            Span::styled("[t]", key_style(Color::Yellow)),
            Span::raw(" Timeframe  "),
            Span::styled("[f]", key_style(Color::Yellow)),
            Span::raw(" Fav"),
        ]),
        _ => spans.extend([
            Span::styled("[/]", key_style(Color::Yellow)),
            Span::raw(" Search  "),
            Span::styled("[s/S]", key_style(Color::Yellow)),
            Span::raw(" Sort  "),
            Span::styled("[m/M]", key_style(Color::Yellow)),
            Span::raw(" Price  "),
            Span::styled("[c]", key_style(Color::Yellow)),
            Span::raw(" Cap  "),
            Span::styled("[g]", key_style(Color::Yellow)),
            Span::raw(" 24h  "),
            Span::styled("[f/F]", key_style(Color::Yellow)),
            Span::raw(" Fav  "),
            Span::styled("[x]", key_style(Color::Yellow)),
            Span::raw(" Reset  "),
            Span::styled("[a]", key_style(Color::Green)),
            Span::raw(" Watch"),
        ]),
    }

    Line::from(spans)
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(vec![status_line(app), shortcuts_line(app)])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Footer en mode input avec la ligne de saisie
fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_line = Line::from(vec![
        Span::styled(app.input_prompt(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::White)),
        Span::styled("█", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);

    let help_line = Line::from(vec![
        Span::styled("[Enter]", key_style(Color::Green)),
        Span::raw(" Confirm  "),
        Span::styled("[ESC]", key_style(Color::Red)),
        Span::raw(" Cancel"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line])
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::persistence::{KeyValueStore, MemoryStore};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app() -> App {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut app = App::new(store, &Config::default());
        app.apply_markets(vec![
            CoinRecord::new("bitcoin", "Bitcoin", "btc").with_rank(1).with_price(63000.0).with_change(2.0),
            CoinRecord::new("ethereum", "Ethereum", "eth").with_rank(2).with_price(3400.0).with_change(-1.0),
        ]);
        app
    }

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_markets_title_lists_filters() {
        let mut app = app();
        app.filter.search = "bit".to_string();
        app.filter.favorites_only = true;
        let title = markets_title(&app, 0);
        assert!(title.contains("(0/2)"));
        assert!(title.contains("search \"bit\""));
        assert!(title.contains("★ only"));
    }

    #[test]
    fn test_render_each_screen() {
        let mut app = app();
        assert!(rendered(&app).contains("Bitcoin"));

        app.switch_to(Screen::Watchlist);
        assert!(rendered(&app).contains("watchlist is empty"));

        app.switch_to(Screen::Leaderboard);
        let screen = rendered(&app);
        assert!(screen.contains("Top Gainers (24h)"));
        assert!(screen.contains("Ethereum"));

        app.cycle_timeframe();
        let screen = rendered(&app);
        assert!(screen.contains("Top Losers (7d)"));
        assert!(screen.contains("Nothing to show"));

        app.switch_to(Screen::Markets);
        app.show_detail();
        assert!(rendered(&app).contains("No 7-day history"));
    }

    #[test]
    fn test_markets_title_shows_search_verbatim() {
        let mut app = app();
        app.filter.search = " bit".to_string();
        assert!(markets_title(&app, 0).contains("search \" bit\""));
    }

    #[test]
    fn test_quit_confirmation_in_footer() {
        let mut app = app();
        app.request_quit();
        assert!(rendered(&app).contains("again to quit"));
    }
}
