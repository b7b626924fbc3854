// ============================================================================
// Chart - Détail d'une crypto
// ============================================================================
// Affiche les chiffres clés et l'historique 7 jours (sparkline) de la crypto
// sélectionnée
//
// CONCEPTS RUST :
// 1. Option handling : gérer l'absence de données
// 2. Iterator chaining : transformer les prix en points (x, y)
//
// CONCEPTS RATATUI :
// 1. Chart widget : graphique ligne
// 2. Dataset : série de données à afficher
// 3. Axis : configuration des axes X et Y
// ============================================================================

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::{CoinRecord, CoinView};
use crate::rate_limiter::RateLimiterStatus;
use crate::ui::format::{format_change, format_compact, format_price, format_supply};

/// La sparkline CoinGecko a un point par heure
const HOURS_PER_DAY: f64 = 24.0;

/// Dessine l'écran de détail de la crypto sélectionnée
pub fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let coin = match app.selected_coin() {
        Some(coin) => coin,
        None => {
            render_no_data(frame, area, "No coin selected");
            return;
        }
    };
    let view = app.overlay.view(coin);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area)
        .to_vec();

    render_detail_header(frame, &view, app.limiter_status, chunks[0]);
    render_sparkline(frame, coin, chunks[1]);
}

// ============================================================================
// Header : chiffres clés
// ============================================================================

fn render_detail_header(frame: &mut Frame, view: &CoinView, limiter: Option<RateLimiterStatus>, area: Rect) {
    let coin = view.coin;
    let title = match coin.market_cap_rank {
        Some(rank) => format!(" #{} {} ({}) ", rank, coin.name, coin.display_symbol()),
        None => format!(" {} ({}) ", coin.name, coin.display_symbol()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let color = change_color(coin.price_change_percentage_24h);
    let label = Style::default().fg(Color::Gray);

    let mut price_line = vec![
        Span::styled("Price: ", label),
        Span::styled(
            format_price(view.display_price()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format_change(coin.price_change_percentage_24h), Style::default().fg(color)),
    ];

    // Prix live : on montre l'écart avec le listing et son âge
    if let Some(live) = view.live {
        let delta = view.live_delta().unwrap_or(0.0);
        price_line.push(Span::raw("  "));
        price_line.push(Span::styled(
            format!("live {:+.2} ({})", delta, live.age_label(Utc::now())),
            Style::default().fg(Color::Magenta),
        ));
    }

    if view.favorite {
        price_line.push(Span::styled("  ★", Style::default().fg(Color::Yellow)));
    }

    if let Some(status) = limiter {
        price_line.push(Span::raw("  "));
        price_line.push(limiter_span(status));
    }

    let text = vec![
        Line::from(price_line),
        Line::from(vec![
            Span::styled("Market cap: ", label),
            Span::raw(format_compact(coin.market_cap)),
            Span::raw("   "),
            Span::styled("Volume 24h: ", label),
            Span::raw(format_compact(coin.total_volume)),
        ]),
        Line::from(vec![
            Span::styled("24h range: ", label),
            Span::raw(format!("{} - {}", format_price(coin.low_24h), format_price(coin.high_24h))),
            Span::raw("   "),
            Span::styled("Supply: ", label),
            Span::raw(format_supply(coin.circulating_supply)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("[ESC]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" Back  "),
            Span::styled("[p]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" Refresh price  "),
            Span::styled("[P]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" Force refresh  "),
            Span::styled("[f]", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" Favorite"),
        ]),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Graphique 7 jours
// ============================================================================

/// Dessine la sparkline en graphique ligne
///
/// CONCEPT RUST : fold pour min/max en un seul passage
fn render_sparkline(frame: &mut Frame, coin: &CoinRecord, area: Rect) {
    let points: Vec<(f64, f64)> = coin
        .sparkline_prices()
        .iter()
        .enumerate()
        .map(|(i, price)| (i as f64, *price))
        .collect();

    if points.len() < 2 {
        render_no_data(frame, area, "No 7-day history for this coin");
        return;
    }

    let (min_price, max_price) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), &(_x, y)| (min.min(y), max.max(y)));

    // Marge de 5% pour que le graphique respire
    let margin = (max_price - min_price) * 0.05;
    let y_min = (min_price - margin).max(0.0);
    let y_max = max_price + margin;
    let x_max = (points.len() - 1) as f64;

    let first = points[0].1;
    let last = points[points.len() - 1].1;
    let color = if last >= first { Color::Green } else { Color::Red };

    let symbol = coin.display_symbol();
    let datasets = vec![Dataset::default()
        .name(symbol.as_str())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points)];

    let days = (x_max / HOURS_PER_DAY).round();
    let x_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, x_max])
        .labels(vec![
            Span::raw(format!("-{}d", days)),
            Span::raw(format!("-{}d", (days / 2.0).round())),
            Span::raw("now"),
        ]);

    let y_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([y_min, y_max])
        .labels(vec![
            Span::raw(format_price(Some(y_min))),
            Span::raw(format_price(Some((y_min + y_max) / 2.0))),
            Span::raw(format_price(Some(y_max))),
        ]);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} - 7 days ", symbol)),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

/// Appels de prix consommés dans la fenêtre, ou temps de throttle restant
fn limiter_span(status: RateLimiterStatus) -> Span<'static> {
    match status.throttle_remaining {
        Some(remaining) => Span::styled(
            format!("throttled {}s", remaining.as_secs()),
            Style::default().fg(Color::Red),
        ),
        None => Span::styled(
            format!("API {}/{}", status.call_count, status.max_calls),
            Style::default().fg(Color::DarkGray),
        ),
    }
}

fn change_color(change: Option<f64>) -> Color {
    match change {
        Some(c) if c >= 0.0 => Color::Green,
        Some(_) => Color::Red,
        None => Color::Gray,
    }
}

/// Affiche un message quand il n'y a pas de données à afficher
fn render_no_data(frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" ⚠ No data ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled("[ESC] Back", Style::default().fg(Color::Gray))),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
