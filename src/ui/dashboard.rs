//! The single dashboard view.
//!
//! Layout, top to bottom: header bar, computed values, tracked variables
//! with sparklines, status bar.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::{format_value, sparkline};
use crate::app::App;
use crate::duration::format_duration;

/// Minimum terminal size for a usable display.
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 12;

/// Width of the sparkline column in characters.
const TREND_WIDTH: usize = 30;

/// Draw the whole dashboard.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        let centered = Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5.min(area.height));
        frame.render_widget(paragraph, centered);
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(computed_height(app.engine.computed.len(), area.height)),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(frame, app, chunks[0]);
    render_computed(frame, app, chunks[1]);
    render_tracked(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);
}

/// Rows for the computed table: its contents plus borders and header, up to
/// half the screen.
fn computed_height(count: usize, screen_height: u16) -> u16 {
    u16::try_from(count)
        .unwrap_or(u16::MAX)
        .saturating_add(3)
        .min(screen_height / 2)
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let computed = app.engine.computed.len();
    let failed = computed - app.values.len().min(computed);

    let mut spans = vec![
        Span::styled(" SRVWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            app.engine.registry.len().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" monitors │ "),
        Span::styled(computed.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" computed"),
    ];
    if failed > 0 {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(format!("{} unavailable", failed), app.theme.missing_style()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn block<'a>(app: &App, title: String) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

fn render_computed(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Value"),
        Cell::from("Expression"),
    ])
    .style(app.theme.header);

    let rows: Vec<Row> = app
        .engine
        .computed
        .iter()
        .map(|cv| {
            let value = match app.values.get(&cv.name) {
                Some(v) => Cell::from(format_value(*v)),
                None => Cell::from("-").style(app.theme.missing_style()),
            };
            Row::new(vec![
                Cell::from(cv.name.clone()),
                value,
                Cell::from(cv.expression.to_string())
                    .style(Style::default().add_modifier(Modifier::DIM)),
            ])
        })
        .collect();

    let widths = [Constraint::Fill(1), Constraint::Length(12), Constraint::Fill(3)];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, format!(" Computed ({}) ", app.engine.computed.len())));

    frame.render_widget(table, area);
}

fn render_tracked(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Variable"),
        Cell::from("Latest"),
        Cell::from("Trend"),
        Cell::from("History"),
        Cell::from("Every"),
    ])
    .style(app.theme.header);

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|row| {
            let latest = match row.latest() {
                Some(v) => Cell::from(format_value(v)),
                None => Cell::from("-").style(app.theme.missing_style()),
            };
            Row::new(vec![
                Cell::from(format!("{}.{}", row.monitor, row.variable)),
                latest,
                Cell::from(sparkline::render(&row.samples, TREND_WIDTH))
                    .style(Style::default().fg(app.theme.trend)),
                Cell::from(format!("{}/{}", row.samples.len(), row.capacity)),
                Cell::from(format_duration(row.interval)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Length(10),
        Constraint::Length(TREND_WIDTH as u16),
        Constraint::Length(9),
        Constraint::Length(7),
    ];

    let position = if app.rows.is_empty() {
        String::new()
    } else {
        format!(" [{}/{}]", app.selected + 1, app.rows.len())
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(block(app, format!(" Tracked{} ", position)))
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !app.rows.is_empty() {
        state.select(Some(app.selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = "↑↓:select +/-:interval r:refresh q:quit";
    let status = match app.last_refresh {
        Some(at) => format!(
            " Updated {:.1}s ago | {}",
            at.elapsed().as_secs_f64(),
            controls
        ),
        None => format!(" Loading... | {}", controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}
