// src/ui/widgets/summary.rs

use crate::app::{App, SPINNER_CHARS};
use crate::core::models::DeviceState;
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

/// Renders the summary column: scan progress, device counts by state and the
/// configured subnets.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Scan status
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Counts
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Subnets
        ])
        .split(area);

    // --- Scan Status & Gauge ---
    match app.progress() {
        Some((trigger, percent)) => {
            let spinner = SPINNER_CHARS[app.spinner_frame % SPINNER_CHARS.len()];
            let status = Line::from(vec![
                Span::styled(format!("{spinner} "), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{trigger} running")),
            ]);
            frame.render_widget(Paragraph::new(status), summary_chunks[0]);
            let gauge = Gauge::default()
                .ratio((percent / 100.0).clamp(0.0, 1.0))
                .label(format!("{percent:.0}%"))
                .gauge_style(Style::default().fg(Color::Cyan));
            frame.render_widget(gauge, summary_chunks[1]);
        }
        None => {
            frame.render_widget(Paragraph::new("Idle".fg(Color::DarkGray)), summary_chunks[0]);
        }
    }

    // --- Device Counts ---
    let rows = app.rows();
    let count = |wanted: &[DeviceState]| rows.iter().filter(|r| wanted.contains(&r.state)).count();
    let online = rows.len() - count(&[DeviceState::Offline, DeviceState::Unreachable]);
    let counts = Text::from(vec![
        Line::from(vec![Span::raw("Devices: "), Span::raw(rows.len().to_string()).bold()]),
        Line::from(vec![
            Span::raw("Online:  "),
            Span::styled(online.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("Printing: "),
            Span::styled(count(&[DeviceState::Printing]).to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("Errors:  "),
            Span::styled(count(&[DeviceState::Error]).to_string(), Style::default().fg(Color::Red)),
        ]),
    ]);
    frame.render_widget(Paragraph::new(counts), summary_chunks[3]);

    // --- Subnets ---
    let subnets_block = Block::default().title("SUBNETS".bold());
    let subnet_lines: Vec<Line> = if app.config.subnets.is_empty() {
        vec![Line::from("Local /24 (auto)".fg(Color::DarkGray))]
    } else {
        app.config
            .subnets
            .iter()
            .map(|s| Line::from(vec![Span::raw("- "), Span::styled(s.clone(), Style::default().fg(Color::Cyan))]))
            .collect()
    };
    frame.render_widget(Paragraph::new(subnet_lines).block(subnets_block), summary_chunks[5]);
}
