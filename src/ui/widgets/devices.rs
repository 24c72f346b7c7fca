// src/ui/widgets/devices.rs

use crate::app::{App, DeviceRow};
use crate::core::models::DeviceState;
use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

pub fn state_color(state: &DeviceState) -> Color {
    match state {
        DeviceState::Printing => Color::Green,
        DeviceState::Paused => Color::Yellow,
        DeviceState::Error => Color::Red,
        DeviceState::Complete => Color::Cyan,
        DeviceState::Ready | DeviceState::Standby => Color::White,
        DeviceState::Cancelled => Color::Magenta,
        DeviceState::Offline | DeviceState::Unreachable => Color::DarkGray,
        DeviceState::Other(_) => Color::Gray,
    }
}

fn to_row(row: &DeviceRow) -> Row<'static> {
    let last_seen = row
        .last_seen
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let name = if row.known {
        Cell::from(row.name.clone())
    } else {
        Cell::from(format!("{} (new)", row.name)).style(Style::default().add_modifier(Modifier::ITALIC))
    };
    Row::new(vec![
        name,
        Cell::from(row.address.to_string()),
        Cell::from(row.state.to_string()).style(Style::default().fg(state_color(&row.state))),
        Cell::from(last_seen).style(Style::default().fg(Color::DarkGray)),
    ])
}

/// Renders the device table, one row per known or newly found device.
pub fn render_devices(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = app.rows();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Devices ({}) (Navigate with ↑ ↓)", rows.len()));

    if rows.is_empty() {
        let hint = Paragraph::new("No devices yet. Press s to scan the network or a to add a host.")
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let header = Row::new(vec!["Name", "Address", "State", "Last seen"])
        .style(Style::default().bold().fg(Color::Yellow));
    let table = Table::new(
        rows.iter().map(to_row),
        [
            Constraint::Percentage(40),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(table, area, &mut app.table_state);
}
