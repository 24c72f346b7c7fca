// src/ui/widgets/log_view.rs

use crate::app::{ActivityLevel, App};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
};

/// Renders the activity log, newest entries at the bottom.
///
/// Long lines can be scrolled horizontally; timestamps are dimmed so the
/// messages stand out.
pub fn render_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().title("Activity (scroll with ← →)").borders(Borders::ALL);
    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    // Leave the last row for the scrollbar.
    let visible = inner_area.height.saturating_sub(1) as usize;
    let skip = app.activity.len().saturating_sub(visible);

    let max_width = app.activity.iter().map(|e| e.text.chars().count() + 9).max().unwrap_or(0);
    app.log_horizontal_scroll_state = app.log_horizontal_scroll_state.content_length(max_width);

    let log_lines: Vec<Line> = app
        .activity
        .iter()
        .skip(skip)
        .map(|entry| {
            let style = match entry.level {
                ActivityLevel::Info => Style::default(),
                ActivityLevel::Notice => Style::default().fg(Color::Cyan).bold(),
                ActivityLevel::Error => Style::default().fg(Color::Red),
            };
            Line::from(vec![
                Span::styled(entry.at.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::styled(entry.text.clone(), style),
            ])
        })
        .collect();

    let log_paragraph = Paragraph::new(log_lines).scroll((0, app.log_horizontal_scroll as u16));
    frame.render_widget(log_paragraph, inner_area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom).thumb_symbol("■");
    let scrollbar_area = Rect {
        x: inner_area.x,
        y: inner_area.y + inner_area.height.saturating_sub(1),
        width: inner_area.width,
        height: 1,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut app.log_horizontal_scroll_state);
}
