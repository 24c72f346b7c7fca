// src/ui/widgets/input.rs
use crate::app::{App, InputMode};
use ratatui::{
    layout::Position,
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the input box widget.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_block = Block::default().borders(Borders::ALL).title(app.input_mode.prompt());
    let (text, style) = match app.input_mode {
        InputMode::Normal => ("Press a key from the footer.", Style::default().fg(Color::DarkGray)),
        _ => (app.input.as_str(), Style::default().fg(Color::Yellow)),
    };
    frame.render_widget(Paragraph::new(text).block(input_block).style(style), area);

    // Show the cursor only while the operator is typing.
    if app.input_mode != InputMode::Normal {
        frame.set_cursor_position(Position::new(
            area.x + app.input.chars().count() as u16 + 1,
            area.y + 1,
        ));
    }
}
