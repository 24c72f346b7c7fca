// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Defines the areas of the application's user interface.
pub struct AppLayout {
    pub input: Rect,
    pub devices: Rect,
    pub summary: Rect,
    pub log_panel: Rect,
    pub footer: Rect,
}

/// Splits the frame into the input line, the device table with its summary
/// column, the activity log (when visible) and the footer.
pub fn create_layout(frame_size: Rect, show_logs: bool) -> AppLayout {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(if show_logs { 10 } else { 0 }),
            Constraint::Length(1),
        ])
        .split(frame_size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(main_chunks[1]);

    AppLayout {
        input: main_chunks[0],
        devices: content_chunks[0],
        summary: content_chunks[1],
        log_panel: if show_logs { main_chunks[2] } else { Rect::default() },
        footer: main_chunks[3],
    }
}
