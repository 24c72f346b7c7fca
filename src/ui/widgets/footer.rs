// src/ui/widgets/footer.rs

use crate::app::{App, InputMode};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Shown in normal mode; each key matches its binding in `main.rs`.
const NORMAL_KEYS: [(&str, &str); 14] = [
    ("[s]", "scan"),
    ("[r]", "refresh"),
    ("[a]", "add host"),
    ("[n]", "add subnet"),
    ("[N]", "drop subnet"),
    ("[e]", "rename"),
    ("[d]", "delete"),
    ("[t]", "start"),
    ("[p]", "pause"),
    ("[c]", "cancel"),
    ("[x]", "e-stop"),
    ("[f]", "auto-refresh"),
    ("[l]", "logs"),
    ("[q]", "quit"),
];

fn key(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match app.input_mode {
        InputMode::Normal => Line::from(
            NORMAL_KEYS
                .iter()
                .flat_map(|&(binding, action)| [key(binding), Span::raw(format!(" {action}  "))])
                .collect::<Vec<_>>(),
        ),
        _ => Line::from(vec![
            Span::raw("Press "),
            key("Enter"),
            Span::raw(" to confirm, "),
            key("Esc"),
            Span::raw(" to cancel."),
        ]),
    };

    let footer = Paragraph::new(spans).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
