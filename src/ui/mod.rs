// src/ui/mod.rs

use crate::app::App;
use ratatui::prelude::*;

mod layout;
mod widgets;

pub fn render(app: &mut App, frame: &mut Frame) {
    let layout = layout::create_layout(frame.area(), app.show_logs);

    widgets::input::render_input(frame, app, layout.input);
    widgets::devices::render_devices(frame, app, layout.devices);
    widgets::summary::render_summary(frame, app, layout.summary);
    if app.show_logs {
        widgets::log_view::render_log_view(frame, app, layout.log_panel);
    }
    widgets::footer::render_footer(frame, app, layout.footer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::core::commands::CommandDispatcher;
    use crate::core::http::build_client;
    use crate::core::models::DeviceRecord;
    use crate::core::scanner::probe::MoonrakerProbe;
    use ratatui::backend::TestBackend;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn renders_known_devices_and_activity() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        let mut record = DeviceRecord::new(Ipv4Addr::new(10, 0, 0, 7), "voron");
        record.custom_name = Some("Voron 2.4".into());
        config.hosts.upsert(record);

        let client = build_client().unwrap();
        let probe = Arc::new(MoonrakerProbe::new(client.clone(), &config.scanner));
        let dispatcher = CommandDispatcher::new(client, 7125, Duration::from_secs(1));
        let mut app = App::new(config, dir.path().join("config.json"), probe, dispatcher);
        app.add_subnet("not-a-subnet");

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen: String = terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Voron 2.4"));
        assert!(screen.contains("10.0.0.7"));
        assert!(screen.contains("offline"));
        assert!(screen.contains("not-a-subnet"));
    }

    #[test]
    fn empty_dashboard_shows_the_real_key_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default();
        let client = build_client().unwrap();
        let probe = Arc::new(MoonrakerProbe::new(client.clone(), &config.scanner));
        let dispatcher = CommandDispatcher::new(client, 7125, Duration::from_secs(1));
        let mut app = App::new(config, dir.path().join("config.json"), probe, dispatcher);

        let mut terminal = Terminal::new(TestBackend::new(220, 30)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen: String = terminal.backend().buffer().content().iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Press s to scan the network or a to add a host."));
        assert!(screen.contains("[s] scan"));
        assert!(screen.contains("[N] drop subnet"));
        assert!(screen.contains("[f] auto-refresh"));
        assert!(screen.contains("[q] quit"));
        assert!(!screen.contains("[S]"));
    }
}
