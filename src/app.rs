// src/app.rs

use chrono::{DateTime, Local, Utc};
use ratatui::widgets::{ScrollbarState, TableState};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::core::commands::CommandDispatcher;
use crate::core::models::{
    CommandOutcome, DeviceState, Discovery, KnownDevices, PrinterCommand, ScanEvent, ScanTrigger, ScanUpdate,
};
use crate::core::notifications::StateWatch;
use crate::core::reconcile::{reconcile, ScanObservations};
use crate::core::scanner::address_space::validate_subnet;
use crate::core::scanner::probe::NetworkProbe;
use crate::core::scanner::{spawn_scan, ScanLimits, ScanPhase, ScanRequest};

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const ACTIVITY_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    AddSubnet,
    AddHost,
    Rename(Ipv4Addr),
}

impl InputMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            InputMode::Normal => "Command",
            InputMode::AddSubnet => "Add subnet (CIDR)",
            InputMode::AddHost => "Add host (IPv4)",
            InputMode::Rename(_) => "Rename device (empty clears)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Notice,
    Error,
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub at: DateTime<Local>,
    pub level: ActivityLevel,
    pub text: String,
}

/// Outcome of a control command, reported back from its background task.
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub address: Ipv4Addr,
    pub command: PrinterCommand,
    pub result: Result<CommandOutcome, String>,
}

/// One line of the device table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub address: Ipv4Addr,
    pub name: String,
    pub state: DeviceState,
    pub last_seen: Option<DateTime<Utc>>,
    pub known: bool,
}

struct RunningScan {
    handle: JoinHandle<ScanPhase>,
    observations: ScanObservations,
    progress: f64,
}

pub struct App {
    pub should_quit: bool,
    pub config: AppConfig,
    config_path: PathBuf,
    pub input: String,
    pub input_mode: InputMode,
    pub table_state: TableState,
    pub activity: VecDeque<ActivityEntry>,
    pub show_logs: bool,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub spinner_frame: usize,
    probe: Arc<dyn NetworkProbe>,
    dispatcher: CommandDispatcher,
    limits: ScanLimits,
    running: HashMap<ScanTrigger, RunningScan>,
    /// States seen during scans that have not been reconciled yet.
    live: HashMap<Ipv4Addr, Discovery>,
    watch: StateWatch,
    last_refresh: Instant,
    scan_tx: UnboundedSender<ScanUpdate>,
    scan_rx: UnboundedReceiver<ScanUpdate>,
    command_tx: UnboundedSender<CommandReport>,
    command_rx: UnboundedReceiver<CommandReport>,
}

impl App {
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        probe: Arc<dyn NetworkProbe>,
        dispatcher: CommandDispatcher,
    ) -> Self {
        let (scan_tx, scan_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let watch = StateWatch::new(&config.notification_states);
        let limits = config.scanner.limits();
        Self {
            should_quit: false,
            config,
            config_path,
            input: String::new(),
            input_mode: InputMode::Normal,
            table_state: TableState::default(),
            activity: VecDeque::with_capacity(ACTIVITY_CAPACITY),
            show_logs: true,
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            spinner_frame: 0,
            probe,
            dispatcher,
            limits,
            running: HashMap::new(),
            live: HashMap::new(),
            watch,
            last_refresh: Instant::now(),
            scan_tx,
            scan_rx,
            command_tx,
            command_rx,
        }
    }

    // --- Activity log ---

    pub fn log(&mut self, level: ActivityLevel, text: impl Into<String>) {
        if self.activity.len() == ACTIVITY_CAPACITY {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityEntry {
            at: Local::now(),
            level,
            text: text.into(),
        });
    }

    // --- Scans ---

    #[cfg(test)]
    pub fn is_scanning(&self) -> bool {
        !self.running.is_empty()
    }

    /// Progress of the most relevant running scan: a manual scan wins over refreshes.
    pub fn progress(&self) -> Option<(ScanTrigger, f64)> {
        [ScanTrigger::ManualScan, ScanTrigger::ManualRefresh, ScanTrigger::AutoRefresh]
            .into_iter()
            .find_map(|t| self.running.get(&t).map(|run| (t, run.progress)))
    }

    /// Starts a scan for `trigger` unless one is already outstanding.
    pub fn start_scan(&mut self, trigger: ScanTrigger) -> bool {
        if self.running.get(&trigger).is_some_and(|run| !run.handle.is_finished()) {
            debug!(%trigger, "Scan already running, trigger skipped.");
            if trigger != ScanTrigger::AutoRefresh {
                self.log(ActivityLevel::Info, format!("A {trigger} is already running."));
            }
            return false;
        }

        let subnets = match trigger {
            ScanTrigger::ManualScan => self.config.effective_subnets(),
            ScanTrigger::ManualRefresh | ScanTrigger::AutoRefresh => Vec::new(),
        };
        let known_hosts = self.config.hosts.addresses().into_iter().collect();
        if subnets.is_empty() && self.config.hosts.is_empty() {
            debug!(%trigger, "Nothing to refresh.");
            return false;
        }

        let request = ScanRequest {
            trigger,
            subnets,
            known_hosts,
        };
        info!(%trigger, subnets = ?request.subnets, known = request.known_hosts.len(), "Scan requested.");
        if trigger != ScanTrigger::AutoRefresh {
            self.log(ActivityLevel::Info, format!("Started {trigger}."));
        }
        let handle = spawn_scan(Arc::clone(&self.probe), self.limits, request, self.scan_tx.clone());
        self.running.insert(
            trigger,
            RunningScan {
                handle,
                observations: ScanObservations::new(),
                progress: 0.0,
            },
        );
        true
    }

    /// Drains every pending scan and command event. Call once per UI tick.
    pub fn pump(&mut self) {
        // Collected before draining so a scan that ends mid-drain still has its
        // last events applied before it is retired.
        let ended: Vec<ScanTrigger> = self
            .running
            .iter()
            .filter(|(_, run)| run.handle.is_finished())
            .map(|(t, _)| *t)
            .collect();

        while let Ok(update) = self.scan_rx.try_recv() {
            self.apply_scan_update(update);
        }
        while let Ok(report) = self.command_rx.try_recv() {
            self.apply_command_report(report);
        }

        for trigger in ended {
            if self.running.remove(&trigger).is_some() {
                warn!(%trigger, "Scan ended without results.");
                self.log(ActivityLevel::Error, format!("{trigger} aborted."));
            }
        }
    }

    pub fn apply_scan_update(&mut self, update: ScanUpdate) {
        let ScanUpdate { trigger, event } = update;
        match event {
            ScanEvent::HostFound(discovery) => {
                if let Some(run) = self.running.get_mut(&trigger) {
                    run.observations.record(&discovery);
                }
                if self.watch.observe(discovery.address, &discovery.state) {
                    let name = self
                        .config
                        .hosts
                        .get(&discovery.address)
                        .map(|r| r.display_name().to_string())
                        .unwrap_or_else(|| discovery.hostname.clone());
                    info!(address = %discovery.address, state = %discovery.state, "State notification.");
                    self.log(
                        ActivityLevel::Notice,
                        format!("{name} ({}) is now {}", discovery.address, discovery.state),
                    );
                }
                if trigger == ScanTrigger::ManualScan && !self.config.hosts.contains(&discovery.address) {
                    self.log(
                        ActivityLevel::Info,
                        format!("Found {} at {}", discovery.hostname, discovery.address),
                    );
                }
                self.live.insert(discovery.address, discovery);
            }
            ScanEvent::Progress(percent) => {
                if let Some(run) = self.running.get_mut(&trigger) {
                    run.progress = percent;
                }
            }
            ScanEvent::Error(e) => {
                self.log(ActivityLevel::Error, e.to_string());
            }
            ScanEvent::Finished(reachable) => {
                let observations = self
                    .running
                    .remove(&trigger)
                    .map(|run| run.observations)
                    .unwrap_or_default();
                let merged = reconcile(&self.config.hosts, &observations, &reachable, Utc::now());
                let added = merged.len().saturating_sub(self.config.hosts.len());
                self.replace_known(merged);
                if trigger != ScanTrigger::AutoRefresh {
                    self.log(
                        ActivityLevel::Info,
                        format!("{trigger} finished: {} reachable, {added} new.", reachable.len()),
                    );
                }
            }
        }
    }

    fn replace_known(&mut self, merged: KnownDevices) {
        self.config.hosts = merged;
        let hosts = &self.config.hosts;
        self.live.retain(|address, _| !hosts.contains(address));
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.config.save(&self.config_path) {
            error!(error = ?e, "Failed to save configuration.");
            self.log(ActivityLevel::Error, format!("Could not save configuration: {e}"));
        }
    }

    /// Timer-driven refresh, checked on every UI tick.
    pub fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        let interval = Duration::from_secs(self.config.auto_refresh_interval_secs.max(1));
        if self.config.auto_refresh && self.last_refresh.elapsed() >= interval {
            self.last_refresh = Instant::now();
            self.start_scan(ScanTrigger::AutoRefresh);
        }
    }

    pub fn toggle_auto_refresh(&mut self) {
        self.config.auto_refresh = !self.config.auto_refresh;
        self.last_refresh = Instant::now();
        info!(enabled = self.config.auto_refresh, "Auto-refresh toggled.");
        let state = if self.config.auto_refresh { "on" } else { "off" };
        self.log(ActivityLevel::Info, format!("Auto-refresh {state}."));
        self.persist();
    }

    // --- Device table ---

    pub fn rows(&self) -> Vec<DeviceRow> {
        let mut rows: Vec<DeviceRow> = self
            .config
            .hosts
            .iter()
            .map(|record| DeviceRow {
                address: record.address,
                name: record.display_name().to_string(),
                state: self
                    .live
                    .get(&record.address)
                    .map(|d| d.state.clone())
                    .unwrap_or_else(|| record.state.clone()),
                last_seen: record.last_seen,
                known: true,
            })
            .collect();
        rows.extend(
            self.live
                .values()
                .filter(|d| !self.config.hosts.contains(&d.address))
                .map(|d| DeviceRow {
                    address: d.address,
                    name: d.hostname.clone(),
                    state: d.state.clone(),
                    last_seen: None,
                    known: false,
                }),
        );
        rows.sort_by_key(|row| row.address);
        rows
    }

    pub fn selected_address(&self) -> Option<Ipv4Addr> {
        let rows = self.rows();
        self.table_state.selected().and_then(|i| rows.get(i)).map(|row| row.address)
    }

    pub fn select_next(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.table_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let previous = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(previous));
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    // --- Operator actions ---

    pub fn begin_input(&mut self, mode: InputMode) {
        self.input_mode = mode;
        self.input.clear();
    }

    pub fn begin_rename(&mut self) {
        if let Some(address) = self.selected_address().filter(|a| self.config.hosts.contains(a)) {
            self.begin_input(InputMode::Rename(address));
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
        match mode {
            InputMode::Normal => {}
            InputMode::AddSubnet => self.add_subnet(&text),
            InputMode::AddHost => self.add_host(&text),
            InputMode::Rename(address) => self.rename(address, &text),
        }
    }

    pub fn add_subnet(&mut self, text: &str) {
        match validate_subnet(text) {
            Ok(network) => {
                let normalized = network.to_string();
                if self.config.subnets.contains(&normalized) {
                    self.log(ActivityLevel::Info, format!("Subnet {normalized} is already configured."));
                    return;
                }
                self.config.subnets.push(normalized.clone());
                self.persist();
                self.log(ActivityLevel::Info, format!("Added subnet {normalized}."));
            }
            Err(e) => {
                warn!(error = %e, "Rejected subnet input.");
                self.log(ActivityLevel::Error, e.to_string());
            }
        }
    }

    pub fn remove_last_subnet(&mut self) {
        if let Some(subnet) = self.config.subnets.pop() {
            self.persist();
            self.log(ActivityLevel::Info, format!("Removed subnet {subnet}."));
        }
    }

    pub fn add_host(&mut self, text: &str) {
        match text.trim().parse::<Ipv4Addr>() {
            Ok(address) => {
                if self.config.hosts.add_known_host(address) {
                    self.persist();
                    self.log(ActivityLevel::Info, format!("Added host {address}."));
                } else {
                    self.log(ActivityLevel::Info, format!("Host {address} is already known."));
                }
            }
            Err(_) => self.log(ActivityLevel::Error, format!("`{}` is not an IPv4 address.", text.trim())),
        }
    }

    pub fn rename(&mut self, address: Ipv4Addr, name: &str) {
        if self.config.hosts.rename(&address, name) {
            self.persist();
            self.log(ActivityLevel::Info, format!("Renamed {address}."));
        }
    }

    pub fn remove_selected(&mut self) {
        let Some(address) = self.selected_address() else {
            return;
        };
        self.live.remove(&address);
        self.watch.forget(&address);
        if self.config.hosts.remove(&address).is_some() {
            self.persist();
            self.log(ActivityLevel::Info, format!("Removed host {address}."));
        }
        let len = self.rows().len();
        if self.table_state.selected().is_some_and(|i| i >= len) {
            self.table_state.select(len.checked_sub(1));
        }
    }

    /// Sends `command` to the selected device on a background task.
    pub fn send_command(&mut self, command: PrinterCommand) {
        let Some(address) = self.selected_address() else {
            self.log(ActivityLevel::Error, "Select a device first.");
            return;
        };
        info!(%address, %command, "Dispatching command.");
        self.log(ActivityLevel::Info, format!("Sending {command} to {address}..."));
        self.dispatch_in_background(address, command);
    }

    /// The outcome comes back through `pump` as a `CommandReport`.
    fn dispatch_in_background(&self, address: Ipv4Addr, command: PrinterCommand) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = dispatcher.send(address, command).await.map_err(|e| e.to_string());
            let report = CommandReport {
                address,
                command,
                result,
            };
            if tx.send(report).is_err() {
                debug!(%address, %command, "Command report dropped, consumer is gone.");
            }
        })
    }

    pub fn apply_command_report(&mut self, report: CommandReport) {
        let CommandReport { address, command, result } = report;
        match result {
            Ok(CommandOutcome { success: true, .. }) => {
                self.log(ActivityLevel::Info, format!("{command} accepted by {address}."));
            }
            Ok(CommandOutcome { status, .. }) => {
                let status = status.map_or_else(|| "no status".to_string(), |s| s.to_string());
                self.log(ActivityLevel::Error, format!("{command} rejected by {address} ({status})."));
            }
            Err(e) => self.log(ActivityLevel::Error, e),
        }
    }

    pub fn quit(&mut self) {
        for (trigger, run) in self.running.drain() {
            debug!(%trigger, "Aborting scan on quit.");
            run.handle.abort();
        }
        self.should_quit = true;
    }
}
