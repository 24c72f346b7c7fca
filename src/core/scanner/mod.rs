// src/core/scanner/mod.rs

//! The scan orchestrator and the probing pieces it drives.
//!
//! A scan walks a fixed state machine:
//! `Idle -> ConnectivityCheck -> ScanningKnown -> ScanningSubnets -> Reconciling -> Done`,
//! dropping to `Aborted` when there is no network path at all. Each phase runs its
//! probes on a bounded pool of tasks and streams `ScanEvent`s to a single consumer
//! as probes complete.

pub mod address_space;
pub mod connectivity;
pub mod port_prober;
pub mod printer_info;
pub mod probe;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument};

use self::address_space::{expand_subnet, host_count, validate_subnet};
use self::probe::NetworkProbe;
use crate::core::error::ScanError;
use crate::core::models::{
    DeviceState, Discovery, ScanEvent, ScanTrigger, ScanUpdate, UNKNOWN_HOSTNAME,
};

/// Tunables of the probing stack. Every field falls back to its default when
/// missing from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub info_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub known_workers: usize,
    pub subnet_workers: usize,
    pub connectivity_host: String,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            port: port_prober::DEFAULT_PORT,
            connect_timeout_ms: port_prober::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            info_timeout_ms: printer_info::DEFAULT_INFO_TIMEOUT.as_millis() as u64,
            command_timeout_ms: crate::core::commands::DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            cache_ttl_secs: printer_info::DEFAULT_CACHE_TTL.as_secs(),
            cache_capacity: printer_info::DEFAULT_CACHE_CAPACITY,
            known_workers: ScanLimits::default().known_workers,
            subnet_workers: ScanLimits::default().subnet_workers,
            connectivity_host: connectivity::DEFAULT_CONNECTIVITY_HOST.to_string(),
        }
    }
}

impl ScannerSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_millis(self.info_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            known_workers: self.known_workers,
            subnet_workers: self.subnet_workers,
        }
    }
}

/// Worker-pool widths of the two sweep phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub known_workers: usize,
    pub subnet_workers: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        // The known set is small and re-probed on every refresh; subnet sweeps
        // are large and rare.
        Self {
            known_workers: 20,
            subnet_workers: 100,
        }
    }
}

/// Input of one scan run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub trigger: ScanTrigger,
    /// Swept in the order given. An empty list means a known-hosts refresh.
    pub subnets: Vec<String>,
    pub known_hosts: BTreeSet<Ipv4Addr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScanPhase {
    Idle,
    ConnectivityCheck,
    ScanningKnown,
    ScanningSubnets,
    Reconciling,
    Done,
    Aborted,
}

/// Fans events out to the single consumer, tagging them with the trigger.
struct EventSink {
    trigger: ScanTrigger,
    tx: UnboundedSender<ScanUpdate>,
}

impl EventSink {
    fn emit(&self, event: ScanEvent) {
        let update = ScanUpdate {
            trigger: self.trigger,
            event,
        };
        if self.tx.send(update).is_err() {
            debug!("Scan event dropped, consumer is gone.");
        }
    }
}

/// Completed-probe counter across both phases.
struct Progress {
    total: u64,
    completed: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self { total, completed: 0 }
    }

    /// Records one finished probe and returns the new percentage, or `None`
    /// when there is nothing to measure against.
    fn tick(&mut self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        self.completed = (self.completed + 1).min(self.total);
        Some(self.completed as f64 / self.total as f64 * 100.0)
    }
}

/// Drives one scan from start to finish.
pub struct ScanOrchestrator<P: ?Sized> {
    probe: Arc<P>,
    limits: ScanLimits,
    phase: ScanPhase,
}

impl<P> ScanOrchestrator<P>
where
    P: NetworkProbe + ?Sized + 'static,
{
    pub fn new(probe: Arc<P>, limits: ScanLimits) -> Self {
        Self {
            probe,
            limits,
            phase: ScanPhase::Idle,
        }
    }

    fn transition(&mut self, next: ScanPhase) {
        debug!(from = %self.phase, to = %next, "Scan phase change.");
        self.phase = next;
    }

    /// Runs the whole scan, streaming events into `events`, and returns the
    /// terminal phase (`Done` or `Aborted`).
    pub async fn run(mut self, request: ScanRequest, events: UnboundedSender<ScanUpdate>) -> ScanPhase {
        let sink = EventSink {
            trigger: request.trigger,
            tx: events,
        };
        let known = request.known_hosts;
        let total = known.len() as u64
            + request
                .subnets
                .iter()
                .filter_map(|spec| validate_subnet(spec).ok())
                .map(|network| host_count(&network))
                .sum::<u64>();
        info!(
            known = known.len(),
            subnets = request.subnets.len(),
            total,
            "Starting scan."
        );

        self.transition(ScanPhase::ConnectivityCheck);
        if let Err(e) = self.probe.check_connectivity().await {
            error!(error = %e, "Scan aborted before probing.");
            sink.emit(ScanEvent::Error(e));
            self.transition(ScanPhase::Aborted);
            return self.phase;
        }

        let mut progress = Progress::new(total);
        let mut reachable = BTreeSet::new();

        self.transition(ScanPhase::ScanningKnown);
        self.sweep(
            known.iter().copied(),
            self.limits.known_workers,
            &sink,
            &mut progress,
            &mut reachable,
        )
        .await;

        self.transition(ScanPhase::ScanningSubnets);
        for spec in &request.subnets {
            match expand_subnet(spec) {
                Ok(addresses) => {
                    debug!(subnet = %spec, "Scanning subnet.");
                    self.sweep(
                        addresses,
                        self.limits.subnet_workers,
                        &sink,
                        &mut progress,
                        &mut reachable,
                    )
                    .await;
                }
                Err(e) => {
                    error!(subnet = %e.subnet, reason = %e.reason, "Skipping invalid subnet.");
                    sink.emit(ScanEvent::Error(ScanError::InvalidSubnet(e)));
                }
            }
        }

        for &address in known.difference(&reachable) {
            let hostname = self
                .probe
                .cached_info(address)
                .map(|info| info.hostname)
                .unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string());
            sink.emit(ScanEvent::HostFound(Discovery {
                address,
                hostname,
                state: DeviceState::Offline,
            }));
        }

        self.transition(ScanPhase::Reconciling);
        info!(found = reachable.len(), "Scan finished.");
        sink.emit(ScanEvent::Finished(reachable.into_iter().collect()));

        self.transition(ScanPhase::Done);
        self.phase
    }

    /// Probes `addresses` with at most `width` tasks in flight, handling results
    /// in completion order. Addresses are pulled lazily as slots free up.
    async fn sweep<I>(
        &self,
        mut addresses: I,
        width: usize,
        sink: &EventSink,
        progress: &mut Progress,
        reachable: &mut BTreeSet<Ipv4Addr>,
    ) where
        I: Iterator<Item = Ipv4Addr>,
    {
        let mut workers = JoinSet::new();
        for address in addresses.by_ref().take(width.max(1)) {
            self.spawn_probe(&mut workers, address);
        }

        while let Some(joined) = workers.join_next().await {
            if let Some(next) = addresses.next() {
                self.spawn_probe(&mut workers, next);
            }
            match joined {
                Ok(Some(discovery)) => {
                    reachable.insert(discovery.address);
                    sink.emit(ScanEvent::HostFound(discovery));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Probe task failed."),
            }
            if let Some(percent) = progress.tick() {
                sink.emit(ScanEvent::Progress(percent));
            }
        }
    }

    fn spawn_probe(&self, workers: &mut JoinSet<Option<Discovery>>, address: Ipv4Addr) {
        let probe = Arc::clone(&self.probe);
        workers.spawn(
            async move {
                let address = probe.probe(address).await?;
                let info = probe.printer_info(address).await;
                Some(Discovery {
                    address,
                    hostname: info.hostname,
                    state: info.state,
                })
            }
            .in_current_span(),
        );
    }
}

/// Starts a scan on its own task so the caller's loop stays responsive.
pub fn spawn_scan<P>(
    probe: Arc<P>,
    limits: ScanLimits,
    request: ScanRequest,
    events: UnboundedSender<ScanUpdate>,
) -> JoinHandle<ScanPhase>
where
    P: NetworkProbe + ?Sized + 'static,
{
    let span = info_span!("scan", trigger = %request.trigger);
    tokio::spawn(ScanOrchestrator::new(probe, limits).run(request, events).instrument(span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::PrinterInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    #[derive(Default)]
    struct FakeProbe {
        offline: bool,
        devices: HashMap<Ipv4Addr, PrinterInfo>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        probed: Mutex<Vec<Ipv4Addr>>,
    }

    impl FakeProbe {
        fn with_devices(devices: &[(Ipv4Addr, &str, DeviceState)]) -> Self {
            Self {
                devices: devices
                    .iter()
                    .map(|(addr, name, state)| (*addr, PrinterInfo::new(*name, state.clone())))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl NetworkProbe for FakeProbe {
        async fn check_connectivity(&self) -> Result<(), ScanError> {
            if self.offline {
                Err(ScanError::Connectivity("no route".into()))
            } else {
                Ok(())
            }
        }

        async fn probe(&self, address: Ipv4Addr) -> Option<Ipv4Addr> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.probed.lock().unwrap().push(address);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.devices.contains_key(&address).then_some(address)
        }

        async fn printer_info(&self, address: Ipv4Addr) -> PrinterInfo {
            self.devices
                .get(&address)
                .cloned()
                .unwrap_or_else(|| PrinterInfo::new(UNKNOWN_HOSTNAME, DeviceState::Unreachable))
        }

        fn cached_info(&self, _address: Ipv4Addr) -> Option<PrinterInfo> {
            None
        }
    }

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn request(subnets: &[&str], known: &[Ipv4Addr]) -> ScanRequest {
        ScanRequest {
            trigger: ScanTrigger::ManualScan,
            subnets: subnets.iter().map(|s| s.to_string()).collect(),
            known_hosts: known.iter().copied().collect(),
        }
    }

    async fn run_scan(probe: FakeProbe, limits: ScanLimits, request: ScanRequest) -> (ScanPhase, Vec<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let phase = ScanOrchestrator::new(Arc::new(probe), limits).run(request, tx).await;
        (phase, drain(rx))
    }

    fn drain(mut rx: UnboundedReceiver<ScanUpdate>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Ok(update) = rx.try_recv() {
            events.push(update.event);
        }
        events
    }

    fn progress_values(events: &[ScanEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn discoveries(events: &[ScanEvent]) -> Vec<Discovery> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::HostFound(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn known_host_outside_subnet_is_found_alongside_the_sweep() {
        let probe = FakeProbe::with_devices(&[
            (ip(9), "printerA", DeviceState::Ready),
            (ip(2), "printerB", DeviceState::Printing),
        ]);
        let (phase, events) = run_scan(probe, ScanLimits::default(), request(&["10.0.0.0/30"], &[ip(9)])).await;

        assert_eq!(phase, ScanPhase::Done);
        let found = discoveries(&events);
        assert_eq!(
            found[0],
            Discovery { address: ip(9), hostname: "printerA".into(), state: DeviceState::Ready }
        );
        assert!(found.contains(&Discovery {
            address: ip(2),
            hostname: "printerB".into(),
            state: DeviceState::Printing,
        }));
        assert_eq!(found.len(), 2);
        assert_eq!(events.last(), Some(&ScanEvent::Finished(vec![ip(2), ip(9)])));
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_reaches_one_hundred() {
        let probe = FakeProbe::with_devices(&[(ip(1), "a", DeviceState::Ready)]);
        let (_, events) = run_scan(
            probe,
            ScanLimits { known_workers: 2, subnet_workers: 4 },
            request(&["10.0.0.0/29"], &[ip(1), ip(200)]),
        )
        .await;

        let progress = progress_values(&events);
        assert_eq!(progress.len(), 2 + 6);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!((progress.last().copied().unwrap() - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_scan_emits_no_progress_and_finishes_empty() {
        let (phase, events) = run_scan(FakeProbe::default(), ScanLimits::default(), request(&[], &[])).await;
        assert_eq!(phase, ScanPhase::Done);
        assert_eq!(events, vec![ScanEvent::Finished(Vec::new())]);
    }

    #[tokio::test]
    async fn invalid_subnet_is_reported_and_the_rest_still_scanned() {
        let probe = FakeProbe::with_devices(&[(ip(1), "a", DeviceState::Standby)]);
        let (phase, events) = run_scan(
            probe,
            ScanLimits::default(),
            request(&["not-a-subnet", "10.0.0.0/30"], &[]),
        )
        .await;

        assert_eq!(phase, ScanPhase::Done);
        assert!(matches!(
            &events[0],
            ScanEvent::Error(ScanError::InvalidSubnet(e)) if e.subnet == "not-a-subnet"
        ));
        assert_eq!(discoveries(&events).len(), 1);
        let progress = progress_values(&events);
        assert_eq!(progress.len(), 2);
        assert!((progress[1] - 100.0).abs() < 1e-9);
        assert_eq!(events.last(), Some(&ScanEvent::Finished(vec![ip(1)])));
    }

    #[tokio::test]
    async fn lost_connectivity_aborts_before_any_probe() {
        let probe = Arc::new(FakeProbe {
            offline: true,
            ..FakeProbe::with_devices(&[(ip(1), "a", DeviceState::Ready)])
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let phase = ScanOrchestrator::new(Arc::clone(&probe), ScanLimits::default())
            .run(request(&["10.0.0.0/30"], &[ip(1)]), tx)
            .await;

        assert_eq!(phase, ScanPhase::Aborted);
        assert!(probe.probed.lock().unwrap().is_empty());
        let events = drain(rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ScanEvent::Error(ScanError::Connectivity(_))));
    }

    #[tokio::test]
    async fn unreachable_known_hosts_are_reported_offline_last() {
        let probe = FakeProbe::with_devices(&[(ip(9), "printerA", DeviceState::Ready)]);
        let (_, events) = run_scan(
            probe,
            ScanLimits::default(),
            request(&["10.0.0.0/30"], &[ip(9), ip(50)]),
        )
        .await;

        let n = events.len();
        assert_eq!(
            events[n - 2],
            ScanEvent::HostFound(Discovery {
                address: ip(50),
                hostname: UNKNOWN_HOSTNAME.into(),
                state: DeviceState::Offline,
            })
        );
        assert_eq!(events[n - 1], ScanEvent::Finished(vec![ip(9)]));
    }

    #[tokio::test]
    async fn known_phase_precedes_subnet_phase_and_pool_width_is_respected() {
        let known_addr = Ipv4Addr::new(192, 168, 50, 5);
        let mut devices = vec![(known_addr, "known", DeviceState::Ready)];
        for last in [3u8, 77, 200] {
            devices.push((Ipv4Addr::new(10, 9, 0, last), "swept", DeviceState::Standby));
        }
        let probe = Arc::new(FakeProbe {
            delay: Duration::from_millis(2),
            ..FakeProbe::with_devices(&devices)
        });
        let (tx, rx) = mpsc::unbounded_channel();
        ScanOrchestrator::new(
            Arc::clone(&probe),
            ScanLimits { known_workers: 1, subnet_workers: 8 },
        )
        .run(request(&["10.9.0.0/24"], &[known_addr]), tx)
        .await;

        let found = discoveries(&drain(rx));
        assert_eq!(found.len(), 4);
        assert_eq!(found[0].address, known_addr);
        assert!(found[1..].iter().all(|d| d.hostname == "swept"));
        assert_eq!(probe.probed.lock().unwrap().len(), 255);
        let peak = probe.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 8, "pool width exceeded: {peak}");
    }

    #[tokio::test]
    async fn spawned_scan_tags_events_with_its_trigger() {
        let probe: Arc<dyn NetworkProbe> = Arc::new(FakeProbe::with_devices(&[(ip(9), "a", DeviceState::Ready)]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_scan(
            probe,
            ScanLimits::default(),
            ScanRequest {
                trigger: ScanTrigger::AutoRefresh,
                subnets: Vec::new(),
                known_hosts: [ip(9)].into_iter().collect(),
            },
            tx,
        );
        assert_eq!(handle.await.unwrap(), ScanPhase::Done);
        while let Ok(update) = rx.try_recv() {
            assert_eq!(update.trigger, ScanTrigger::AutoRefresh);
        }
    }

    #[test]
    fn progress_tracker_handles_zero_total() {
        let mut progress = Progress::new(0);
        assert_eq!(progress.tick(), None);
        let mut progress = Progress::new(4);
        assert_eq!(progress.tick(), Some(25.0));
    }

    #[test]
    fn settings_default_to_documented_values() {
        let settings = ScannerSettings::default();
        assert_eq!(settings.port, 7125);
        assert_eq!(settings.connect_timeout(), Duration::from_secs(1));
        assert_eq!(settings.info_timeout(), Duration::from_secs(2));
        assert_eq!(settings.command_timeout(), Duration::from_secs(5));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(30));
        assert_eq!(settings.limits(), ScanLimits { known_workers: 20, subnet_workers: 100 });
    }
}
