use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::telemetry::{
    EntityCandidate, EntityScanner, HostHandle, HostSlot, MemoryAccess, PlayerState,
    ResilientSampler, ScanConfig, StateStore,
};

use super::actuation::{ActuationMapper, ActuatorError, ActuatorLink};
use super::metrics::{MetricsAccumulator, MetricsHandle};
use super::rendering::{draw_markers, OverlayConfig, OverlayRenderer};
use super::tuning::LimitsHandle;

/// Fixed host addresses read every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostAddresses {
    pub local_entity: u64,
    pub entity_table: u64,
    pub orientation: u64,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub process_name: String,
    pub device_name: String,
    pub device_address: String,
    pub addresses: HostAddresses,
    pub scan: ScanConfig,
    pub tick_interval: Duration,
    pub read_timeout: Duration,
    pub metrics_log_interval: Duration,
    pub overlay: OverlayConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            process_name: String::new(),
            device_name: String::new(),
            device_address: String::new(),
            addresses: HostAddresses::default(),
            scan: ScanConfig::default(),
            tick_interval: Duration::from_millis(100),
            read_timeout: Duration::from_millis(50),
            metrics_log_interval: Duration::from_secs(1),
            overlay: OverlayConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to connect actuator at {address}: {source}")]
    ActuatorConnect {
        address: String,
        #[source]
        source: ActuatorError,
    },
}

pub struct Collaborators {
    pub memory: Arc<dyn MemoryAccess>,
    pub actuator: Option<Arc<dyn ActuatorLink>>,
    pub overlay: Option<Box<dyn OverlayRenderer>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub player: PlayerState,
    pub candidates: Vec<EntityCandidate>,
    pub intensity: Option<f64>,
    pub markers_drawn: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    HostUnavailable,
}

pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownHandle {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn request(&self, reason: &'static str) {
        if !self.sender.send_replace(true) {
            info!(reason, "shutdown_requested");
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Resolves once shutdown is requested or every [`ShutdownHandle`] is gone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    pub async fn stopped(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

struct CycleState {
    store: StateStore,
    overlay: Option<Box<dyn OverlayRenderer>>,
}

struct CycleContext {
    config: LoopConfig,
    sampler: ResilientSampler,
    scanner: EntityScanner,
    mapper: ActuationMapper,
    limits: LimitsHandle,
    host: HostSlot,
    state: Mutex<CycleState>,
}

impl CycleContext {
    async fn run_cycle(&self) -> CycleOutcome {
        let started = Instant::now();
        let Some(handle) = self.resolve_host().await else {
            return CycleOutcome::HostUnavailable;
        };

        let mut state = self.state.lock().await;
        let addresses = self.config.addresses;

        let orientation = self
            .sampler
            .read_orientation(handle, addresses.orientation)
            .await;
        state.store.update_orientation(orientation);
        let position = self
            .sampler
            .read_position(handle, addresses.local_entity, self.config.scan.position_offset)
            .await;
        state.store.update_position(position);
        let player = state.store.player_state();

        let candidates = match self
            .sampler
            .read_pointer(handle, addresses.entity_table)
            .await
        {
            Some(table_base) if table_base != 0 => {
                self.scanner
                    .scan(&self.sampler, handle, table_base, &player)
                    .await
            }
            _ => {
                debug!(address = addresses.entity_table, "entity_table_unresolved");
                Vec::new()
            }
        };

        let intensity = match candidates.first() {
            Some(best) => {
                let limits = self.limits.snapshot();
                self.mapper.actuate(best.angular_offset, limits).await
            }
            None => None,
        };

        let markers_drawn = match state.overlay.as_deref_mut() {
            Some(renderer) if self.config.overlay.enabled => {
                draw_markers(renderer, &self.config.overlay, &candidates)
            }
            _ => 0,
        };

        CycleOutcome::Completed(CycleReport {
            player,
            candidates,
            intensity,
            markers_drawn,
            elapsed: started.elapsed(),
        })
    }

    async fn resolve_host(&self) -> Option<HostHandle> {
        if let Some(handle) = self.host.current() {
            return Some(handle);
        }
        let name = self.config.process_name.as_str();
        let limit = self.sampler.read_timeout();
        let Ok(lookup) = timeout(limit, self.sampler.memory().list_processes(name)).await else {
            warn!(
                process = name,
                timeout_ms = limit.as_millis() as u64,
                "host_lookup_timed_out"
            );
            return None;
        };
        match lookup {
            Ok(processes) => match processes.first() {
                Some(process) => {
                    self.host.attach(process.handle);
                    Some(process.handle)
                }
                None => {
                    info!(process = name, "host_unavailable");
                    None
                }
            },
            Err(error) => {
                warn!(process = name, error = %error, "host_lookup_failed");
                None
            }
        }
    }

    async fn shutdown(&self) {
        self.mapper.disconnect().await;
        self.host.release();
    }
}

/// Drives one sampling → targeting → actuation cycle per tick.
#[derive(Clone)]
pub struct Scheduler {
    context: Arc<CycleContext>,
    metrics: MetricsHandle,
}

impl Scheduler {
    /// Builds the scheduler and connects the actuator link when one is
    /// supplied. A failed connect is fatal.
    pub async fn connect(
        config: LoopConfig,
        collaborators: Collaborators,
        limits: LimitsHandle,
    ) -> Result<Self, AppError> {
        let Collaborators {
            memory,
            actuator,
            overlay,
        } = collaborators;

        if let Some(link) = actuator.as_ref() {
            link.connect(&config.device_address)
                .await
                .map_err(|source| AppError::ActuatorConnect {
                    address: config.device_address.clone(),
                    source,
                })?;
            info!(
                address = %config.device_address,
                device = %config.device_name,
                "actuator_connected"
            );
        } else {
            info!(device = %config.device_name, "actuator_disabled");
        }

        let sampler = ResilientSampler::new(memory, config.read_timeout);
        let scanner = EntityScanner::new(config.scan);
        let mapper = ActuationMapper::new(actuator, config.device_name.clone(), config.scan.fov_degrees);
        let context = CycleContext {
            config,
            sampler,
            scanner,
            mapper,
            limits,
            host: HostSlot::default(),
            state: Mutex::new(CycleState {
                store: StateStore::default(),
                overlay,
            }),
        };

        Ok(Self {
            context: Arc::new(context),
            metrics: MetricsHandle::default(),
        })
    }

    pub fn metrics(&self) -> MetricsHandle {
        self.metrics.clone()
    }

    pub fn host(&self) -> Option<HostHandle> {
        self.context.host.current()
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        self.context.run_cycle().await
    }

    /// Ticks until `shutdown` fires. A tick that finds the previous cycle
    /// still running is counted as an overrun and skipped. On stop the link
    /// is disconnected and the host released without waiting for the
    /// in-flight cycle, which is left to finish or fail on its own.
    pub async fn run(&self, mut shutdown: ShutdownSignal) {
        let config = &self.context.config;
        let mut ticker = interval(normalize_non_zero_duration(
            config.tick_interval,
            Duration::from_millis(100),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut accumulator = MetricsAccumulator::new(normalize_non_zero_duration(
            config.metrics_log_interval,
            Duration::from_secs(1),
        ));
        let mut in_flight: Option<JoinHandle<CycleOutcome>> = None;

        info!(
            process = %config.process_name,
            tick_ms = config.tick_interval.as_millis() as u64,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            fov_degrees = config.scan.fov_degrees,
            overlay = config.overlay.enabled,
            "scheduler_started"
        );

        loop {
            tokio::select! {
                _ = shutdown.stopped() => break,
                _ = ticker.tick() => {}
            }

            let busy = in_flight
                .as_ref()
                .is_some_and(|cycle| !cycle.is_finished());
            if busy {
                accumulator.record_overrun();
                warn!("cycle_overrun");
            } else {
                if let Some(previous) = in_flight.take() {
                    record_outcome(previous.await, &mut accumulator);
                }
                let context = Arc::clone(&self.context);
                in_flight = Some(tokio::spawn(async move { context.run_cycle().await }));
            }

            if let Some(snapshot) = accumulator.maybe_snapshot(Instant::now().into_std()) {
                self.metrics.publish(snapshot);
                info!(
                    cps = snapshot.cycles_per_second,
                    cycle_ms = snapshot.cycle_time_ms,
                    overruns = snapshot.overruns,
                    skipped = snapshot.skipped,
                    actuations = snapshot.actuations,
                    "loop_metrics"
                );
            }
        }

        if let Some(cycle) = in_flight.take() {
            if !cycle.is_finished() {
                debug!("cycle_detached");
            }
            drop(cycle);
        }
        self.context.shutdown().await;
        info!("shutdown");
    }
}

fn record_outcome(
    outcome: Result<CycleOutcome, tokio::task::JoinError>,
    accumulator: &mut MetricsAccumulator,
) {
    match outcome {
        Ok(CycleOutcome::Completed(report)) => {
            accumulator.record_cycle(report.elapsed, report.intensity.is_some());
            debug!(
                candidates = report.candidates.len(),
                intensity = ?report.intensity,
                yaw = report.player.orientation.yaw,
                "cycle_completed"
            );
        }
        Ok(CycleOutcome::HostUnavailable) => {
            accumulator.record_skipped();
            debug!("cycle_skipped");
        }
        Err(error) => warn!(error = %error, "cycle_task_failed"),
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
