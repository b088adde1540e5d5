pub mod app;
mod config;
mod math;
pub mod telemetry;
#[cfg(test)]
mod testing;

pub use app::{
    draw_markers, intensity_for, project, shutdown_channel, ActuationLimits, ActuationMapper,
    ActuatorError, ActuatorLink, AppError, Collaborators, CycleOutcome, CycleReport,
    HostAddresses, InputAction, InputCollector, KeyState, LimitsHandle, LoopConfig,
    LoopMetricsSnapshot, MetricsHandle, OverlayConfig, OverlayRenderer, ProjectionConfig,
    Scheduler, ShutdownHandle, ShutdownSignal, SurfaceId, TuningController, TuningError,
    Viewport, VIBRATE_ACTION,
};
pub use config::{
    load_config_from_env, parse_address, AppConfig, ConfigError, DeviceConfig, OffsetConfig,
    TargetingConfig, TimingConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE,
};
pub use math::{angular_offset, planar_distance, Vec2, Vec3};
pub use telemetry::{
    EntityCandidate, HostHandle, MemoryAccess, MemoryError, Orientation, PlayerState, ProcessRef,
    ReadRequest, ValueKind,
};
