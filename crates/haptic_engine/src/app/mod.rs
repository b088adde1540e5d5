mod actuation;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod tuning;

pub use actuation::{
    intensity_for, ActuationLimits, ActuationMapper, ActuatorError, ActuatorLink,
    INTENSITY_CEILING, INTENSITY_FLOOR, VIBRATE_ACTION,
};
pub use input::{InputAction, InputCollector, KeyState};
pub use loop_runner::{
    shutdown_channel, AppError, Collaborators, CycleOutcome, CycleReport, HostAddresses,
    LoopConfig, Scheduler, ShutdownHandle, ShutdownSignal,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    draw_markers, project, OverlayConfig, OverlayRenderer, ProjectionConfig, SurfaceId, Viewport,
    DEFAULT_DEPTH_EPSILON, DEFAULT_PROJECTION_FOV_DEGREES, MARKER_HALF_SIZE,
};
pub use tuning::{LimitsHandle, TuningController, TuningError, DEFAULT_TUNING_STEP};
