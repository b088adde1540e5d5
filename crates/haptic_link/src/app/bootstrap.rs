use std::io::{self, Write};
use std::sync::Arc;

use haptic_engine::{
    load_config_from_env, ActuatorLink, AppConfig, AppError, Collaborators, LimitsHandle,
    LoopConfig, OverlayRenderer, TuningController,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::overlay_log::LogOverlay;
use super::proc_memory::ProcMemory;
use super::tcp_link::TcpActuatorLink;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) collaborators: Collaborators,
    pub(crate) limits: LimitsHandle,
    pub(crate) tuning: TuningController,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Haptic Link Startup ===");

    let config = load_config_from_env()?;
    info!(
        process = %config.process_name,
        device = %config.device.name,
        address = %config.device.address,
        max = config.limits.max,
        min = config.limits.min,
        "config_loaded"
    );
    Ok(wire(&config))
}

fn wire(config: &AppConfig) -> AppWiring {
    let limits = LimitsHandle::new(config.limits);
    let tuning = TuningController::new(limits.clone(), config.tuning_step);

    let actuator = if config.device.address.trim().is_empty() {
        None
    } else {
        Some(Arc::new(TcpActuatorLink::default()) as Arc<dyn ActuatorLink>)
    };
    let overlay = if config.overlay.enabled {
        Some(Box::new(LogOverlay::default()) as Box<dyn OverlayRenderer>)
    } else {
        None
    };

    AppWiring {
        config: config.loop_config(),
        collaborators: Collaborators {
            memory: Arc::new(ProcMemory),
            actuator,
            overlay,
        },
        limits,
        tuning,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(|| CrlfWriter(io::stderr()))
        .compact()
        .init();
}

/// Raw terminal mode disables output post-processing, so bare `\n` would not
/// return the cursor.
struct CrlfWriter<W>(W);

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (index, byte) in buf.iter().enumerate() {
            if *byte == b'\n' && (index == 0 || buf[index - 1] != b'\r') {
                self.0.write_all(&buf[start..index])?;
                self.0.write_all(b"\r\n")?;
                start = index + 1;
            }
        }
        self.0.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
