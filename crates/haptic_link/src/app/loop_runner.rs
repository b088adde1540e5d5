use std::process::ExitCode;

use haptic_engine::{shutdown_channel, Scheduler, ShutdownHandle};
use tracing::{error, warn};

use super::bootstrap::{self, AppWiring};
use super::terminal_input;

pub(crate) async fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => run_wired(app).await,
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_wired(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        collaborators,
        limits,
        tuning,
    } = app;

    let scheduler = match Scheduler::connect(config, collaborators, limits).await {
        Ok(scheduler) => scheduler,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown, signal) = shutdown_channel();
    let signals = tokio::spawn(wait_for_signals(shutdown.clone()));
    let input = terminal_input::spawn(shutdown.clone(), tuning);

    scheduler.run(signal).await;

    signals.abort();
    if let Some(input) = input {
        if let Err(err) = input.await {
            warn!(error = %err, "terminal_input_join_failed");
        }
    }
    ExitCode::SUCCESS
}

async fn wait_for_signals(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => match result {
                        Ok(()) => shutdown.request("sigint"),
                        Err(err) => warn!(error = %err, "signal_handler_failed"),
                    },
                    _ = terminate.recv() => shutdown.request("sigterm"),
                }
                return;
            }
            Err(err) => warn!(error = %err, "sigterm_handler_unavailable"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => shutdown.request("sigint"),
        Err(err) => warn!(error = %err, "signal_handler_failed"),
    }
}
