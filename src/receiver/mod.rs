// ABOUTME: The receiving daemon: configuration, hook delivery and per-device supervisors
// ABOUTME: run() keeps every configured device connected until shutdown is requested

pub mod config;
pub mod hook;
pub mod supervisor;

pub use config::{ConfigError, Configuration, Device, DeviceSettings, HookMode};
pub use hook::{HookCommand, HookError, HookSink, Payload};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// Supervise every device in `config` until `shutdown` is cancelled, then
/// wait for sessions to unbind and the hook to drain.
pub async fn run(config: Configuration, shutdown: CancellationToken) {
    let (hook, hook_task) = HookSink::spawn(HookCommand {
        program: config.hook,
        args: config.hook_args,
        mode: config.hook_mode,
    });

    let tracker = TaskTracker::new();
    for device in config.devices {
        tracker.spawn(supervisor::run(device, hook.clone(), shutdown.clone()));
    }
    tracker.close();
    info!(devices = tracker.len(), "receiver started");

    tracker.wait().await;
    drop(hook);
    if let Err(e) = hook_task.await {
        tracing::warn!(error = %e, "hook writer failed");
    }
    info!("receiver stopped");
}
