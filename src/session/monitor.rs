use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{LogoutReason, SessionController, SessionEvent};

/// Periodic session validity check running beside the UI.
#[derive(Debug, Clone, Copy)]
pub struct SessionMonitor {
    interval: Duration,
    warning_window: chrono::Duration,
}

impl SessionMonitor {
    pub fn new(interval: Duration, warning_window: chrono::Duration) -> Self {
        Self {
            interval,
            warning_window,
        }
    }

    pub fn from_controller(controller: &SessionController) -> Self {
        let config = controller.config();
        Self::new(config.poll_interval, config.warning_window)
    }

    /// Starts polling. The first check runs immediately. Must be called inside a tokio runtime.
    pub fn spawn(self, controller: Arc<SessionController>) -> MonitorHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut warned = false;

            loop {
                ticker.tick().await;
                self.poll(&controller, &mut warned);
            }
        });

        MonitorHandle { task }
    }

    fn poll(&self, controller: &SessionController, warned: &mut bool) {
        let Some(info) = controller.session_info() else {
            *warned = false;
            return;
        };

        if !info.valid {
            tracing::info!("session monitor detected timeout");
            controller.logout(LogoutReason::SessionTimeout);
            *warned = false;
            return;
        }

        if info.remaining <= self.warning_window {
            if !*warned {
                tracing::debug!(remaining_secs = info.remaining.num_seconds(), "session expiring soon");
                controller.emit(SessionEvent::ExpiringSoon {
                    remaining: info.remaining,
                });
                *warned = true;
            }
        } else {
            // Activity pushed the deadline back out of the window; warn again next time.
            *warned = false;
        }
    }
}

/// Owns the polling task; dropping it stops the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
