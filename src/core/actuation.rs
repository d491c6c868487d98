use crate::common::config::ActuationConfig;
use crate::common::Result;
use crate::hardware::display::{MSG_LOCKING, MSG_REJECTED, MSG_UNLOCKED};
use crate::hardware::{Actuator, Display};
use crate::notify::{Notifier, UnlockEvent};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationTimings {
    pub unlock_dwell: Duration,
    pub lock_warning: Duration,
    pub reject_display: Duration,
}

impl ActuationTimings {
    pub const ZERO: Self = Self {
        unlock_dwell: Duration::ZERO,
        lock_warning: Duration::ZERO,
        reject_display: Duration::ZERO,
    };
}

impl From<&ActuationConfig> for ActuationTimings {
    fn from(config: &ActuationConfig) -> Self {
        Self {
            unlock_dwell: Duration::from_millis(config.unlock_dwell_ms),
            lock_warning: Duration::from_millis(config.lock_warning_ms),
            reject_display: Duration::from_millis(config.reject_display_ms),
        }
    }
}

/// Holds the lock open; relocks when dropped unless `relock` already succeeded.
struct UnlockGuard<'a> {
    actuator: &'a mut dyn Actuator,
    locked: bool,
}

impl<'a> UnlockGuard<'a> {
    fn engage(actuator: &'a mut dyn Actuator) -> Result<Self> {
        if let Err(e) = actuator.unlock() {
            // A partial unlock must not leave the line active.
            let _ = actuator.lock();
            return Err(e);
        }
        tracing::info!("Safe unlocked");
        Ok(Self { actuator, locked: false })
    }

    fn relock(mut self) -> Result<()> {
        self.actuator.lock()?;
        self.locked = true;
        tracing::info!("Safe locked");
        Ok(())
    }
}

impl Drop for UnlockGuard<'_> {
    fn drop(&mut self) {
        if !self.locked {
            if let Err(e) = self.actuator.lock() {
                tracing::error!("Failed to relock safe: {}", e);
            }
        }
    }
}

/// Runs the blocking unlock and rejection sequences. The lock is engaged on
/// construction and again on drop.
pub struct ActuationCoordinator {
    actuator: Box<dyn Actuator>,
    notifier: Box<dyn Notifier>,
    timings: ActuationTimings,
}

impl ActuationCoordinator {
    pub fn new(
        mut actuator: Box<dyn Actuator>,
        notifier: Box<dyn Notifier>,
        timings: ActuationTimings,
    ) -> Result<Self> {
        actuator.lock()?;
        Ok(Self { actuator, notifier, timings })
    }

    pub fn grant(&mut self, identity: &str, display: &mut dyn Display) -> Result<()> {
        display.clear();
        display.write(MSG_UNLOCKED);

        let guard = UnlockGuard::engage(self.actuator.as_mut())?;

        let event = UnlockEvent::now(identity);
        if let Err(e) = self.notifier.notify(&event) {
            tracing::warn!("Unlock notification for {} failed: {}", identity, e);
        }

        thread::sleep(self.timings.unlock_dwell);
        display.clear();
        display.write(MSG_LOCKING);
        thread::sleep(self.timings.lock_warning);

        guard.relock()?;
        display.clear();
        Ok(())
    }

    pub fn deny(&mut self, display: &mut dyn Display) {
        display.clear();
        display.write(MSG_REJECTED);
        thread::sleep(self.timings.reject_display);
        display.clear();
    }
}

impl Drop for ActuationCoordinator {
    fn drop(&mut self) {
        if let Err(e) = self.actuator.lock() {
            tracing::error!("Failed to lock safe on shutdown: {}", e);
        }
    }
}
