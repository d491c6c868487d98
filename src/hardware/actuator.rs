use crate::common::{FaceLockError, Result};
use crate::hardware::Actuator;
use std::fs;
use std::path::PathBuf;

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Lock solenoid/relay on a sysfs GPIO line. "Unlocked" drives the line to
/// its active level.
pub struct SysfsGpioActuator {
    root: PathBuf,
    pin: u32,
    active_low: bool,
    exported: bool,
}

impl SysfsGpioActuator {
    pub fn new(pin: u32, active_low: bool) -> Result<Self> {
        Self::with_root(PathBuf::from(GPIO_ROOT), pin, active_low)
    }

    /// Uses an alternative sysfs root.
    pub fn with_root(root: PathBuf, pin: u32, active_low: bool) -> Result<Self> {
        let mut actuator = Self {
            root,
            pin,
            active_low,
            exported: false,
        };

        if !actuator.pin_dir().exists() {
            fs::write(actuator.root.join("export"), pin.to_string())
                .map_err(|e| FaceLockError::Actuator(format!("Failed to export GPIO {}: {}", pin, e)))?;
            actuator.exported = true;
        }

        // "high"/"low" switch to output already at the locked level.
        let direction = if active_low { "high" } else { "low" };
        fs::write(actuator.pin_dir().join("direction"), direction)
            .map_err(|e| FaceLockError::Actuator(format!("Failed to configure GPIO {}: {}", pin, e)))?;

        tracing::info!("Lock actuator on GPIO {} (active {})", pin, if active_low { "low" } else { "high" });
        Ok(actuator)
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    fn drive(&self, active: bool) -> Result<()> {
        let level = if active != self.active_low { "1" } else { "0" };
        fs::write(self.pin_dir().join("value"), level)
            .map_err(|e| FaceLockError::Actuator(format!("Failed to drive GPIO {}: {}", self.pin, e)))
    }
}

impl Actuator for SysfsGpioActuator {
    fn lock(&mut self) -> Result<()> {
        self.drive(false)
    }

    fn unlock(&mut self) -> Result<()> {
        self.drive(true)
    }
}

impl Drop for SysfsGpioActuator {
    fn drop(&mut self) {
        if let Err(e) = self.drive(false) {
            tracing::error!("Failed to lock on release: {}", e);
        }
        if self.exported {
            if let Err(e) = fs::write(self.root.join("unexport"), self.pin.to_string()) {
                tracing::warn!("Failed to unexport GPIO {}: {}", self.pin, e);
            }
        }
    }
}

/// Stand-in actuator for setups without a wired lock.
#[derive(Debug, Default)]
pub struct LoggingActuator {
    unlocked: bool,
}

impl LoggingActuator {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

impl Actuator for LoggingActuator {
    fn lock(&mut self) -> Result<()> {
        if self.unlocked {
            tracing::info!("Lock engaged");
        }
        self.unlocked = false;
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        tracing::info!("Lock released");
        self.unlocked = true;
        Ok(())
    }
}
