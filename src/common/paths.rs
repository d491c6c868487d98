use std::path::PathBuf;
use std::fs;
use crate::common::error::{FaceLockError, Result};

const DEV_BASE_DIR: &str = "./dev_data";
const SYSTEM_CONFIG_FILE: &str = "/etc/facelock/facelock.toml";
const SYSTEM_DATA_DIR: &str = "/var/lib/facelock";
const SYSTEM_MODELS_DIR: &str = "/usr/share/facelock/models";

pub enum RunMode {
    Development(PathBuf),  // Base directory for dev mode
    System,                // Use system paths
    User(PathBuf),         // Home directory
}

pub struct Paths {
    mode: RunMode,
}

impl Paths {
    /// Picks the run mode: `--dev` keeps everything under `./dev_data`,
    /// root uses system paths, anyone else their home directory.
    pub fn new(dev: bool) -> Result<Self> {
        if dev {
            return Self::development(PathBuf::from(DEV_BASE_DIR));
        }

        if std::env::var("USER").unwrap_or_default() == "root" {
            fs::create_dir_all(SYSTEM_DATA_DIR)?;
            tracing::debug!("System mode - using {}", SYSTEM_DATA_DIR);
            return Ok(Self { mode: RunMode::System });
        }

        let home = dirs::home_dir()
            .ok_or_else(|| FaceLockError::Other(anyhow::anyhow!("Could not find home directory")))?;
        let data_dir = home.join(".local/share/facelock");
        fs::create_dir_all(&data_dir)?;
        tracing::debug!("User mode - using {}", data_dir.display());

        Ok(Self { mode: RunMode::User(home) })
    }

    pub fn development(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(base_dir.join("configs"))?;
        fs::create_dir_all(base_dir.join("data"))?;

        println!("📁 Development mode - using local directory: {}", base_dir.display());

        Ok(Self { mode: RunMode::Development(base_dir) })
    }

    pub fn config_file(&self) -> PathBuf {
        match &self.mode {
            RunMode::Development(base) => base.join("configs/facelock.toml"),
            RunMode::System => PathBuf::from(SYSTEM_CONFIG_FILE),
            RunMode::User(home) => {
                let user_config = home.join(".config/facelock/facelock.toml");
                if user_config.exists() {
                    user_config
                } else {
                    PathBuf::from(SYSTEM_CONFIG_FILE)
                }
            }
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        match &self.mode {
            RunMode::Development(base) => base.join("data"),
            RunMode::System => PathBuf::from(SYSTEM_DATA_DIR),
            RunMode::User(home) => home.join(".local/share/facelock"),
        }
    }

    pub fn encodings_file(&self) -> PathBuf {
        self.data_dir().join("encodings.bincode")
    }

    pub fn models_dir(&self) -> PathBuf {
        match &self.mode {
            RunMode::Development(_) => PathBuf::from("./models"),
            RunMode::System | RunMode::User(_) => PathBuf::from(SYSTEM_MODELS_DIR),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self.mode, RunMode::Development(_))
    }
}
