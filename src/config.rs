//! Import policy knobs and their YAML loader.
//!
//! ```yaml
//! max_file_size: 5242880
//! default_status: lead
//! validate_email: true
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::validate::ClientStatus;

pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPolicy {
    /// Largest accepted upload, in bytes.
    pub max_file_size: usize,
    /// Status written to clients whose row has no `status` cell.
    pub default_status: ClientStatus,
    pub validate_email: bool,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_status: ClientStatus::default(),
            validate_email: true,
        }
    }
}

impl ImportPolicy {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening policy file {path:?}"))?;
        let policy: ImportPolicy = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing policy YAML {path:?}"))?;
        policy.check()?;
        Ok(policy)
    }

    pub fn with_max_file_size(mut self, max_file_size: Option<usize>) -> Self {
        if let Some(limit) = max_file_size {
            self.max_file_size = limit;
        }
        self
    }

    fn check(&self) -> Result<()> {
        ensure!(self.max_file_size > 0, "max_file_size must be greater than zero");
        Ok(())
    }
}
