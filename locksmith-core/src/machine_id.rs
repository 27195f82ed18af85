//! Machine identity lookup.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::MachineId;

/// Location of the machine id relative to a filesystem root.
pub const MACHINE_ID_PATH: &str = "etc/machine-id";

pub fn machine_id_path(root: &Path) -> PathBuf {
    root.join(MACHINE_ID_PATH)
}

/// Read the machine id below `root` (normally `/`).
pub fn read_machine_id(root: &Path) -> Result<MachineId, ConfigError> {
    let path = machine_id_path(root);
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::MachineIdIo {
        path: path.clone(),
        source,
    })?;
    let id = raw.trim();
    if id.is_empty() {
        return Err(ConfigError::MachineIdEmpty { path });
    }
    Ok(MachineId::from(id))
}
