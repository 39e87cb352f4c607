// Per-install device identity, carried as the `origin` of every envelope.
// Format: "zonekeeper-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::storage::data_dir;

const DEVICE_ID_FILE: &str = "device_id.txt";
pub const DEVICE_ID_PREFIX: &str = "zonekeeper-";

#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid device ID format: {0}")]
    InvalidFormat(String),
}

/// Fresh id, not persisted. Used for in-memory peers.
pub fn ephemeral_device_id() -> String {
    format!("{DEVICE_ID_PREFIX}{}", Uuid::new_v4())
}

/// Read the device id stored under `dir`, creating it on first use.
pub fn get_or_create_device_id_at(dir: &Path) -> Result<String, DeviceIdError> {
    let path = dir.join(DEVICE_ID_FILE);

    if path.exists() {
        let device_id = fs::read_to_string(&path)?.trim().to_string();
        return if device_id.starts_with(DEVICE_ID_PREFIX) {
            Ok(device_id)
        } else {
            Err(DeviceIdError::InvalidFormat(device_id))
        };
    }

    let device_id = ephemeral_device_id();
    fs::create_dir_all(dir)?;
    let mut file = fs::File::create(&path)?;
    writeln!(file, "{device_id}")?;
    Ok(device_id)
}

/// Device id in the default data directory.
pub fn get_or_create_device_id() -> Result<String, DeviceIdError> {
    let dir = data_dir().map_err(|e| DeviceIdError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string())))?;
    get_or_create_device_id_at(&dir)
}
