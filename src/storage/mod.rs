pub mod layout;
pub mod mmap_barrel;
pub mod lsm_barrel;

use std::fs;
use std::path::Path;
use serde::Serialize;
use crate::core::error::Result;

/// Write-then-rename so readers never observe a half-written file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, serde_json::to_vec(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Atomic write of a crc-guarded binary blob: 4-byte LE crc32 + payload.
pub(crate) fn write_blob_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let crc = crc32fast::hash(payload);
    let mut bytes = Vec::with_capacity(payload.len() + 4);
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(payload);

    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a crc-guarded blob; crc mismatch is reported as `Corrupt`.
pub(crate) fn read_blob(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 4 {
        return Err(crate::core::error::Error::corrupt(format!(
            "blob {} truncated",
            path.display()
        )));
    }
    let stored = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let payload = &bytes[4..];
    if crc32fast::hash(payload) != stored {
        return Err(crate::core::error::Error::corrupt(format!(
            "blob {} checksum mismatch",
            path.display()
        )));
    }
    Ok(payload.to_vec())
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    std::path::PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip_and_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");

        write_blob_atomic(&path, b"payload").unwrap();
        assert_eq!(read_blob(&path).unwrap(), b"payload");

        // Flip a payload byte; the checksum must catch it.
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();
        assert!(read_blob(&path).is_err());
    }
}
