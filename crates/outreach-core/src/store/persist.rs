//! On-disk format and atomic writes for the contact store.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ContactKey, ContactRecord, StoreError};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    contacts: BTreeMap<ContactKey, ContactRecord>,
}

/// Load the record map. A missing file is an empty store.
pub(crate) fn load(path: &Path) -> Result<BTreeMap<ContactKey, ContactRecord>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let file: StoreFile =
        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    // The key lives in the map; restore it on each record.
    Ok(file
        .contacts
        .into_iter()
        .map(|(key, mut record)| {
            record.key = key.clone();
            (key, record)
        })
        .collect())
}

pub(crate) fn save(
    path: &Path,
    records: &BTreeMap<ContactKey, ContactRecord>,
) -> Result<(), StoreError> {
    let file = StoreFile {
        version: FORMAT_VERSION,
        contacts: records.clone(),
    };
    let json = serde_json::to_vec_pretty(&file)?;
    write_atomic(path, &json)
}

/// Replace `path` with `data` in one rename; readers see old or new, never half.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    temp.write_all(data).map_err(|e| StoreError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metadata;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = load(&dir.path().join("contacts.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn save_then_load_restores_keys_and_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("contacts.json");

        let key = ContactKey::new("https://x.com/in/a");
        let mut record = ContactRecord::new(key.clone());
        let mut meta = Metadata::new();
        meta.insert("campaign".into(), "q4".into());
        meta.insert("variant".into(), serde_json::json!(2));
        record.record_send(1_700_000_000.123456, true, meta);
        record.block("declined");

        let mut records = BTreeMap::new();
        records.insert(key.clone(), record.clone());
        save(&path, &records).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.get(&key), Some(&record));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("contacts.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load(&path), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // no temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
