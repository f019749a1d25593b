use std::{fs, io::ErrorKind, path::PathBuf};

use timetemp_common::{ByteStorage, StoreError};

/// EEPROM emulated by an image file.
///
/// The image is read once on open; a missing file is blank storage. Writes stay in
/// memory until `commit` replaces the file through a temporary sibling. Both touch
/// the disk synchronously, so async callers go through `spawn_blocking`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>, size: usize) -> std::io::Result<Self> {
        let path = path.into();
        let mut bytes = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err),
        };
        bytes.resize(size, 0);

        Ok(Self { path, bytes })
    }
}

impl ByteStorage for FileStorage {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, address: usize) -> u8 {
        self.bytes.get(address).copied().unwrap_or(0)
    }

    fn write(&mut self, address: usize, value: u8) {
        if let Some(slot) = self.bytes.get_mut(address) {
            *slot = value;
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, &self.bytes)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use timetemp_common::{ConfigStore, LoadOrigin, ScheduleSet, ScheduleWindow};

    use super::*;

    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("timetemp-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_image_opens_blank() {
        let dir = scratch_dir("eeprom-blank");
        let path = dir.join("eeprom.bin");
        let storage = FileStorage::open(&path, 32).unwrap();

        assert_eq!(storage.capacity(), 32);
        assert!((0..32).all(|address| storage.read(address) == 0));
        assert!(!path.exists());
    }

    #[test]
    fn commit_persists_across_reopen() {
        let dir = scratch_dir("eeprom-reopen");
        let path = dir.join("nested").join("eeprom.bin");
        let schedule = ScheduleSet {
            day: ScheduleWindow::new(0, 15, 16, 19),
            night: ScheduleWindow::new(22, 30, 9, 11),
        };

        let mut store = ConfigStore::new(FileStorage::open(&path, 64).unwrap()).unwrap();
        store.save(&schedule).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.len(), 64);
        assert_eq!(&raw[..4], &[0, 0, 0, 15]);

        let mut reopened = ConfigStore::new(FileStorage::open(&path, 64).unwrap()).unwrap();
        let loaded = reopened.load(&ScheduleSet::default());
        assert_eq!(loaded.origin, LoadOrigin::Stored);
        assert_eq!(loaded.schedule, schedule);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn short_image_is_padded_to_size() {
        let dir = scratch_dir("eeprom-short");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("eeprom.bin");
        fs::write(&path, [0, 7]).unwrap();

        let storage = FileStorage::open(&path, 18).unwrap();

        assert_eq!(storage.capacity(), 18);
        assert_eq!(storage.read(1), 7);
        assert_eq!(storage.read(17), 0);

        let _ = fs::remove_dir_all(&dir);
    }
}
