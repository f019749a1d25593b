use thiserror::Error;

use crate::schedule::ScheduleSet;

pub const FIELD_COUNT: usize = 8;
pub const SCHEDULE_LEN: usize = FIELD_COUNT * 2;
pub const MARKER_OFFSET: usize = SCHEDULE_LEN;
pub const MARKER: [u8; 2] = *b"TT";
pub const MARKED_LEN: usize = MARKER_OFFSET + MARKER.len();

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage region holds {capacity} bytes, at least {required} required")]
    TooSmall { capacity: usize, required: usize },
    #[error("storage commit failed: {0}")]
    Io(#[from] std::io::Error),
}

// Writes land in a working copy until `commit` makes the whole region durable.
pub trait ByteStorage {
    fn capacity(&self) -> usize;
    fn read(&self, address: usize) -> u8;
    fn write(&mut self, address: usize, value: u8);
    fn commit(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
    commits: usize,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            commits: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl ByteStorage for MemoryStorage {
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
        self.commits += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Stored,
    Initialized,
    // Fields predate the marker; kept, marker added.
    Migrated,
}

#[derive(Debug)]
pub struct Loaded {
    pub schedule: ScheduleSet,
    pub origin: LoadOrigin,
    // Set when the write-back for `Initialized`/`Migrated` did not commit.
    pub commit_error: Option<StoreError>,
}

#[derive(Debug)]
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: ByteStorage> ConfigStore<S> {
    pub fn new(storage: S) -> Result<Self, StoreError> {
        let capacity = storage.capacity();
        if capacity < SCHEDULE_LEN {
            return Err(StoreError::TooSmall {
                capacity,
                required: SCHEDULE_LEN,
            });
        }
        Ok(Self { storage })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    // 16 or 17 byte regions rely on the zero day-hour sentinel alone.
    pub fn uses_marker(&self) -> bool {
        self.storage.capacity() >= MARKED_LEN
    }

    pub fn load(&mut self, defaults: &ScheduleSet) -> Loaded {
        if self.has_marker() {
            return self.loaded(LoadOrigin::Stored, None);
        }

        if self.read_field(0) == 0 {
            let commit_error = self.save(defaults).err();
            return self.loaded(LoadOrigin::Initialized, commit_error);
        }

        if !self.uses_marker() {
            return self.loaded(LoadOrigin::Stored, None);
        }

        self.write_marker();
        let commit_error = self.storage.commit().err();
        self.loaded(LoadOrigin::Migrated, commit_error)
    }

    // Fields first, then the marker, then a single commit.
    pub fn save(&mut self, schedule: &ScheduleSet) -> Result<(), StoreError> {
        for (index, value) in schedule.to_fields().into_iter().enumerate() {
            self.write_field(index * 2, value);
        }
        if self.uses_marker() {
            self.write_marker();
        }
        self.storage.commit()
    }

    fn loaded(&self, origin: LoadOrigin, commit_error: Option<StoreError>) -> Loaded {
        Loaded {
            schedule: self.read_schedule(),
            origin,
            commit_error,
        }
    }

    fn has_marker(&self) -> bool {
        self.uses_marker()
            && self.storage.read(MARKER_OFFSET) == MARKER[0]
            && self.storage.read(MARKER_OFFSET + 1) == MARKER[1]
    }

    fn write_marker(&mut self) {
        self.storage.write(MARKER_OFFSET, MARKER[0]);
        self.storage.write(MARKER_OFFSET + 1, MARKER[1]);
    }

    fn read_schedule(&self) -> ScheduleSet {
        let mut fields = [0i16; FIELD_COUNT];
        for (index, field) in fields.iter_mut().enumerate() {
            *field = self.read_field(index * 2);
        }
        ScheduleSet::from_fields(fields)
    }

    fn read_field(&self, address: usize) -> i16 {
        i16::from_be_bytes([self.storage.read(address), self.storage.read(address + 1)])
    }

    fn write_field(&mut self, address: usize, value: i16) {
        let [high, low] = value.to_be_bytes();
        self.storage.write(address, high);
        self.storage.write(address + 1, low);
    }
}
