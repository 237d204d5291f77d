//! Fixed-capacity record storage.
//!
//! Records live in a generational arena: a [`RecordId`] is an index plus
//! the generation the slot carried when the record was created, so ids
//! held across a remove or eviction go stale instead of dangling.
//! Iteration follows insertion order, which lookup and eviction rely on
//! for deterministic tie-breaking.

use tracing::debug;

use crate::record::{DeviceRecord, SecurityFlags};

/// Generation-tagged reference to a record in a [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    record: Option<DeviceRecord>,
}

/// Arena of device records with an insertion-order index and a fixed
/// capacity enforced by evicting the oldest record.
#[derive(Debug)]
pub struct RecordStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<RecordId>,
    next_timestamp: u32,
    max_records: usize,
}

impl RecordStore {
    /// Creates an empty store that evicts once `max_records` is exceeded.
    pub fn new(max_records: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            next_timestamp: 0,
            max_records,
        }
    }

    /// Current number of live records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Generation-checked access to a record.
    pub fn get(&self, id: RecordId) -> Option<&DeviceRecord> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    /// Generation-checked mutable access to a record.
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut DeviceRecord> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    /// Iterates live records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &DeviceRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.get(*id).map(|record| (*id, record)))
    }

    /// Snapshot of live record ids in insertion order, for loops that
    /// remove records while scanning.
    pub fn ids(&self) -> Vec<RecordId> {
        self.order.clone()
    }

    /// Allocates a fresh record, evicting the oldest one first when the
    /// record cap is already exceeded.
    ///
    /// The new record starts in use, unbonded, with the next timestamp
    /// and no connection handles.
    pub fn allocate(&mut self) -> RecordId {
        if self.order.len() > self.max_records {
            if let Some(victim) = self.find_oldest() {
                debug!(id = ?victim, "record cap exceeded, evicting oldest record");
                self.remove(victim);
            }
        }

        let record = DeviceRecord {
            sec_flags: SecurityFlags::IN_USE,
            timestamp: self.bump_timestamp(),
            ..Default::default()
        };

        let id = match self.free.pop() {
            Some(index) => match self.slots.get_mut(index as usize) {
                Some(slot) => {
                    slot.record = Some(record);
                    RecordId {
                        index,
                        generation: slot.generation,
                    }
                }
                None => self.push_slot(record),
            },
            None => self.push_slot(record),
        };
        self.order.push(id);
        id
    }

    /// Wipes the record's secret material and frees its slot. Returns
    /// false if the id is already stale.
    pub fn remove(&mut self, id: RecordId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return false;
        };
        if slot.generation != id.generation {
            return false;
        }
        let Some(record) = slot.record.as_mut() else {
            return false;
        };

        record.wipe_secrets();
        slot.record = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.retain(|other| *other != id);
        true
    }

    /// Refreshes a record's timestamp to the next counter value.
    pub fn touch(&mut self, id: RecordId) {
        let stamp = self.bump_timestamp();
        if let Some(record) = self.get_mut(id) {
            record.timestamp = stamp;
        }
    }

    /// Picks the eviction victim: the oldest record without a link key on
    /// either transport, or the oldest record outright when everything
    /// is paired.
    pub fn find_oldest(&self) -> Option<RecordId> {
        let mut oldest: Option<(RecordId, u32)> = None;
        let mut oldest_paired: Option<(RecordId, u32)> = None;

        for (id, record) in self.iter() {
            let slot = if record.is_paired() {
                &mut oldest_paired
            } else {
                &mut oldest
            };
            if slot.is_none_or(|(_, stamp)| record.timestamp < stamp) {
                *slot = Some((id, record.timestamp));
            }
        }

        // Paired records are only sacrificed when nothing unpaired is left.
        oldest.or(oldest_paired).map(|(id, _)| id)
    }

    fn push_slot(&mut self, record: DeviceRecord) -> RecordId {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        RecordId {
            index,
            generation: 0,
        }
    }

    fn bump_timestamp(&mut self) -> u32 {
        let stamp = self.next_timestamp;
        self.next_timestamp = self.next_timestamp.wrapping_add(1);
        stamp
    }
}
