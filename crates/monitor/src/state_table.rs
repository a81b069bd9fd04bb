//! In-memory alert state, one lock per target.
//!
//! The table maps each [`TargetKey`] to an `Arc<Mutex<AlertRecord>>`. A tick
//! holds the record lock across transition and persistence, so two updates
//! for the same key never interleave while different keys proceed in
//! parallel. Structural changes (removal, reset) take the table's write lock
//! and then the affected record locks, which waits out any in-flight
//! transition before the store is touched.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use vigil_core::{AlertRecord, TargetKey};

pub type RecordSlot = Arc<Mutex<AlertRecord>>;

pub struct AlertStateTable {
    slots: RwLock<HashMap<TargetKey, RecordSlot>>,
}

impl AlertStateTable {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// The slot for `key`, creating it from `load` on first use.
    ///
    /// `load` runs under the table's write lock, so concurrent callers for
    /// the same key share one slot.
    pub async fn slot_or_load<F, Fut, E>(&self, key: &TargetKey, load: F) -> Result<RecordSlot, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AlertRecord, E>>,
    {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Ok(slot.clone());
        }

        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(key) {
            return Ok(slot.clone());
        }
        let record = load().await?;
        let slot = Arc::new(Mutex::new(record));
        slots.insert(key.clone(), slot.clone());
        Ok(slot)
    }

    /// Install persisted records, overwriting any slot with the same key.
    ///
    /// Returns the number of records loaded.
    pub async fn load(&self, records: Vec<AlertRecord>) -> usize {
        let mut slots = self.slots.write().await;
        let count = records.len();
        for record in records {
            match slots.get(&record.key) {
                Some(slot) => *slot.lock().await = record,
                None => {
                    slots.insert(record.key.clone(), Arc::new(Mutex::new(record)));
                }
            }
        }
        count
    }

    /// Drop the slot for `key` once any in-flight transition on it has
    /// finished and `purge` has succeeded.
    ///
    /// The slot stays in place if `purge` fails.
    pub async fn remove_with<F, Fut, E>(&self, key: &TargetKey, purge: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut slots = self.slots.write().await;
        match slots.get(key).cloned() {
            Some(slot) => {
                let _guard = slot.lock().await;
                purge().await?;
                slots.remove(key);
            }
            None => purge().await?,
        }
        Ok(())
    }

    /// Drop the slot for `key` only if it is still `slot`.
    ///
    /// Returns whether a slot was removed. A slot created since `slot` was
    /// handed out is left alone.
    pub async fn remove_if_same(&self, key: &TargetKey, slot: &RecordSlot) -> bool {
        let mut slots = self.slots.write().await;
        match slots.get(key) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                slots.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Reset every record to Normal after `purge` succeeds.
    ///
    /// Every record lock is held while `purge` runs, so no transition can
    /// write stale state after the reset.
    pub async fn reset_with<F, Fut, E>(&self, purge: F) -> Result<usize, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let slots = self.slots.write().await;
        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots.values() {
            guards.push(slot.clone().lock_owned().await);
        }

        purge().await?;

        let mut reset = 0;
        for guard in guards.iter_mut() {
            if guard.is_alerting() {
                reset += 1;
            }
            let key = guard.key.clone();
            **guard = AlertRecord::normal(key);
        }
        Ok(reset)
    }

    /// Copy of every record, ordered by key.
    pub async fn snapshot(&self) -> Vec<AlertRecord> {
        let slots: Vec<RecordSlot> = self.slots.read().await.values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.clone());
        }
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    pub async fn get(&self, key: &TargetKey) -> Option<AlertRecord> {
        let slot = self.slots.read().await.get(key).cloned()?;
        let record = slot.lock().await.clone();
        Some(record)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

impl Default for AlertStateTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
