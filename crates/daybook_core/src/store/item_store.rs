//! Per-section entry store.
//!
//! # Responsibility
//! - Own the ordered entry list for one section and its persistence.
//! - Assign stable creation-timestamp ids.
//!
//! # Invariants
//! - Ids are unique within the section at creation time; an id collision
//!   bumps until free. An entry's id never changes after creation.
//! - Every mutation persists the full list, mirrors it into the shadow
//!   backup, then commits to memory — in that order.
//! - A failed primary write leaves the in-memory list at its pre-mutation
//!   value.

use crate::clock::{to_iso_millis, Clock};
use crate::config::StoreKeys;
use crate::model::entry::Entry;
use crate::repo::kv_store::KeyValueStore;
use crate::store::backup::BackupChannel;
use crate::store::{StoreError, StoreResult};
use log::{info, warn};

/// Ordered entry list scoped to one section name, newest-first on insert.
pub struct ItemStore<'a, S: KeyValueStore> {
    kv: &'a S,
    keys: &'a StoreKeys,
    clock: &'a dyn Clock,
    section: String,
    items: Vec<Entry>,
    loading: bool,
}

impl<'a, S: KeyValueStore> ItemStore<'a, S> {
    /// Creates a store scoped to `section` with an empty cache; call
    /// [`load`](Self::load) before reading items.
    pub fn new(
        kv: &'a S,
        keys: &'a StoreKeys,
        clock: &'a dyn Clock,
        section: impl Into<String>,
    ) -> Self {
        Self {
            kv,
            keys,
            clock,
            section: section.into(),
            items: Vec::new(),
            loading: false,
        }
    }

    /// Section this store is currently scoped to.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Current in-memory entry list.
    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Re-scopes the store to another section and reloads when the name
    /// actually changes.
    pub fn set_section(&mut self, section: impl Into<String>) -> StoreResult<()> {
        let section = section.into();
        if section == self.section {
            return Ok(());
        }
        self.section = section;
        self.load()
    }

    /// Reads the section's entries from the store into memory.
    ///
    /// An absent or malformed list loads as empty; transport failures
    /// propagate.
    pub fn load(&mut self) -> StoreResult<()> {
        self.loading = true;
        let result = self.read_persisted_items();
        self.loading = false;

        self.items = result?;
        Ok(())
    }

    /// Forces a re-read from the store, used after out-of-band mutation such
    /// as an archive import.
    pub fn refresh(&mut self) -> StoreResult<()> {
        self.load()
    }

    /// Creates an entry at the head of the list and returns it.
    pub fn add_item(&mut self, text: &str) -> StoreResult<Entry> {
        let now = self.clock.now();
        let mut id = now.timestamp_millis();
        while self.items.iter().any(|entry| entry.id == id) {
            id += 1;
        }

        let entry = Entry::new(id, text, to_iso_millis(now));
        let mut next = Vec::with_capacity(self.items.len() + 1);
        next.push(entry.clone());
        next.extend(self.items.iter().cloned());

        self.persist_and_backup(&next)?;
        self.items = next;

        info!(
            "event=item_add module=store status=ok count={}",
            self.items.len()
        );
        Ok(entry)
    }

    /// Replaces the text of the entry at `index` and refreshes its
    /// `last_modified` timestamp. The id never changes.
    pub fn update_item(&mut self, index: usize, text: &str) -> StoreResult<()> {
        self.check_index(index)?;

        let mut next = self.items.clone();
        next[index].edit(text, to_iso_millis(self.clock.now()));

        self.persist_and_backup(&next)?;
        self.items = next;

        info!("event=item_update module=store status=ok index={index}");
        Ok(())
    }

    /// Removes the entry at `index`.
    pub fn delete_item(&mut self, index: usize) -> StoreResult<()> {
        self.check_index(index)?;

        let mut next = self.items.clone();
        next.remove(index);

        self.persist_and_backup(&next)?;
        self.items = next;

        info!(
            "event=item_delete module=store status=ok count={}",
            self.items.len()
        );
        Ok(())
    }

    /// Removes every entry in the section.
    pub fn clear_all_items(&mut self) -> StoreResult<()> {
        let next: Vec<Entry> = Vec::new();

        self.persist_and_backup(&next)?;
        self.items = next;

        info!("event=item_clear module=store status=ok");
        Ok(())
    }

    fn check_index(&self, index: usize) -> StoreResult<()> {
        if index >= self.items.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    fn read_persisted_items(&self) -> StoreResult<Vec<Entry>> {
        match self.kv.get(&self.keys.items_key(&self.section))? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str::<Vec<Entry>>(&raw) {
                Ok(items) => Ok(items),
                Err(err) => {
                    warn!(
                        "event=item_load module=store status=degraded section_key={} error_code=decode_failed error={err}",
                        self.keys.items_key(&self.section)
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    fn persist_and_backup(&self, items: &[Entry]) -> StoreResult<()> {
        let text = serde_json::to_string(items)?;
        self.kv.set(&self.keys.items_key(&self.section), &text)?;
        BackupChannel::new(self.kv, self.keys, self.clock)
            .create_backup(&self.keys.items_backup_key(&self.section), &items);
        Ok(())
    }
}
