//! Section list store.
//!
//! # Responsibility
//! - Own the ordered list of section names and its persistence.
//! - Cascade item and backup keys when a section is deleted or renamed.
//!
//! # Invariants
//! - No two sections share a name at any time; uniqueness is enforced on add
//!   and on rename.
//! - Every mutation persists the full list, mirrors it into the shadow
//!   backup, then commits to memory — in that order.
//! - A failed primary write leaves the in-memory list at its pre-mutation
//!   value.

use crate::clock::Clock;
use crate::config::StoreKeys;
use crate::repo::kv_store::KeyValueStore;
use crate::store::backup::BackupChannel;
use crate::store::{StoreError, StoreResult};
use log::{error, info, warn};

/// Ordered list of section names, newest-first on insert.
pub struct SectionStore<'a, S: KeyValueStore> {
    kv: &'a S,
    keys: &'a StoreKeys,
    clock: &'a dyn Clock,
    sections: Vec<String>,
    loading: bool,
}

impl<'a, S: KeyValueStore> SectionStore<'a, S> {
    /// Creates a store with an empty cache; call [`load`](Self::load) before
    /// reading sections.
    pub fn new(kv: &'a S, keys: &'a StoreKeys, clock: &'a dyn Clock) -> Self {
        Self {
            kv,
            keys,
            clock,
            sections: Vec::new(),
            loading: false,
        }
    }

    /// Current in-memory section list.
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Reads the section list from the store into memory.
    ///
    /// An absent or malformed list loads as empty; transport failures
    /// propagate.
    pub fn load(&mut self) -> StoreResult<()> {
        self.loading = true;
        let result = self.read_persisted_list();
        self.loading = false;

        self.sections = result?;
        Ok(())
    }

    /// Forces a re-read from the store, used after out-of-band mutation such
    /// as an archive import.
    pub fn refresh(&mut self) -> StoreResult<()> {
        self.load()
    }

    /// Prepends a new section name.
    ///
    /// # Errors
    /// - [`StoreError::EmptyName`] when `name` trims to nothing.
    /// - [`StoreError::NameCollision`] when the name is already taken.
    pub fn add_section(&mut self, name: &str) -> StoreResult<()> {
        let name = valid_section_name(name)?;
        if self.sections.iter().any(|existing| existing == &name) {
            return Err(StoreError::NameCollision(name));
        }

        let mut next = Vec::with_capacity(self.sections.len() + 1);
        next.push(name.clone());
        next.extend(self.sections.iter().cloned());

        self.persist_list(&next)?;
        self.backup_channel()
            .create_backup(&self.keys.sections_backup_key(), &next);
        self.sections = next;

        info!(
            "event=section_add module=store status=ok count={}",
            self.sections.len()
        );
        Ok(())
    }

    /// Removes a section together with its items and their backup.
    ///
    /// The list write is the primary operation; once it succeeds the section
    /// is gone even if the item-key cleanup fails afterwards. Cleanup failure
    /// is logged distinctly and surfaced as [`StoreError::CleanupFailed`].
    pub fn delete_section(&mut self, name: &str) -> StoreResult<()> {
        if !self.sections.iter().any(|existing| existing == name) {
            return Err(StoreError::SectionNotFound(name.to_string()));
        }

        let next: Vec<String> = self
            .sections
            .iter()
            .filter(|existing| existing.as_str() != name)
            .cloned()
            .collect();

        self.persist_list(&next)?;
        self.backup_channel()
            .create_backup(&self.keys.sections_backup_key(), &next);

        let cleanup = self
            .kv
            .remove(&self.keys.items_key(name))
            .and_then(|()| self.kv.remove(&self.keys.items_backup_key(name)));

        // The persisted list no longer contains the section; memory follows
        // it regardless of the cleanup outcome.
        self.sections = next;

        if let Err(err) = cleanup {
            error!(
                "event=section_delete module=store status=partial section_count={} error={err}",
                self.sections.len()
            );
            return Err(StoreError::CleanupFailed {
                section: name.to_string(),
                source: err,
            });
        }

        info!(
            "event=section_delete module=store status=ok count={}",
            self.sections.len()
        );
        Ok(())
    }

    /// Renames a section in place, migrating its item partition to the new
    /// key and deleting the old one.
    ///
    /// # Errors
    /// - [`StoreError::EmptyName`] when `new_name` trims to nothing.
    /// - [`StoreError::NameCollision`] when `new_name` is already present.
    /// - [`StoreError::SectionNotFound`] when `old_name` is not present.
    pub fn rename_section(&mut self, old_name: &str, new_name: &str) -> StoreResult<()> {
        let new_name = valid_section_name(new_name)?;
        if self.sections.iter().any(|existing| existing == &new_name) {
            return Err(StoreError::NameCollision(new_name));
        }
        let position = self
            .sections
            .iter()
            .position(|existing| existing == old_name)
            .ok_or_else(|| StoreError::SectionNotFound(old_name.to_string()))?;

        let mut next = self.sections.clone();
        next[position] = new_name.clone();
        self.persist_list(&next)?;

        // Migrate the item partition verbatim; no entry is altered. Sections
        // without stored items skip the copy entirely.
        if let Some(raw_items) = self.kv.get(&self.keys.items_key(old_name))? {
            self.kv.set(&self.keys.items_key(&new_name), &raw_items)?;
            match serde_json::from_str::<serde_json::Value>(&raw_items) {
                Ok(items_value) => {
                    self.backup_channel()
                        .create_backup(&self.keys.items_backup_key(&new_name), &items_value);
                }
                Err(err) => {
                    warn!(
                        "event=section_rename module=store status=degraded error_code=items_decode_failed error={err}"
                    );
                }
            }
            self.kv.remove(&self.keys.items_key(old_name))?;
            self.kv.remove(&self.keys.items_backup_key(old_name))?;
        }

        self.backup_channel()
            .create_backup(&self.keys.sections_backup_key(), &next);
        self.sections = next;

        info!("event=section_rename module=store status=ok");
        Ok(())
    }

    fn read_persisted_list(&self) -> StoreResult<Vec<String>> {
        match self.kv.get(&self.keys.sections_key)? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => Ok(list),
                Err(err) => {
                    warn!(
                        "event=section_load module=store status=degraded error_code=decode_failed error={err}"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    fn persist_list(&self, list: &[String]) -> StoreResult<()> {
        let text = serde_json::to_string(list)?;
        self.kv.set(&self.keys.sections_key, &text)?;
        Ok(())
    }

    fn backup_channel(&self) -> BackupChannel<'a, S> {
        BackupChannel::new(self.kv, self.keys, self.clock)
    }
}

fn valid_section_name(name: &str) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(trimmed.to_string())
}
