//! Record Store — sole owner of the canonical [`Record`].
//!
//! Mutations never fail loudly. An edit aimed at an ordinal that no longer
//! exists (or a field outside the section's shape) is a stale address: it is
//! logged and dropped, and the store stays clean so nothing re-renders.

use tracing::debug;

use crate::models::{Record, ScalarKey, Section};

#[derive(Debug, Default)]
pub struct RecordStore {
    record: Record,
    revision: u64,
    dirty: bool,
}

impl RecordStore {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            revision: 0,
            dirty: false,
        }
    }

    /// Read-only view for the renderer and the binder.
    pub fn get(&self) -> &Record {
        &self.record
    }

    /// Incremented once per applied mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clears and returns the dirty flag. The pipeline calls this once per
    /// command to decide whether to render and persist.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn set_scalar(&mut self, key: ScalarKey, value: impl Into<String>) {
        *self.record.scalar_mut(key) = value.into();
        self.touch();
    }

    /// Sets one field of one entry. Returns `false` (and changes nothing) for
    /// a stale ordinal or a field outside the section's shape.
    pub fn set_entry_field(
        &mut self,
        section: Section,
        ordinal: usize,
        field: &str,
        value: impl Into<String>,
    ) -> bool {
        if self
            .record
            .write_entry_field(section, ordinal, field, value.into())
        {
            self.touch();
            true
        } else {
            debug!(
                section = section.key(),
                ordinal,
                field,
                len = self.record.len(section),
                "Ignoring edit for stale field address"
            );
            false
        }
    }

    /// Pushes a blank entry with the section's shape and returns its ordinal.
    pub fn append_entry(&mut self, section: Section) -> usize {
        let ordinal = self.record.push_blank(section);
        self.touch();
        ordinal
    }

    /// Removes the entry at `ordinal`; later entries shift down by one.
    pub fn remove_entry(&mut self, section: Section, ordinal: usize) -> bool {
        if self.record.splice_out(section, ordinal) {
            self.touch();
            true
        } else {
            debug!(
                section = section.key(),
                ordinal, "Ignoring removal of stale ordinal"
            );
            false
        }
    }

    /// Replaces the whole record (reload, reset).
    pub fn replace(&mut self, record: Record) {
        self.record = record;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_clean() {
        let mut store = RecordStore::new(Record::default());
        assert!(!store.take_dirty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_set_scalar_marks_dirty() {
        let mut store = RecordStore::default();
        store.set_scalar(ScalarKey::Email, "a@b.c");
        assert_eq!(store.get().personal_details.email, "a@b.c");
        assert!(store.take_dirty());
        assert!(!store.take_dirty(), "take_dirty must clear the flag");
    }

    #[test]
    fn test_stale_ordinal_is_silent_noop() {
        let mut store = RecordStore::default();
        store.append_entry(Section::Skills);
        store.take_dirty();
        let before = store.get().clone();
        let revision = store.revision();

        assert!(!store.set_entry_field(Section::Skills, 5, "skill", "Go"));
        assert_eq!(store.get(), &before);
        assert_eq!(store.revision(), revision);
        assert!(!store.take_dirty());
    }

    #[test]
    fn test_unknown_field_is_treated_as_stale() {
        let mut store = RecordStore::default();
        store.append_entry(Section::Education);
        store.take_dirty();
        assert!(!store.set_entry_field(Section::Education, 0, "company", "Acme"));
        assert!(!store.take_dirty());
    }

    #[test]
    fn test_append_returns_ordinals_in_order() {
        let mut store = RecordStore::default();
        assert_eq!(store.append_entry(Section::Projects), 0);
        assert_eq!(store.append_entry(Section::Projects), 1);
        assert_eq!(store.get().projects.len(), 2);
    }

    #[test]
    fn test_remove_shifts_later_entries_down() {
        let mut store = RecordStore::default();
        for name in ["A", "B", "C"] {
            let i = store.append_entry(Section::Certifications);
            store.set_entry_field(Section::Certifications, i, "name", name);
        }
        assert!(store.remove_entry(Section::Certifications, 1));
        let names: Vec<_> = store
            .get()
            .certifications
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert!(!store.remove_entry(Section::Certifications, 2));
    }
}
