//! Collection Index Manager — the explicit mapping from entry position to
//! field addresses for every repeatable section.
//!
//! # Rules
//! - Append builds exactly one new group of addresses. Existing groups and
//!   the section generation are untouched, so live controls stay valid.
//! - Remove-at(i) tears down EVERY address of the section and rebuilds the
//!   whole table for `len - 1` entries under a new generation. Controls that
//!   were issued before the removal no longer resolve, even when their
//!   ordinal happens to still be in range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{FieldAddress, Record, Section};

/// Identity of one rendered control: the address it was bound to plus the
/// section generation it was bound under. Scalar controls are always
/// generation 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlId {
    pub address: FieldAddress,
    #[serde(default)]
    pub generation: u64,
}

impl ControlId {
    pub fn scalar(address: FieldAddress) -> Self {
        Self {
            address,
            generation: 0,
        }
    }
}

/// The per-entry "remove" affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoveControl {
    pub section: Section,
    pub ordinal: usize,
    pub generation: u64,
}

/// What a structural change requires of the field binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralPlan {
    /// Build one group for the new entry at `ordinal`.
    Append {
        section: Section,
        ordinal: usize,
        build: Vec<FieldAddress>,
    },
    /// Discard every address in `teardown` and rebuild all groups.
    Rebuild {
        section: Section,
        removed: usize,
        teardown: Vec<FieldAddress>,
        build: Vec<Vec<FieldAddress>>,
    },
}

#[derive(Debug, Clone, Default)]
struct SectionTable {
    generation: u64,
    groups: Vec<Vec<FieldAddress>>,
}

#[derive(Debug, Clone)]
pub struct CollectionIndex {
    tables: BTreeMap<Section, SectionTable>,
}

impl Default for CollectionIndex {
    fn default() -> Self {
        Self {
            tables: Section::ALL
                .iter()
                .map(|&s| (s, SectionTable::default()))
                .collect(),
        }
    }
}

/// Addresses of every field of the entry at `ordinal`, in shape order.
pub fn group_addresses(section: Section, ordinal: usize) -> Vec<FieldAddress> {
    section
        .shape()
        .iter()
        .map(|spec| FieldAddress::Entry {
            section,
            ordinal,
            field: spec.name,
        })
        .collect()
}

fn table_for(section: Section, len: usize) -> Vec<Vec<FieldAddress>> {
    (0..len).map(|i| group_addresses(section, i)).collect()
}

impl CollectionIndex {
    pub fn from_record(record: &Record) -> Self {
        let mut index = Self::default();
        index.sync_all(record);
        index
    }

    pub fn len(&self, section: Section) -> usize {
        self.table(section).groups.len()
    }

    pub fn generation(&self, section: Section) -> u64 {
        self.table(section).generation
    }

    pub fn groups(&self, section: Section) -> &[Vec<FieldAddress>] {
        &self.table(section).groups
    }

    pub fn plan_append(&self, section: Section) -> StructuralPlan {
        let ordinal = self.len(section);
        StructuralPlan::Append {
            section,
            ordinal,
            build: group_addresses(section, ordinal),
        }
    }

    /// `None` when `ordinal` is not a current entry.
    pub fn plan_remove(&self, section: Section, ordinal: usize) -> Option<StructuralPlan> {
        let table = self.table(section);
        if ordinal >= table.groups.len() {
            return None;
        }
        Some(StructuralPlan::Rebuild {
            section,
            removed: ordinal,
            teardown: table.groups.iter().flatten().cloned().collect(),
            build: table_for(section, table.groups.len() - 1),
        })
    }

    pub fn commit(&mut self, plan: StructuralPlan) {
        match plan {
            StructuralPlan::Append {
                section,
                ordinal,
                build,
            } => {
                let table = self.table_mut(section);
                if ordinal == table.groups.len() {
                    table.groups.push(build);
                } else {
                    // The plan was computed against a different length; fall
                    // back to a full rebuild rather than patching.
                    table.generation += 1;
                    table.groups = table_for(section, ordinal + 1);
                }
            }
            StructuralPlan::Rebuild {
                section,
                removed,
                teardown,
                build,
            } => {
                debug!(
                    section = section.key(),
                    removed,
                    torn_down = teardown.len(),
                    rebuilt = build.len(),
                    "Rebuilding section addresses"
                );
                let table = self.table_mut(section);
                table.generation += 1;
                table.groups = build;
            }
        }
    }

    /// Rebuilds one section's table for `len` entries under a new generation.
    pub fn sync(&mut self, section: Section, len: usize) {
        let table = self.table_mut(section);
        table.generation += 1;
        table.groups = table_for(section, len);
    }

    pub fn sync_all(&mut self, record: &Record) {
        for section in Section::ALL {
            self.sync(section, record.len(section));
        }
    }

    /// Resolves a control to the address it may currently write to.
    pub fn resolve(&self, control: &ControlId) -> Option<FieldAddress> {
        match &control.address {
            FieldAddress::Scalar(_) => Some(control.address.clone()),
            FieldAddress::Entry {
                section, ordinal, ..
            } => {
                let table = self.table(*section);
                (table.generation == control.generation && *ordinal < table.groups.len())
                    .then(|| control.address.clone())
            }
        }
    }

    pub fn resolve_remove(&self, control: &RemoveControl) -> Option<usize> {
        let table = self.table(control.section);
        (table.generation == control.generation && control.ordinal < table.groups.len())
            .then_some(control.ordinal)
    }

    fn table(&self, section: Section) -> &SectionTable {
        // Every section is seeded in `Default`.
        &self.tables[&section]
    }

    fn table_mut(&mut self, section: Section) -> &mut SectionTable {
        self.tables.entry(section).or_default()
    }
}
