//! Field Binder — builds the editable descriptors for the form and routes
//! control events into the [`RecordStore`].
//!
//! Descriptors for a section are never patched after a removal: the whole
//! section is rebuilt from the store under the index manager's new table.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::composer::index::{CollectionIndex, ControlId, RemoveControl, StructuralPlan};
use crate::composer::store::RecordStore;
use crate::models::{FieldAddress, Record, ScalarKey, Section, WidgetKind};
use crate::suggestion::SuggestionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub control: ControlId,
    pub label: &'static str,
    pub kind: WidgetKind,
    pub value: String,
    /// Long-text fields carry a "help me improve" trigger.
    pub suggestible: bool,
    /// State of that trigger, filled in by the composer for suggestible fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SuggestionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryGroup {
    pub ordinal: usize,
    pub fields: Vec<FieldDescriptor>,
    pub remove: RemoveControl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub title: &'static str,
    pub generation: u64,
    pub groups: Vec<EntryGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub scalars: Vec<FieldDescriptor>,
    pub profile_picture: String,
    pub sections: Vec<SectionView>,
}

impl FormView {
    /// Every descriptor of the form, scalars first.
    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldDescriptor> {
        self.scalars.iter_mut().chain(
            self.sections
                .iter_mut()
                .flat_map(|s| s.groups.iter_mut())
                .flat_map(|g| g.fields.iter_mut()),
        )
    }
}

fn describe(control: ControlId, record: &Record) -> FieldDescriptor {
    let value = match &control.address {
        FieldAddress::Scalar(key) => record.scalar(*key),
        FieldAddress::Entry {
            section,
            ordinal,
            field,
        } => record.entry_field(*section, *ordinal, field).unwrap_or_default(),
    }
    .to_string();
    let kind = control.address.kind();
    FieldDescriptor {
        label: control.address.label(),
        kind,
        value,
        suggestible: kind == WidgetKind::MultiLine,
        suggestion: None,
        control,
    }
}

fn build_group(
    section: Section,
    ordinal: usize,
    generation: u64,
    addresses: &[FieldAddress],
    record: &Record,
) -> EntryGroup {
    EntryGroup {
        ordinal,
        fields: addresses
            .iter()
            .map(|address| {
                describe(
                    ControlId {
                        address: address.clone(),
                        generation,
                    },
                    record,
                )
            })
            .collect(),
        remove: RemoveControl {
            section,
            ordinal,
            generation,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldBinder {
    scalars: Vec<FieldDescriptor>,
    sections: BTreeMap<Section, SectionView>,
}

impl FieldBinder {
    /// Binds every control of the form against the current store and index.
    pub fn bind_all(store: &RecordStore, index: &CollectionIndex) -> Self {
        let mut binder = Self::default();
        binder.render_scalars(store);
        for section in Section::ALL {
            binder.render(section, store, index);
        }
        binder
    }

    pub fn render_scalars(&mut self, store: &RecordStore) {
        self.scalars = ScalarKey::TEXT_FIELDS
            .iter()
            .map(|&key| describe(ControlId::scalar(FieldAddress::Scalar(key)), store.get()))
            .collect();
    }

    /// Rebuilds every descriptor of `section` from the store. Idempotent:
    /// with unchanged data the result is equal to the previous one.
    pub fn render(
        &mut self,
        section: Section,
        store: &RecordStore,
        index: &CollectionIndex,
    ) -> &SectionView {
        let generation = index.generation(section);
        let groups = index
            .groups(section)
            .iter()
            .enumerate()
            .map(|(ordinal, addresses)| {
                build_group(section, ordinal, generation, addresses, store.get())
            })
            .collect();
        let view = SectionView {
            section,
            title: section.title(),
            generation,
            groups,
        };
        self.sections.insert(section, view);
        &self.sections[&section]
    }

    /// Change handler for one control. Returns whether the store applied it.
    pub fn edit(
        &mut self,
        control: &ControlId,
        value: String,
        store: &mut RecordStore,
        index: &CollectionIndex,
    ) -> bool {
        let Some(address) = index.resolve(control) else {
            debug!(control = %control.address, generation = control.generation, "Dropping edit from stale control");
            return false;
        };
        let applied = match &address {
            FieldAddress::Scalar(key) => {
                store.set_scalar(*key, value.clone());
                true
            }
            FieldAddress::Entry {
                section,
                ordinal,
                field,
            } => store.set_entry_field(*section, *ordinal, field, value.clone()),
        };
        if applied {
            if let Some(descriptor) = self.descriptor_mut(control) {
                descriptor.value = value;
            }
        }
        applied
    }

    /// Appends a blank entry and builds its single group. Returns the ordinal.
    pub fn add(
        &mut self,
        section: Section,
        store: &mut RecordStore,
        index: &mut CollectionIndex,
    ) -> usize {
        let plan = index.plan_append(section);
        let ordinal = store.append_entry(section);
        let in_step = matches!(&plan, StructuralPlan::Append { ordinal: o, .. } if *o == ordinal);
        index.commit(plan);

        if in_step && self.sections.contains_key(&section) {
            let generation = index.generation(section);
            let group = build_group(
                section,
                ordinal,
                generation,
                &index.groups(section)[ordinal],
                store.get(),
            );
            if let Some(view) = self.sections.get_mut(&section) {
                view.groups.push(group);
            }
        } else {
            index.sync(section, store.get().len(section));
            self.render(section, store, index);
        }
        ordinal
    }

    /// Handles a remove affordance: plan the removal, splice the entry out,
    /// commit the new address table and rebuild the whole section.
    pub fn remove(
        &mut self,
        control: &RemoveControl,
        store: &mut RecordStore,
        index: &mut CollectionIndex,
    ) -> bool {
        let Some(ordinal) = index.resolve_remove(control) else {
            debug!(
                section = control.section.key(),
                ordinal = control.ordinal,
                "Dropping removal from stale control"
            );
            return false;
        };
        let Some(plan) = index.plan_remove(control.section, ordinal) else {
            return false;
        };
        if !store.remove_entry(control.section, ordinal) {
            return false;
        }
        index.commit(plan);
        self.render(control.section, store, index);
        true
    }

    pub fn section(&self, section: Section) -> Option<&SectionView> {
        self.sections.get(&section)
    }

    pub fn descriptor(&self, control: &ControlId) -> Option<&FieldDescriptor> {
        match &control.address {
            FieldAddress::Scalar(_) => self.scalars.iter().find(|d| &d.control == control),
            FieldAddress::Entry {
                section, ordinal, ..
            } => self
                .section(*section)?
                .groups
                .get(*ordinal)?
                .fields
                .iter()
                .find(|d| &d.control == control),
        }
    }

    fn descriptor_mut(&mut self, control: &ControlId) -> Option<&mut FieldDescriptor> {
        match &control.address {
            FieldAddress::Scalar(_) => self.scalars.iter_mut().find(|d| &d.control == control),
            FieldAddress::Entry {
                section, ordinal, ..
            } => self
                .sections
                .get_mut(section)?
                .groups
                .get_mut(*ordinal)?
                .fields
                .iter_mut()
                .find(|d| &d.control == control),
        }
    }

    pub fn view(&self, store: &RecordStore) -> FormView {
        FormView {
            scalars: self.scalars.clone(),
            profile_picture: store.get().personal_details.profile_picture.clone(),
            sections: self.sections.values().cloned().collect(),
        }
    }
}
