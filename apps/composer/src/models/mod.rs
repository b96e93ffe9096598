pub mod record;

pub use record::{
    CertificationEntry, EducationEntry, FieldAddress, ProjectEntry, Record, ScalarKey, Section,
    SkillEntry, WidgetKind, WorkExperienceEntry,
};
