use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Record
// ────────────────────────────────────────────────────────────────────────────

/// The canonical CV document. Serialized field names match the storage slot
/// format (`personalDetails`, `workExperience`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub personal_details: PersonalDetails,
    pub professional_summary: String,
    pub work_experience: Vec<WorkExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    /// Opaque image reference, usually a `data:` URL.
    pub profile_picture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperienceEntry {
    pub title: String,
    pub company: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub skill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationEntry {
    pub name: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    SingleLine,
    MultiLine,
}

/// One field of a section's fixed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Placeholder label shown in the empty control.
    pub label: &'static str,
    pub kind: WidgetKind,
}

const fn line(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: WidgetKind::SingleLine,
    }
}

const fn multi(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind: WidgetKind::MultiLine,
    }
}

const WORK_EXPERIENCE_SHAPE: &[FieldSpec] = &[
    line("title", "Job Title"),
    line("company", "Company"),
    multi("description", "Description"),
];
const EDUCATION_SHAPE: &[FieldSpec] = &[line("degree", "Degree"), line("institution", "Institution")];
const SKILLS_SHAPE: &[FieldSpec] = &[line("skill", "Skill")];
const PROJECTS_SHAPE: &[FieldSpec] = &[line("name", "Project Name"), multi("description", "Description")];
const CERTIFICATIONS_SHAPE: &[FieldSpec] = &[line("name", "Certification Name")];

/// Uniform field access over the per-section entry structs.
///
/// `get` and `set` only accept names from `shape()`; anything else is `None`
/// / `false` so a malformed address can never add a field to an entry.
pub trait EntryShape: Default + Clone {
    fn shape() -> &'static [FieldSpec];
    fn get(&self, field: &str) -> Option<&str>;
    fn set(&mut self, field: &str, value: String) -> bool;
}

macro_rules! entry_shape {
    ($ty:ty, $shape:expr, { $($name:literal => $field:ident),+ $(,)? }) => {
        impl EntryShape for $ty {
            fn shape() -> &'static [FieldSpec] {
                $shape
            }

            fn get(&self, field: &str) -> Option<&str> {
                match field {
                    $($name => Some(self.$field.as_str()),)+
                    _ => None,
                }
            }

            fn set(&mut self, field: &str, value: String) -> bool {
                match field {
                    $($name => {
                        self.$field = value;
                        true
                    })+
                    _ => false,
                }
            }
        }
    };
}

entry_shape!(WorkExperienceEntry, WORK_EXPERIENCE_SHAPE, {
    "title" => title,
    "company" => company,
    "description" => description,
});
entry_shape!(EducationEntry, EDUCATION_SHAPE, {
    "degree" => degree,
    "institution" => institution,
});
entry_shape!(SkillEntry, SKILLS_SHAPE, { "skill" => skill });
entry_shape!(ProjectEntry, PROJECTS_SHAPE, {
    "name" => name,
    "description" => description,
});
entry_shape!(CertificationEntry, CERTIFICATIONS_SHAPE, { "name" => name });

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// The five repeatable collections of a [`Record`], in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    WorkExperience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::WorkExperience,
        Section::Education,
        Section::Skills,
        Section::Projects,
        Section::Certifications,
    ];

    /// The record key, also used as the first segment of a field address.
    pub fn key(self) -> &'static str {
        match self {
            Section::WorkExperience => "workExperience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Projects => "projects",
            Section::Certifications => "certifications",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::WorkExperience => "Work Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Projects => "Projects",
            Section::Certifications => "Certifications",
        }
    }

    pub fn shape(self) -> &'static [FieldSpec] {
        match self {
            Section::WorkExperience => WorkExperienceEntry::shape(),
            Section::Education => EducationEntry::shape(),
            Section::Skills => SkillEntry::shape(),
            Section::Projects => ProjectEntry::shape(),
            Section::Certifications => CertificationEntry::shape(),
        }
    }

    pub fn field_spec(self, field: &str) -> Option<&'static FieldSpec> {
        self.shape().iter().find(|spec| spec.name == field)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section '{0}'")]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    /// Accepts record keys as well as the short names of the add/remove controls.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workExperience" | "experience" => Ok(Section::WorkExperience),
            "education" => Ok(Section::Education),
            "skills" | "skill" => Ok(Section::Skills),
            "projects" | "project" => Ok(Section::Projects),
            "certifications" | "certification" => Ok(Section::Certifications),
            other => Err(UnknownSection(other.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Top-level scalars
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKey {
    Name,
    Email,
    Phone,
    Linkedin,
    ProfilePicture,
    Summary,
}

impl ScalarKey {
    /// Text controls shown at the top of the form, in order.
    pub const TEXT_FIELDS: [ScalarKey; 5] = [
        ScalarKey::Name,
        ScalarKey::Email,
        ScalarKey::Phone,
        ScalarKey::Linkedin,
        ScalarKey::Summary,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ScalarKey::Name => "name",
            ScalarKey::Email => "email",
            ScalarKey::Phone => "phone",
            ScalarKey::Linkedin => "linkedin",
            ScalarKey::ProfilePicture => "profilePicture",
            ScalarKey::Summary => "summary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScalarKey::Name => "Full Name",
            ScalarKey::Email => "Email",
            ScalarKey::Phone => "Phone",
            ScalarKey::Linkedin => "LinkedIn Profile",
            ScalarKey::ProfilePicture => "Profile Picture",
            ScalarKey::Summary => "Professional Summary",
        }
    }

    pub fn kind(self) -> WidgetKind {
        match self {
            ScalarKey::Summary => WidgetKind::MultiLine,
            _ => WidgetKind::SingleLine,
        }
    }
}

impl FromStr for ScalarKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ScalarKey::Name),
            "email" => Ok(ScalarKey::Email),
            "phone" => Ok(ScalarKey::Phone),
            "linkedin" => Ok(ScalarKey::Linkedin),
            "profilePicture" => Ok(ScalarKey::ProfilePicture),
            "summary" | "professionalSummary" => Ok(ScalarKey::Summary),
            _ => Err(()),
        }
    }
}

impl Record {
    pub fn scalar(&self, key: ScalarKey) -> &str {
        let pd = &self.personal_details;
        match key {
            ScalarKey::Name => &pd.name,
            ScalarKey::Email => &pd.email,
            ScalarKey::Phone => &pd.phone,
            ScalarKey::Linkedin => &pd.linkedin,
            ScalarKey::ProfilePicture => &pd.profile_picture,
            ScalarKey::Summary => &self.professional_summary,
        }
    }

    pub fn scalar_mut(&mut self, key: ScalarKey) -> &mut String {
        let pd = &mut self.personal_details;
        match key {
            ScalarKey::Name => &mut pd.name,
            ScalarKey::Email => &mut pd.email,
            ScalarKey::Phone => &mut pd.phone,
            ScalarKey::Linkedin => &mut pd.linkedin,
            ScalarKey::ProfilePicture => &mut pd.profile_picture,
            ScalarKey::Summary => &mut self.professional_summary,
        }
    }

    pub fn len(&self, section: Section) -> usize {
        match section {
            Section::WorkExperience => self.work_experience.len(),
            Section::Education => self.education.len(),
            Section::Skills => self.skills.len(),
            Section::Projects => self.projects.len(),
            Section::Certifications => self.certifications.len(),
        }
    }

    /// Reads one field of one entry. `None` for out-of-range ordinals and
    /// fields outside the section's shape.
    pub fn entry_field(&self, section: Section, ordinal: usize, field: &str) -> Option<&str> {
        fn read<'a, E: EntryShape>(items: &'a [E], ordinal: usize, field: &str) -> Option<&'a str> {
            items.get(ordinal).and_then(|e| e.get(field))
        }
        match section {
            Section::WorkExperience => read(&self.work_experience, ordinal, field),
            Section::Education => read(&self.education, ordinal, field),
            Section::Skills => read(&self.skills, ordinal, field),
            Section::Projects => read(&self.projects, ordinal, field),
            Section::Certifications => read(&self.certifications, ordinal, field),
        }
    }

    pub(crate) fn write_entry_field(
        &mut self,
        section: Section,
        ordinal: usize,
        field: &str,
        value: String,
    ) -> bool {
        fn write<E: EntryShape>(items: &mut [E], ordinal: usize, field: &str, value: String) -> bool {
            items
                .get_mut(ordinal)
                .map(|e| e.set(field, value))
                .unwrap_or(false)
        }
        match section {
            Section::WorkExperience => write(&mut self.work_experience, ordinal, field, value),
            Section::Education => write(&mut self.education, ordinal, field, value),
            Section::Skills => write(&mut self.skills, ordinal, field, value),
            Section::Projects => write(&mut self.projects, ordinal, field, value),
            Section::Certifications => write(&mut self.certifications, ordinal, field, value),
        }
    }

    /// Appends a blank entry and returns its ordinal.
    pub(crate) fn push_blank(&mut self, section: Section) -> usize {
        fn push<E: EntryShape>(items: &mut Vec<E>) -> usize {
            items.push(E::default());
            items.len() - 1
        }
        match section {
            Section::WorkExperience => push(&mut self.work_experience),
            Section::Education => push(&mut self.education),
            Section::Skills => push(&mut self.skills),
            Section::Projects => push(&mut self.projects),
            Section::Certifications => push(&mut self.certifications),
        }
    }

    pub(crate) fn splice_out(&mut self, section: Section, ordinal: usize) -> bool {
        fn splice<E>(items: &mut Vec<E>, ordinal: usize) -> bool {
            if ordinal < items.len() {
                items.remove(ordinal);
                true
            } else {
                false
            }
        }
        match section {
            Section::WorkExperience => splice(&mut self.work_experience, ordinal),
            Section::Education => splice(&mut self.education, ordinal),
            Section::Skills => splice(&mut self.skills, ordinal),
            Section::Projects => splice(&mut self.projects, ordinal),
            Section::Certifications => splice(&mut self.certifications, ordinal),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field addresses
// ────────────────────────────────────────────────────────────────────────────

/// Locates one editable scalar: a bare top-level key, or a
/// `(section, ordinal, field)` triple inside a collection entry.
///
/// Addresses are derived from position and are only meaningful against the
/// collection length they were computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldAddress {
    Scalar(ScalarKey),
    Entry {
        section: Section,
        ordinal: usize,
        field: &'static str,
    },
}

impl FieldAddress {
    /// Builds an entry address, rejecting fields outside the section's shape.
    pub fn entry(section: Section, ordinal: usize, field: &str) -> Option<Self> {
        section.field_spec(field).map(|spec| FieldAddress::Entry {
            section,
            ordinal,
            field: spec.name,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldAddress::Scalar(key) => key.label(),
            FieldAddress::Entry { section, field, .. } => {
                section.field_spec(field).map(|s| s.label).unwrap_or("")
            }
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            FieldAddress::Scalar(key) => key.kind(),
            FieldAddress::Entry { section, field, .. } => section
                .field_spec(field)
                .map(|s| s.kind)
                .unwrap_or(WidgetKind::SingleLine),
        }
    }
}

impl fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAddress::Scalar(key) => f.write_str(key.key()),
            FieldAddress::Entry {
                section,
                ordinal,
                field,
            } => write!(f, "{}-{}-{}", section.key(), ordinal, field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed field address '{0}'")]
pub struct MalformedAddress(pub String);

impl FromStr for FieldAddress {
    type Err = MalformedAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedAddress(s.to_string());
        let mut parts = s.splitn(3, '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), None, None) => key.parse().map(FieldAddress::Scalar).map_err(|_| malformed()),
            (Some(section), Some(ordinal), Some(field)) => {
                let section: Section = section.parse().map_err(|_| malformed())?;
                let ordinal: usize = ordinal.parse().map_err(|_| malformed())?;
                FieldAddress::entry(section, ordinal, field).ok_or_else(malformed)
            }
            _ => Err(malformed()),
        }
    }
}

impl Serialize for FieldAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
