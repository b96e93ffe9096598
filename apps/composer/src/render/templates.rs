//! The two built-in layouts and their per-section fragment formats.

use crate::models::{
    CertificationEntry, EducationEntry, ProjectEntry, Record, SkillEntry, WorkExperienceEntry,
};
use crate::render::escape_html;

/// A preview layout: fixed page skeleton plus one fragment function per
/// repeatable section.
pub struct Template {
    pub class: &'static str,
    pub show_picture: bool,
    experience: fn(&WorkExperienceEntry) -> String,
    education: fn(&EducationEntry) -> String,
    skill: fn(&SkillEntry) -> String,
    project: fn(&ProjectEntry) -> String,
    certification: fn(&CertificationEntry) -> String,
    /// Tag wrapping the certifications list (`div` or `ul`).
    certifications_tag: &'static str,
}

pub static PROFESSIONAL: Template = Template {
    class: "professional",
    show_picture: false,
    experience: professional_experience,
    education: professional_education,
    skill: professional_skill,
    project: professional_project,
    certification: professional_certification,
    certifications_tag: "div",
};

pub static MODERN: Template = Template {
    class: "modern",
    show_picture: true,
    experience: modern_experience,
    education: modern_education,
    skill: modern_skill,
    project: modern_project,
    certification: modern_certification,
    certifications_tag: "ul",
};

fn professional_experience(e: &WorkExperienceEntry) -> String {
    format!(
        "<div><strong>{}</strong> at {}</div>",
        escape_html(&e.title),
        escape_html(&e.company)
    )
}

fn professional_education(e: &EducationEntry) -> String {
    format!(
        "<div><strong>{}</strong> from {}</div>",
        escape_html(&e.degree),
        escape_html(&e.institution)
    )
}

fn professional_skill(s: &SkillEntry) -> String {
    format!("<li>{}</li>", escape_html(&s.skill))
}

fn professional_project(p: &ProjectEntry) -> String {
    format!(
        "<div><strong>{}</strong>: {}</div>",
        escape_html(&p.name),
        escape_html(&p.description)
    )
}

fn professional_certification(c: &CertificationEntry) -> String {
    format!("<div>{}</div>", escape_html(&c.name))
}

fn modern_card(heading: &str, body: &str, body_class: Option<&str>) -> String {
    let open = match body_class {
        Some(class) => format!("<p class=\"{class}\">"),
        None => "<p>".to_string(),
    };
    format!(
        "<article class=\"entry\"><h4>{}</h4>{open}{}</p></article>",
        escape_html(heading),
        escape_html(body)
    )
}

fn modern_experience(e: &WorkExperienceEntry) -> String {
    modern_card(&e.title, &e.company, Some("meta"))
}

fn modern_education(e: &EducationEntry) -> String {
    modern_card(&e.degree, &e.institution, Some("meta"))
}

fn modern_skill(s: &SkillEntry) -> String {
    format!("<li class=\"chip\">{}</li>", escape_html(&s.skill))
}

fn modern_project(p: &ProjectEntry) -> String {
    modern_card(&p.name, &p.description, None)
}

fn modern_certification(c: &CertificationEntry) -> String {
    format!("<li>{}</li>", escape_html(&c.name))
}

fn list<T>(items: &[T], fragment: fn(&T) -> String) -> String {
    items.iter().map(fragment).collect()
}

impl Template {
    pub fn render(&self, record: &Record) -> String {
        let pd = &record.personal_details;
        let mut html = format!("<div class=\"cv {}\">", self.class);

        html.push_str("<header>");
        if self.show_picture {
            if pd.profile_picture.is_empty() {
                html.push_str("<img class=\"profile-picture\" alt=\"\">");
            } else {
                html.push_str(&format!(
                    "<img class=\"profile-picture\" alt=\"\" src=\"{}\">",
                    escape_html(&pd.profile_picture)
                ));
            }
        }
        html.push_str(&format!(
            "<h1 class=\"name\">{}</h1>",
            escape_html(&pd.name)
        ));
        html.push_str(&format!(
            "<p class=\"contact\"><span class=\"email\">{}</span> | <span class=\"phone\">{}</span> | <span class=\"linkedin\">{}</span></p>",
            escape_html(&pd.email),
            escape_html(&pd.phone),
            escape_html(&pd.linkedin)
        ));
        html.push_str("</header>");

        html.push_str(&format!(
            "<section><h2>Professional Summary</h2><p class=\"summary\">{}</p></section>",
            escape_html(&record.professional_summary)
        ));
        html.push_str(&format!(
            "<section><h2>Work Experience</h2><div class=\"experience-list\">{}</div></section>",
            list(&record.work_experience, self.experience)
        ));
        html.push_str(&format!(
            "<section><h2>Education</h2><div class=\"education-list\">{}</div></section>",
            list(&record.education, self.education)
        ));
        html.push_str(&format!(
            "<section><h2>Skills</h2><ul class=\"skills-list\">{}</ul></section>",
            list(&record.skills, self.skill)
        ));
        html.push_str(&format!(
            "<section><h2>Projects</h2><div class=\"projects-list\">{}</div></section>",
            list(&record.projects, self.project)
        ));
        html.push_str(&format!(
            "<section><h2>Certifications</h2><{tag} class=\"certifications-list\">{}</{tag}></section>",
            list(&record.certifications, self.certification),
            tag = self.certifications_tag
        ));

        html.push_str("</div>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_professional_certifications_use_divs() {
        let mut record = Record::default();
        record.certifications.push(CertificationEntry {
            name: "CKA".into(),
        });
        let html = PROFESSIONAL.render(&record);
        assert!(html.contains("<div class=\"certifications-list\"><div>CKA</div></div>"));
    }

    #[test]
    fn test_modern_certifications_use_list_items() {
        let mut record = Record::default();
        record.certifications.push(CertificationEntry {
            name: "CKA".into(),
        });
        let html = MODERN.render(&record);
        assert!(html.contains("<ul class=\"certifications-list\"><li>CKA</li></ul>"));
    }

    #[test]
    fn test_project_fragment_includes_description() {
        let mut record = Record::default();
        record.projects.push(ProjectEntry {
            name: "Quill".into(),
            description: "CV tooling".into(),
        });
        assert!(PROFESSIONAL
            .render(&record)
            .contains("<div><strong>Quill</strong>: CV tooling</div>"));
    }

    #[test]
    fn test_education_fragment() {
        let mut record = Record::default();
        record.education.push(EducationEntry {
            degree: "BSc".into(),
            institution: "MIT".into(),
        });
        assert!(PROFESSIONAL
            .render(&record)
            .contains("<div><strong>BSc</strong> from MIT</div>"));
    }
}
