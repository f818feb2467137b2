use super::{
    Normalize, clean_list, dedupe_list, ensure_id, matches_marker, normalize_date,
    normalize_email, normalize_proficiency, normalize_range, normalize_text, normalize_url_field,
    NO_EXPIRATION_MARKERS,
};
use crate::resume::{
    Award, Certification, ContactInfo, CustomSection, Education, ExtractedResumeData, Language,
    Project, Skills, Volunteer, WorkExperience,
};

/// Normalize a resume record. Never fails.
pub fn normalize_resume(resume: ExtractedResumeData) -> ExtractedResumeData {
    let ExtractedResumeData {
        contact,
        summary,
        experience,
        education,
        projects,
        certifications,
        volunteer,
        awards,
        custom_sections,
        skills,
        languages,
    } = resume;

    ExtractedResumeData {
        contact: contact.normalize(),
        summary: normalize_text(summary),
        experience: normalize_entries(experience, |e| e.company.is_some() || e.title.is_some()),
        education: normalize_entries(education, |e| {
            e.institution.is_some() || e.degree.is_some()
        }),
        projects: normalize_entries(projects, |p| p.name.is_some()),
        certifications: normalize_entries(certifications, |c| c.name.is_some()),
        volunteer: normalize_entries(volunteer, |v| v.organization.is_some() || v.role.is_some()),
        awards: normalize_entries(awards, |a| a.title.is_some()),
        custom_sections: normalize_entries(custom_sections, |s| {
            s.content.is_some() || !s.items.is_empty()
        }),
        skills: skills.normalize(),
        languages: normalize_entries(languages, |l| l.language.is_some()),
    }
}

impl Normalize for ExtractedResumeData {
    fn normalize(self) -> Self {
        normalize_resume(self)
    }
}

/// List entries with a stable id.
trait Entry: Normalize {
    fn id_mut(&mut self) -> &mut Option<String>;
}

/// Normalize each entry, drop placeholders, then assign missing ids.
fn normalize_entries<T: Entry>(entries: Vec<T>, has_content: impl Fn(&T) -> bool) -> Vec<T> {
    entries
        .into_iter()
        .map(Normalize::normalize)
        .filter(|e| has_content(e))
        .map(|mut e| {
            let id = e.id_mut().take();
            *e.id_mut() = ensure_id(id);
            e
        })
        .collect()
}

macro_rules! impl_entry {
    ($($ty:ty),* $(,)?) => {
        $(impl Entry for $ty {
            fn id_mut(&mut self) -> &mut Option<String> {
                &mut self.id
            }
        })*
    };
}

impl_entry!(
    WorkExperience,
    Education,
    Project,
    Certification,
    Volunteer,
    Award,
    CustomSection,
    Language,
);

impl Normalize for ContactInfo {
    fn normalize(self) -> Self {
        ContactInfo {
            name: normalize_text(self.name),
            email: normalize_email(self.email),
            phone: normalize_text(self.phone),
            location: normalize_text(self.location),
            website: normalize_url_field(self.website),
            linkedin: normalize_url_field(self.linkedin),
            github: normalize_url_field(self.github),
        }
    }
}

impl Normalize for Skills {
    fn normalize(self) -> Self {
        Skills {
            technical: dedupe_list(self.technical),
            soft: dedupe_list(self.soft),
            tools: dedupe_list(self.tools),
            frameworks: dedupe_list(self.frameworks),
            languages: dedupe_list(self.languages),
            other: dedupe_list(self.other),
        }
    }
}

impl Normalize for WorkExperience {
    fn normalize(self) -> Self {
        let (start_date, end_date, current) =
            normalize_range(self.start_date, self.end_date, self.current);
        WorkExperience {
            id: self.id,
            company: normalize_text(self.company),
            title: normalize_text(self.title),
            location: normalize_text(self.location),
            start_date,
            end_date,
            current,
            description: normalize_text(self.description),
            highlights: clean_list(self.highlights),
            technologies: clean_list(self.technologies),
        }
    }
}

impl Normalize for Education {
    fn normalize(self) -> Self {
        let (start_date, end_date, current) =
            normalize_range(self.start_date, self.end_date, self.current);
        Education {
            id: self.id,
            institution: normalize_text(self.institution),
            degree: normalize_text(self.degree),
            field_of_study: normalize_text(self.field_of_study),
            location: normalize_text(self.location),
            start_date,
            end_date,
            current,
            gpa: normalize_text(self.gpa),
            coursework: clean_list(self.coursework),
            honors: clean_list(self.honors),
        }
    }
}

impl Normalize for Project {
    fn normalize(self) -> Self {
        let (start_date, end_date, current) =
            normalize_range(self.start_date, self.end_date, self.current);
        Project {
            id: self.id,
            name: normalize_text(self.name),
            description: normalize_text(self.description),
            url: normalize_url_field(self.url),
            start_date,
            end_date,
            current,
            technologies: clean_list(self.technologies),
            highlights: clean_list(self.highlights),
        }
    }
}

impl Normalize for Certification {
    fn normalize(self) -> Self {
        let raw_expiration = self.expiration_date.as_deref().unwrap_or_default();
        let no_expiration =
            self.no_expiration || matches_marker(raw_expiration, NO_EXPIRATION_MARKERS);
        let expiration_date = if no_expiration {
            Some(String::new())
        } else {
            normalize_date(raw_expiration)
        };

        Certification {
            id: self.id,
            name: normalize_text(self.name),
            issuer: normalize_text(self.issuer),
            issue_date: self.issue_date.as_deref().and_then(normalize_date),
            expiration_date,
            no_expiration,
            credential_id: normalize_text(self.credential_id),
            url: normalize_url_field(self.url),
        }
    }
}

impl Normalize for Volunteer {
    fn normalize(self) -> Self {
        let (start_date, end_date, current) =
            normalize_range(self.start_date, self.end_date, self.current);
        Volunteer {
            id: self.id,
            organization: normalize_text(self.organization),
            role: normalize_text(self.role),
            start_date,
            end_date,
            current,
            description: normalize_text(self.description),
            highlights: clean_list(self.highlights),
        }
    }
}

impl Normalize for Award {
    fn normalize(self) -> Self {
        Award {
            id: self.id,
            title: normalize_text(self.title),
            issuer: normalize_text(self.issuer),
            date: self.date.as_deref().and_then(normalize_date),
            description: normalize_text(self.description),
        }
    }
}

impl Normalize for CustomSection {
    fn normalize(self) -> Self {
        CustomSection {
            id: self.id,
            title: normalize_text(self.title),
            content: normalize_text(self.content),
            items: clean_list(self.items),
        }
    }
}

impl Normalize for Language {
    fn normalize(self) -> Self {
        Language {
            id: self.id,
            language: normalize_text(self.language),
            proficiency: self.proficiency.as_deref().and_then(normalize_proficiency),
        }
    }
}
