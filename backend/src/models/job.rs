//! Job posting model.

use serde::{Deserialize, Serialize};

/// A job posting as shown on a triage card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a job posting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl CreateJobRequest {
    /// Check required fields and normalize blank optionals to `None`.
    pub fn validate(mut self) -> Result<Self, String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.company.trim().is_empty() {
            return Err("Company is required".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("Description is required".to_string());
        }

        self.location = non_blank(self.location);
        self.job_type = non_blank(self.job_type);
        self.salary = non_blank(self.salary);
        self.contact_email = non_blank(self.contact_email);

        if let Some(email) = &self.contact_email {
            if !is_plausible_email(email) {
                return Err(format!("Invalid contact email: {}", email));
            }
        }

        self.skills.retain(|s| !s.trim().is_empty());
        Ok(self)
    }
}

/// Request body for updating a job posting. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl UpdateJobRequest {
    /// Apply the changes to `job`, rejecting blanked required fields.
    pub fn apply_to(&self, job: &mut JobPosting) -> Result<(), String> {
        for (name, value) in [
            ("Title", &self.title),
            ("Company", &self.company),
            ("Description", &self.description),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("{} cannot be empty", name));
            }
        }
        if let Some(email) = non_blank(self.contact_email.clone()) {
            if !is_plausible_email(&email) {
                return Err(format!("Invalid contact email: {}", email));
            }
        }

        if let Some(title) = &self.title {
            job.title = title.trim().to_string();
        }
        if let Some(company) = &self.company {
            job.company = company.trim().to_string();
        }
        if let Some(description) = &self.description {
            job.description = description.clone();
        }
        if self.location.is_some() {
            job.location = non_blank(self.location.clone());
        }
        if self.job_type.is_some() {
            job.job_type = non_blank(self.job_type.clone());
        }
        if self.salary.is_some() {
            job.salary = non_blank(self.salary.clone());
        }
        if self.contact_email.is_some() {
            job.contact_email = non_blank(self.contact_email.clone());
        }
        if let Some(skills) = &self.skills {
            job.skills = skills
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect();
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
