use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{check_date_range, check_one_of, trimmed};
use crate::resource::{require, require_if_present, FieldError, Resource, Validate};

pub const PROGRAM_STATUSES: &[&str] = &["planned", "ongoing", "completed"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgram {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgramDraft {
    #[serde(default, deserialize_with = "crate::resource::null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgramPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub status: Option<String>,
    pub period_id: Option<String>,
}

fn check_budget(budget: Option<f64>) -> Result<(), FieldError> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => {
            Err(FieldError::new("budget", "Budget cannot be negative"))
        }
        _ => Ok(()),
    }
}

impl Validate for WorkProgramDraft {
    fn validate(&self) -> Result<(), FieldError> {
        require("name", "Name", &self.name)?;
        check_date_range(self.start_date, self.end_date)?;
        check_budget(self.budget)?;
        check_one_of("status", "Status", self.status.as_deref(), PROGRAM_STATUSES)
    }
}

impl Validate for WorkProgramPatch {
    fn validate(&self) -> Result<(), FieldError> {
        require_if_present("name", "Name", self.name.as_deref())?;
        check_date_range(self.start_date, self.end_date)?;
        check_budget(self.budget)?;
        check_one_of("status", "Status", self.status.as_deref(), PROGRAM_STATUSES)
    }
}

impl Resource for WorkProgram {
    const ENTITY_TYPE: &'static str = "WorkProgram";
    const PATH: &'static str = "work-program";
    const LABEL: &'static str = "work program";

    type Draft = WorkProgramDraft;
    type Patch = WorkProgramPatch;

    fn from_draft(d: WorkProgramDraft) -> Self {
        Self {
            name: d.name.trim().to_string(),
            description: trimmed(d.description),
            start_date: d.start_date,
            end_date: d.end_date,
            budget: d.budget,
            status: d.status.unwrap_or_else(|| "planned".to_string()),
            period_id: trimmed(d.period_id),
        }
    }

    fn apply(&mut self, p: WorkProgramPatch) {
        if let Some(name) = p.name {
            self.name = name.trim().to_string();
        }
        if p.description.is_some() {
            self.description = trimmed(p.description);
        }
        if p.start_date.is_some() {
            self.start_date = p.start_date;
        }
        if p.end_date.is_some() {
            self.end_date = p.end_date;
        }
        if p.budget.is_some() {
            self.budget = p.budget;
        }
        if let Some(status) = p.status {
            self.status = status;
        }
        if p.period_id.is_some() {
            self.period_id = trimmed(p.period_id);
        }
    }

    fn check(&self) -> Result<(), FieldError> {
        check_date_range(self.start_date, self.end_date)
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn search_fields() -> &'static [&'static str] {
        &["name", "description"]
    }
}
