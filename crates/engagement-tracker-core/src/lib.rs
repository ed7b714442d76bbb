//! Domain model for the engagement tracker.
//!
//! This crate holds everything that does not touch storage or the outside
//! world: entity records and their write inputs, ISO date handling, the report
//! model with its text/table renderings, and the mail classification rules the
//! importer applies before anything is written.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const DASH_RULE_WIDTH: usize = 50;
pub const SUMMARY_BODY_CHARS: usize = 500;
pub const PREVIEW_SUMMARY_CHARS: usize = 100;
pub const IMPORTED_ENGAGEMENT_STATUS: &str = "Completed";
pub const IMPORTED_UNIT_TYPE: &str = "Unknown";
pub const DEFAULT_ENGAGEMENT_TYPE: &str = "Email Communication";
pub const DEFAULT_PROJECT_STATUS: &str = "Not Started";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum TrackerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(String),
}

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(UnitId);
surrogate_id!(ResearcherId);
surrogate_id!(ProjectId);
surrogate_id!(
    /// Row id of an engagement; also one half of every participation pair.
    EngagementId
);
surrogate_id!(ReviewId);

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const EXPORT_STAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// Parses a calendar date in `YYYY-MM-DD` form.
///
/// # Errors
/// Returns [`TrackerError::Validation`] when the text is not a valid ISO date.
pub fn parse_iso_date(value: &str) -> Result<Date, TrackerError> {
    Date::parse(value.trim(), ISO_DATE)
        .map_err(|err| TrackerError::Validation(format!("invalid ISO date `{value}`: {err}")))
}

/// Formats a date with the same description [`parse_iso_date`] accepts.
///
/// # Errors
/// Returns [`TrackerError::Validation`] when the date cannot be rendered.
pub fn format_iso_date(date: Date) -> Result<String, TrackerError> {
    date.format(ISO_DATE)
        .map_err(|err| TrackerError::Validation(format!("failed to format date {date}: {err}")))
}

/// Serde adapter storing [`Date`] as `YYYY-MM-DD` text.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text =
            super::format_iso_date(*value).map_err(<S::Error as serde::ser::Error>::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso_date(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            value: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => {
                    let text = super::super::format_iso_date(*date)
                        .map_err(<S::Error as serde::ser::Error>::custom)?;
                    serializer.serialize_some(&text)
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|value| super::super::parse_iso_date(&value))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Inclusive calendar range used by every report query.
///
/// `start > end` is accepted; it simply matches nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct DateRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

impl DateRange {
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Parses both bounds from ISO text.
    ///
    /// # Errors
    /// Returns [`TrackerError::Validation`] when either bound is malformed.
    pub fn parse(start: &str, end: &str) -> Result<Self, TrackerError> {
        Ok(Self::new(parse_iso_date(start)?, parse_iso_date(end)?))
    }

    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let start = format_iso_date(self.start).map_err(|_| std::fmt::Error)?;
        let end = format_iso_date(self.end).map_err(|_| std::fmt::Error)?;
        write!(f, "{start} to {end}")
    }
}

fn require(field: &str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::Validation(format!("{field} MUST be provided")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub location: Option<String>,
    pub commander: Option<String>,
    pub point_of_contact: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitInput {
    pub name: String,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub location: Option<String>,
    pub commander: Option<String>,
    pub point_of_contact: Option<String>,
    pub notes: Option<String>,
}

impl UnitInput {
    /// Checks the required columns of a unit row.
    ///
    /// # Errors
    /// Returns [`TrackerError::Validation`] when the name or type is blank.
    pub fn validate(&self) -> Result<(), TrackerError> {
        require("unit name", &self.name)?;
        require("unit type", &self.unit_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Researcher {
    pub id: ResearcherId,
    pub name: String,
    pub department: Option<String>,
    pub expertise: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearcherInput {
    pub name: String,
    pub department: Option<String>,
    pub expertise: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl ResearcherInput {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns [`TrackerError::Validation`] when the name is blank.
    pub fn validate(&self) -> Result<(), TrackerError> {
        require("researcher name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub status: Option<String>,
    #[serde(with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: String,
    pub status: Option<String>,
    #[serde(with = "iso_date::option", default)]
    pub start_date: Option<Date>,
    #[serde(with = "iso_date::option", default)]
    pub end_date: Option<Date>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl ProjectInput {
    /// # Errors
    /// Returns [`TrackerError::Validation`] when the name is blank or the end
    /// date precedes the start date.
    pub fn validate(&self) -> Result<(), TrackerError> {
        require("project name", &self.name)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(TrackerError::Validation(
                    "project end_date MUST NOT precede start_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Engagement {
    pub id: EngagementId,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(rename = "type")]
    pub engagement_type: String,
    pub unit_id: Option<UnitId>,
    pub project_id: Option<ProjectId>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub action_items: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementInput {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(rename = "type")]
    pub engagement_type: String,
    pub unit_id: Option<UnitId>,
    pub project_id: Option<ProjectId>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub action_items: Option<String>,
}

impl EngagementInput {
    #[must_use]
    pub fn new(date: Date, engagement_type: &str) -> Self {
        Self {
            date,
            engagement_type: engagement_type.to_string(),
            unit_id: None,
            project_id: None,
            summary: None,
            status: None,
            action_items: None,
        }
    }

    /// Checks the columns that can be judged without the store; reference
    /// existence is checked by the store at write time.
    ///
    /// # Errors
    /// Returns [`TrackerError::Validation`] when the engagement type is blank.
    pub fn validate(&self) -> Result<(), TrackerError> {
        require("engagement type", &self.engagement_type)
    }
}

/// Engagement joined with the display names used by list views.
///
/// Names are `None` when the reference is unset or points at a deleted row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementOverview {
    pub engagement: Engagement,
    pub unit_name: Option<String>,
    pub project_name: Option<String>,
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyReview {
    pub id: ReviewId,
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub summary: Option<String>,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub next_steps: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyReviewInput {
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub summary: Option<String>,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub next_steps: Option<String>,
}

impl WeeklyReviewInput {
    #[must_use]
    pub fn new(week_start: Date) -> Self {
        Self {
            week_start,
            summary: None,
            highlights: None,
            challenges: None,
            next_steps: None,
        }
    }
}

/// Tables that support exact-name lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NamedTable {
    Units,
    Researchers,
    Projects,
}

impl NamedTable {
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::Researchers => "researchers",
            Self::Projects => "projects",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    UnitEngagementSummary,
    ResearcherActivity,
    ProjectStatus,
    WeeklyReviewSummary,
}

impl ReportKind {
    pub const ALL: [Self; 4] = [
        Self::UnitEngagementSummary,
        Self::ResearcherActivity,
        Self::ProjectStatus,
        Self::WeeklyReviewSummary,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnitEngagementSummary => "unit-engagement-summary",
            Self::ResearcherActivity => "researcher-activity",
            Self::ProjectStatus => "project-status",
            Self::WeeklyReviewSummary => "weekly-review-summary",
        }
    }

    /// Parses the kebab-case report name.
    ///
    /// # Errors
    /// Returns [`TrackerError::Configuration`] for any name outside the fixed
    /// set of report kinds.
    pub fn parse(value: &str) -> Result<Self, TrackerError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| TrackerError::Configuration(format!("unknown report kind: {value}")))
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::UnitEngagementSummary => "Unit Engagement Summary Report",
            Self::ResearcherActivity => "Researcher Activity Report",
            Self::ProjectStatus => "Project Status Report",
            Self::WeeklyReviewSummary => "Weekly Review Summary Report",
        }
    }

    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::UnitEngagementSummary => "unit_engagement",
            Self::ResearcherActivity => "researcher_activity",
            Self::ProjectStatus => "project_status",
            Self::WeeklyReviewSummary => "weekly_review",
        }
    }

    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::UnitEngagementSummary => &["Unit", "Total Engagements", "Projects", "Researchers"],
            Self::ResearcherActivity => &["Researcher", "Total Engagements", "Units", "Projects"],
            Self::ProjectStatus => &[
                "Project",
                "Status",
                "Total Engagements",
                "Units",
                "Researchers",
            ],
            Self::WeeklyReviewSummary => &[
                "Week Starting",
                "Summary",
                "Highlights",
                "Challenges",
                "Next Steps",
            ],
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the spreadsheet-style export file for `kind` written at `at`.
///
/// # Errors
/// Returns [`TrackerError::Validation`] when the timestamp cannot be rendered.
pub fn export_file_name(kind: ReportKind, at: OffsetDateTime) -> Result<String, TrackerError> {
    let stamp = at
        .format(EXPORT_STAMP)
        .map_err(|err| TrackerError::Validation(format!("failed to format export stamp: {err}")))?;
    Ok(format!("{}_report_{stamp}.csv", kind.file_stem()))
}

/// Splits a `GROUP_CONCAT` result back into trimmed names.
#[must_use]
pub fn split_concat_names(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitEngagementRow {
    pub unit: String,
    pub engagement_count: u32,
    pub projects: Vec<String>,
    pub researchers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearcherActivityRow {
    pub researcher: String,
    pub engagement_count: u32,
    pub units: Vec<String>,
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectStatusRow {
    pub project: String,
    pub status: Option<String>,
    pub engagement_count: u32,
    pub units: Vec<String>,
    pub researchers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyReviewRow {
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub summary: Option<String>,
    pub highlights: Option<String>,
    pub challenges: Option<String>,
    pub next_steps: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "rows", rename_all = "kebab-case")]
pub enum ReportRows {
    UnitEngagementSummary(Vec<UnitEngagementRow>),
    ResearcherActivity(Vec<ResearcherActivityRow>),
    ProjectStatus(Vec<ProjectStatusRow>),
    WeeklyReviewSummary(Vec<WeeklyReviewRow>),
}

impl ReportRows {
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::UnitEngagementSummary(_) => ReportKind::UnitEngagementSummary,
            Self::ResearcherActivity(_) => ReportKind::ResearcherActivity,
            Self::ProjectStatus(_) => ReportKind::ProjectStatus,
            Self::WeeklyReviewSummary(_) => ReportKind::WeeklyReviewSummary,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::UnitEngagementSummary(rows) => rows.len(),
            Self::ResearcherActivity(rows) => rows.len(),
            Self::ProjectStatus(rows) => rows.len(),
            Self::WeeklyReviewSummary(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub period: DateRange,
    #[serde(flatten)]
    pub rows: ReportRows,
}

/// Column labels plus stringified cells, ready for a tabular sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    #[must_use]
    pub fn kind(&self) -> ReportKind {
        self.rows.kind()
    }

    /// Text rendering of the report, one entry per output line.
    ///
    /// # Errors
    /// Returns [`TrackerError::Validation`] when a date cannot be formatted.
    pub fn text_lines(&self) -> Result<Vec<String>, TrackerError> {
        let mut lines = vec![
            self.kind().title().to_string(),
            format!("Period: {}", self.period),
            String::new(),
        ];
        let rule = "-".repeat(DASH_RULE_WIDTH);

        match &self.rows {
            ReportRows::UnitEngagementSummary(rows) => {
                for row in rows {
                    lines.push(format!("Unit: {}", row.unit));
                    lines.push(format!("Total Engagements: {}", row.engagement_count));
                    push_name_list(&mut lines, "Projects Involved:", &row.projects);
                    push_name_list(&mut lines, "Researchers Involved:", &row.researchers);
                    lines.push(rule.clone());
                }
            }
            ReportRows::ResearcherActivity(rows) => {
                for row in rows {
                    lines.push(format!("Researcher: {}", row.researcher));
                    lines.push(format!("Total Engagements: {}", row.engagement_count));
                    push_name_list(&mut lines, "Units Engaged:", &row.units);
                    push_name_list(&mut lines, "Projects Involved:", &row.projects);
                    lines.push(rule.clone());
                }
            }
            ReportRows::ProjectStatus(rows) => {
                for row in rows {
                    lines.push(format!("Project: {}", row.project));
                    lines.push(format!(
                        "Status: {}",
                        non_blank(row.status.as_deref()).unwrap_or(DEFAULT_PROJECT_STATUS)
                    ));
                    lines.push(format!("Total Engagements: {}", row.engagement_count));
                    push_name_list(&mut lines, "Units Involved:", &row.units);
                    push_name_list(&mut lines, "Researchers Involved:", &row.researchers);
                    lines.push(rule.clone());
                }
            }
            ReportRows::WeeklyReviewSummary(rows) => {
                for row in rows {
                    lines.push(format!("Week Starting: {}", format_iso_date(row.week_start)?));
                    if let Some(summary) = non_blank(row.summary.as_deref()) {
                        lines.push("Summary:".to_string());
                        lines.push(summary.to_string());
                    }
                    for (label, value) in [
                        ("Highlights:", &row.highlights),
                        ("Challenges:", &row.challenges),
                        ("Next Steps:", &row.next_steps),
                    ] {
                        if let Some(text) = non_blank(value.as_deref()) {
                            lines.push(String::new());
                            lines.push(label.to_string());
                            lines.push(text.to_string());
                        }
                    }
                    lines.push(rule.clone());
                }
            }
        }

        Ok(lines)
    }

    /// # Errors
    /// Propagates date formatting failures from [`Report::text_lines`].
    pub fn render_text(&self) -> Result<String, TrackerError> {
        Ok(self.text_lines()?.join("\n"))
    }

    /// Flattens the rows into export cells under [`ReportKind::columns`].
    ///
    /// # Errors
    /// Returns [`TrackerError::Validation`] when a week start cannot be formatted.
    pub fn to_table(&self) -> Result<ReportTable, TrackerError> {
        let columns = self
            .kind()
            .columns()
            .iter()
            .map(|label| (*label).to_string())
            .collect();

        let rows = match &self.rows {
            ReportRows::UnitEngagementSummary(rows) => rows
                .iter()
                .map(|row| {
                    vec![
                        row.unit.clone(),
                        row.engagement_count.to_string(),
                        row.projects.join(", "),
                        row.researchers.join(", "),
                    ]
                })
                .collect(),
            ReportRows::ResearcherActivity(rows) => rows
                .iter()
                .map(|row| {
                    vec![
                        row.researcher.clone(),
                        row.engagement_count.to_string(),
                        row.units.join(", "),
                        row.projects.join(", "),
                    ]
                })
                .collect(),
            ReportRows::ProjectStatus(rows) => rows
                .iter()
                .map(|row| {
                    vec![
                        row.project.clone(),
                        row.status.clone().unwrap_or_default(),
                        row.engagement_count.to_string(),
                        row.units.join(", "),
                        row.researchers.join(", "),
                    ]
                })
                .collect(),
            ReportRows::WeeklyReviewSummary(rows) => rows
                .iter()
                .map(|row| {
                    Ok(vec![
                        format_iso_date(row.week_start)?,
                        row.summary.clone().unwrap_or_default(),
                        row.highlights.clone().unwrap_or_default(),
                        row.challenges.clone().unwrap_or_default(),
                        row.next_steps.clone().unwrap_or_default(),
                    ])
                })
                .collect::<Result<_, TrackerError>>()?,
        };

        Ok(ReportTable { columns, rows })
    }
}

fn push_name_list(lines: &mut Vec<String>, heading: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    for name in names {
        lines.push(format!("  - {name}"));
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// One message as handed over by a mail source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub sender: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub cc: String,
    #[serde(with = "time::serde::rfc3339")]
    pub received: OffsetDateTime,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Ordered `(domain fragment, unit name)` table; the first containing
/// fragment wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainMappings {
    entries: Vec<(String, String)>,
}

impl Default for DomainMappings {
    fn default() -> Self {
        Self {
            entries: [
                ("army.mil", "Army"),
                ("navy.mil", "Navy"),
                ("af.mil", "Air Force"),
                ("marines.mil", "Marines"),
                ("uscg.mil", "Coast Guard"),
            ]
            .into_iter()
            .map(|(fragment, unit)| (fragment.to_string(), unit.to_string()))
            .collect(),
        }
    }
}

impl DomainMappings {
    /// Builds a table from ordered pairs, lower-casing each fragment.
    ///
    /// # Errors
    /// Returns [`TrackerError::Configuration`] when the table is empty or a
    /// fragment or unit name is blank.
    pub fn new<I, F, U>(pairs: I) -> Result<Self, TrackerError>
    where
        I: IntoIterator<Item = (F, U)>,
        F: Into<String>,
        U: Into<String>,
    {
        let mut entries = Vec::new();
        for (fragment, unit) in pairs {
            let fragment = fragment.into().trim().to_lowercase();
            let unit = unit.into().trim().to_string();
            if fragment.is_empty() {
                return Err(TrackerError::Configuration(
                    "domain fragment MUST NOT be blank".to_string(),
                ));
            }
            if unit.is_empty() {
                return Err(TrackerError::Configuration(format!(
                    "unit name for domain fragment `{fragment}` MUST NOT be blank"
                )));
            }
            entries.push((fragment, unit));
        }

        if entries.is_empty() {
            return Err(TrackerError::Configuration(
                "domain mappings MUST contain at least one entry".to_string(),
            ));
        }

        Ok(Self { entries })
    }

    /// Decodes a JSON object whose key order is the match order.
    ///
    /// # Errors
    /// Returns [`TrackerError::Configuration`] when the value is not an object
    /// of strings or fails [`DomainMappings::new`] checks.
    pub fn from_json(value: &Value) -> Result<Self, TrackerError> {
        let Some(object) = value.as_object() else {
            return Err(TrackerError::Configuration(
                "domain mappings JSON MUST be an object of fragment -> unit".to_string(),
            ));
        };

        let mut pairs = Vec::with_capacity(object.len());
        for (fragment, unit) in object {
            let Some(unit) = unit.as_str() else {
                return Err(TrackerError::Configuration(format!(
                    "unit name for domain fragment `{fragment}` MUST be a string"
                )));
            };
            pairs.push((fragment.clone(), unit.to_string()));
        }

        Self::new(pairs)
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    #[must_use]
    pub fn lookup(&self, domain: &str) -> Option<&str> {
        let domain = domain.to_lowercase();
        self.entries
            .iter()
            .find(|(fragment, _)| domain.contains(fragment.as_str()))
            .map(|(_, unit)| unit.as_str())
    }
}

/// Maps an address to a unit name through its domain.
#[must_use]
pub fn extract_unit(address: &str, mappings: &DomainMappings) -> Option<String> {
    let (_, domain) = address.trim().split_once('@')?;
    if domain.is_empty() {
        return None;
    }
    mappings.lookup(domain).map(str::to_string)
}

const TYPE_KEYWORDS: [(&str, &str); 9] = [
    ("meeting", "Meeting"),
    ("conference", "Meeting"),
    ("training", "Training"),
    ("workshop", "Training"),
    ("demo", "Demo"),
    ("demonstration", "Demo"),
    ("review", "Review"),
    ("brief", "Briefing"),
    ("briefing", "Briefing"),
];

const ACTION_MARKERS: [&str; 10] = [
    "action item",
    "action required",
    "todo",
    "to-do",
    "to do",
    "next steps",
    "follow up",
    "followup",
    "please",
    "request",
];

#[must_use]
pub fn classify_engagement_type(subject: &str) -> &'static str {
    let subject = subject.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| subject.contains(keyword))
        .map_or(DEFAULT_ENGAGEMENT_TYPE, |(_, label)| *label)
}

/// Collects every marker line of the body together with the line after it.
#[must_use]
pub fn extract_action_items(body: &str) -> String {
    let lowered = body.to_lowercase();
    let lines: Vec<&str> = lowered.split('\n').collect();
    let mut items = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !ACTION_MARKERS.iter().any(|marker| line.contains(marker)) {
            continue;
        }
        match lines.get(index + 1) {
            Some(next) => items.push(format!("- {}\n  {}", line.trim(), next.trim())),
            None => items.push(format!("- {}", line.trim())),
        }
    }

    items.join("\n")
}

fn split_addresses(field: &str) -> impl Iterator<Item = &str> {
    field
        .split(';')
        .map(str::trim)
        .filter(|address| !address.is_empty())
}

fn local_part(address: &str) -> &str {
    address.split('@').next().unwrap_or(address).trim()
}

fn render_recipient(address: &str) -> String {
    if let Some((display, rest)) = address.split_once('<') {
        let display = display.trim().trim_matches('"').trim();
        if !display.is_empty() {
            return display.to_string();
        }
        return local_part(rest.trim_end_matches('>')).to_string();
    }
    local_part(address).to_string()
}

/// Sender first, then `to` and `cc` recipients, de-duplicated in order.
#[must_use]
pub fn derive_participants(sender: &str, to: &str, cc: &str) -> Vec<String> {
    let mut participants: Vec<String> = Vec::new();
    let candidates = std::iter::once(sender.trim().to_string())
        .chain(split_addresses(to).map(render_recipient))
        .chain(split_addresses(cc).map(render_recipient));

    for candidate in candidates {
        if candidate.is_empty() || participants.contains(&candidate) {
            continue;
        }
        participants.push(candidate);
    }

    participants
}

#[must_use]
pub fn unit_for_recipients(to: &str, cc: &str, mappings: &DomainMappings) -> Option<String> {
    split_addresses(to)
        .chain(split_addresses(cc))
        .find_map(|address| extract_unit(address, mappings))
}

#[must_use]
pub fn compose_summary(message: &MailMessage) -> String {
    let excerpt: String = message.body.chars().take(SUMMARY_BODY_CHARS).collect();
    let mut summary = format!(
        "Subject: {}\nFrom: {}\nTo: {}\nCC: {}\n\n{excerpt}...",
        message.subject, message.sender, message.to, message.cc
    );

    if !message.attachments.is_empty() {
        summary.push_str("\n\nAttachments:\n");
        summary.push_str(
            &message
                .attachments
                .iter()
                .map(|name| format!("- {name}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    summary
}

/// Engagement derived from a mail message, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementDraft {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(rename = "type")]
    pub engagement_type: String,
    pub unit: Option<String>,
    pub summary: String,
    pub status: String,
    pub action_items: String,
    pub participants: Vec<String>,
    pub attachments: Vec<String>,
}

#[must_use]
pub fn convert_message(message: &MailMessage, mappings: &DomainMappings) -> EngagementDraft {
    EngagementDraft {
        date: message.received.date(),
        engagement_type: classify_engagement_type(&message.subject).to_string(),
        unit: unit_for_recipients(&message.to, &message.cc, mappings),
        summary: compose_summary(message),
        status: IMPORTED_ENGAGEMENT_STATUS.to_string(),
        action_items: extract_action_items(&message.body),
        participants: derive_participants(&message.sender, &message.to, &message.cc),
        attachments: message.attachments.clone(),
    }
}

/// Text listing of drafts as the importer would store them.
///
/// # Errors
/// Returns [`TrackerError::Validation`] when a draft date cannot be formatted.
pub fn render_import_preview(drafts: &[EngagementDraft]) -> Result<String, TrackerError> {
    let mut lines = vec!["Email Import Preview:".to_string(), String::new()];

    for (index, draft) in drafts.iter().enumerate() {
        let excerpt: String = draft.summary.chars().take(PREVIEW_SUMMARY_CHARS).collect();
        lines.push(format!("Email {}:", index + 1));
        lines.push(format!("Date: {}", format_iso_date(draft.date)?));
        lines.push(format!("Type: {}", draft.engagement_type));
        lines.push(format!("Unit: {}", draft.unit.as_deref().unwrap_or("Unknown")));
        lines.push(format!("Participants: {}", draft.participants.join(", ")));
        lines.push(format!("Attachments: {}", draft.attachments.len()));
        lines.push(format!("Summary: {excerpt}..."));
        lines.push("-".repeat(DASH_RULE_WIDTH));
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SenderCount {
    pub sender: String,
    pub messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailboxStats {
    pub total_messages: usize,
    pub top_senders: Vec<SenderCount>,
    pub total_attachments: usize,
}

pub const TOP_SENDER_LIMIT: usize = 5;

#[must_use]
pub fn analyze_messages(messages: &[MailMessage]) -> MailboxStats {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in messages {
        let counter = counts.entry(message.sender.as_str()).or_insert_with(|| {
            order.push(message.sender.as_str());
            0
        });
        *counter += 1;
    }

    let mut top_senders: Vec<SenderCount> = order
        .into_iter()
        .map(|sender| SenderCount {
            sender: sender.to_string(),
            messages: counts.get(sender).copied().unwrap_or_default(),
        })
        .collect();
    // Stable sort keeps first-appearance order among equal counts.
    top_senders.sort_by(|lhs, rhs| rhs.messages.cmp(&lhs.messages));
    top_senders.truncate(TOP_SENDER_LIMIT);

    MailboxStats {
        total_messages: messages.len(),
        top_senders,
        total_attachments: messages.iter().map(|message| message.attachments.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn must_ok<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("expected Ok(..), got error: {err}"),
        }
    }

    fn must_date(value: &str) -> Date {
        must_ok(parse_iso_date(value))
    }

    fn fixture_message() -> MailMessage {
        MailMessage {
            subject: "Quarterly Training Workshop".to_string(),
            sender: "Dana Whitfield".to_string(),
            to: "Capt. Lee <lee.k@navy.mil>; ops@army.mil".to_string(),
            cc: "dana.w@lab.example; Dana Whitfield <dana.w@lab.example>".to_string(),
            received: must_ok(OffsetDateTime::parse(
                "2026-03-04T15:30:00Z",
                &time::format_description::well_known::Rfc3339,
            )),
            body: "Thanks for hosting.\nAction required: send roster\nby Friday".to_string(),
            attachments: vec!["agenda.pdf".to_string(), "roster.xlsx".to_string()],
        }
    }

    #[test]
    fn extract_unit_matches_domain_fragments() {
        let mappings = DomainMappings::default();
        assert_eq!(
            extract_unit("jane.doe@navy.mil", &mappings).as_deref(),
            Some("Navy")
        );
        assert_eq!(
            extract_unit("someone@hq.AF.MIL", &mappings).as_deref(),
            Some("Air Force")
        );
        assert_eq!(extract_unit("noemail", &mappings), None);
        assert_eq!(extract_unit("", &mappings), None);
        assert_eq!(extract_unit("trailing@", &mappings), None);
        assert_eq!(extract_unit("a@example.com", &mappings), None);
    }

    #[test]
    fn type_classification_follows_table_order() {
        assert_eq!(classify_engagement_type("Training Review Meeting"), "Meeting");
        assert_eq!(classify_engagement_type("Workshop review"), "Training");
        assert_eq!(classify_engagement_type("Product DEMONSTRATION"), "Demo");
        assert_eq!(classify_engagement_type("Weekly briefing"), "Briefing");
        assert_eq!(classify_engagement_type("Lunch?"), DEFAULT_ENGAGEMENT_TYPE);
    }

    #[test]
    fn action_items_pair_marker_with_next_line() {
        let items = extract_action_items("Please review.\nThanks\nAction item: ship report\nDone");
        assert_eq!(
            items,
            "- please review.\n  thanks\n- action item: ship report\n  done"
        );
        assert_eq!(items.matches("\n- ").count() + 1, 2);
    }

    #[test]
    fn classification_tables_keep_their_match_order() {
        assert_eq!(
            TYPE_KEYWORDS,
            [
                ("meeting", "Meeting"),
                ("conference", "Meeting"),
                ("training", "Training"),
                ("workshop", "Training"),
                ("demo", "Demo"),
                ("demonstration", "Demo"),
                ("review", "Review"),
                ("brief", "Briefing"),
                ("briefing", "Briefing"),
            ]
        );
        assert_eq!(
            ACTION_MARKERS,
            [
                "action item",
                "action required",
                "todo",
                "to-do",
                "to do",
                "next steps",
                "follow up",
                "followup",
                "please",
                "request",
            ]
        );

        let defaults = DomainMappings::default();
        let entries: Vec<(&str, &str)> = defaults
            .entries()
            .iter()
            .map(|(fragment, unit)| (fragment.as_str(), unit.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("army.mil", "Army"),
                ("navy.mil", "Navy"),
                ("af.mil", "Air Force"),
                ("marines.mil", "Marines"),
                ("uscg.mil", "Coast Guard"),
            ]
        );
    }

    #[test]
    fn every_type_keyword_classifies_a_subject() {
        for (subject, expected) in [
            ("Staff Meeting", "Meeting"),
            ("Annual conference", "Meeting"),
            ("Range TRAINING", "Training"),
            ("Cyber workshop", "Training"),
            ("Radar demo", "Demo"),
            ("Demonstration day", "Demo"),
            ("Quarterly review", "Review"),
            ("Brief on sensors", "Briefing"),
            ("Morning briefing", "Briefing"),
        ] {
            assert_eq!(classify_engagement_type(subject), expected, "subject {subject}");
        }
    }

    #[test]
    fn action_items_on_last_line_stand_alone() {
        assert_eq!(extract_action_items("hello\nTODO: ship"), "- todo: ship");
        assert_eq!(extract_action_items("nothing to see"), "");
    }

    #[test]
    fn participants_put_sender_first_and_drop_duplicates() {
        let participants = derive_participants(
            "Dana Whitfield",
            "Capt. Lee <lee.k@navy.mil>; ops@army.mil; ",
            "dana.w@lab.example; Dana Whitfield <dana.w@lab.example>; <solo@x.mil>",
        );
        assert_eq!(
            participants,
            vec![
                "Dana Whitfield".to_string(),
                "Capt. Lee".to_string(),
                "ops".to_string(),
                "dana.w".to_string(),
                "solo".to_string(),
            ]
        );
    }

    #[test]
    fn unit_scan_prefers_to_over_cc() {
        let mappings = DomainMappings::default();
        assert_eq!(
            unit_for_recipients("x@example.com; y@army.mil", "z@navy.mil", &mappings).as_deref(),
            Some("Army")
        );
        assert_eq!(
            unit_for_recipients("", "z@navy.mil", &mappings).as_deref(),
            Some("Navy")
        );
        assert_eq!(unit_for_recipients("", "", &mappings), None);
    }

    #[test]
    fn summary_truncates_body_and_lists_attachments() {
        let mut message = fixture_message();
        message.body = "x".repeat(800);
        let summary = compose_summary(&message);
        assert!(summary.starts_with("Subject: Quarterly Training Workshop\nFrom: Dana Whitfield\n"));
        assert!(summary.contains(&format!("\n\n{}...", "x".repeat(SUMMARY_BODY_CHARS))));
        assert!(!summary.contains(&"x".repeat(SUMMARY_BODY_CHARS + 1)));
        assert!(summary.ends_with("\n\nAttachments:\n- agenda.pdf\n- roster.xlsx"));

        message.attachments.clear();
        assert!(compose_summary(&message).ends_with("..."));
    }

    #[test]
    fn convert_message_builds_completed_draft() {
        let draft = convert_message(&fixture_message(), &DomainMappings::default());
        assert_eq!(draft.date, must_date("2026-03-04"));
        assert_eq!(draft.engagement_type, "Training");
        assert_eq!(draft.unit.as_deref(), Some("Navy"));
        assert_eq!(draft.status, IMPORTED_ENGAGEMENT_STATUS);
        assert_eq!(draft.action_items, "- action required: send roster\n  by friday");
        assert_eq!(draft.participants[0], "Dana Whitfield");
        assert_eq!(draft.attachments.len(), 2);
    }

    #[test]
    fn preview_lists_each_draft() {
        let draft = convert_message(&fixture_message(), &DomainMappings::default());
        let preview = must_ok(render_import_preview(&[draft]));
        assert!(preview.starts_with("Email Import Preview:\n\nEmail 1:\nDate: 2026-03-04\n"));
        assert!(preview.contains("Unit: Navy\n"));
        assert!(preview.contains("Attachments: 2\n"));
        assert!(preview.contains(&"-".repeat(DASH_RULE_WIDTH)));
    }

    #[test]
    fn mailbox_stats_rank_senders() {
        let mut second = fixture_message();
        second.sender = "Ops Desk".to_string();
        second.attachments.clear();
        let messages = vec![fixture_message(), second.clone(), second];

        let stats = analyze_messages(&messages);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.total_attachments, 2);
        assert_eq!(stats.top_senders[0].sender, "Ops Desk");
        assert_eq!(stats.top_senders[0].messages, 2);
        assert_eq!(stats.top_senders[1].sender, "Dana Whitfield");
    }

    #[test]
    fn domain_mappings_keep_json_key_order() {
        let mappings = must_ok(DomainMappings::from_json(&json!({
            "lab.example": "Research Lab",
            "example": "Generic",
        })));
        assert_eq!(mappings.entries()[0].0, "lab.example");
        assert_eq!(
            extract_unit("a@LAB.example", &mappings).as_deref(),
            Some("Research Lab")
        );

        assert!(DomainMappings::from_json(&json!(["army.mil"])).is_err());
        assert!(DomainMappings::from_json(&json!({"": "Nobody"})).is_err());
        assert!(DomainMappings::from_json(&json!({"x.mil": 3})).is_err());
        assert!(DomainMappings::from_json(&json!({})).is_err());
    }

    #[test]
    fn inputs_reject_blank_required_fields() {
        let unit = UnitInput {
            name: "  ".to_string(),
            unit_type: "Support Unit".to_string(),
            ..UnitInput::default()
        };
        assert!(matches!(unit.validate(), Err(TrackerError::Validation(_))));

        assert!(ResearcherInput::named("").validate().is_err());
        assert!(EngagementInput::new(must_date("2026-01-01"), "").validate().is_err());

        let project = ProjectInput {
            name: "Sensor Trial".to_string(),
            start_date: Some(must_date("2026-02-01")),
            end_date: Some(must_date("2026-01-01")),
            ..ProjectInput::default()
        };
        assert!(project.validate().is_err());
    }

    #[test]
    fn iso_dates_round_trip_through_serde() {
        let review = WeeklyReviewInput::new(must_date("2026-01-05"));
        let value = must_ok(serde_json::to_value(&review));
        assert_eq!(value["week_start"], json!("2026-01-05"));
        let decoded: WeeklyReviewInput = must_ok(serde_json::from_value(value));
        assert_eq!(decoded, review);

        assert!(parse_iso_date("2026-13-01").is_err());
        assert!(parse_iso_date("05/01/2026").is_err());
    }

    #[test]
    fn iso_date_format_pads_to_what_parse_accepts() {
        let early = must_date("0987-02-03");
        let text = must_ok(format_iso_date(early));
        assert_eq!(text, "0987-02-03");
        assert_eq!(must_date(&text), early);
    }

    #[test]
    fn report_kind_parse_rejects_unknown_names() {
        for kind in ReportKind::ALL {
            assert_eq!(must_ok(ReportKind::parse(kind.as_str())), kind);
        }
        assert!(matches!(
            ReportKind::parse("contact-list"),
            Err(TrackerError::Configuration(_))
        ));
    }

    #[test]
    fn export_file_name_embeds_timestamp() {
        let at = must_ok(OffsetDateTime::parse(
            "2026-03-04T07:08:09Z",
            &time::format_description::well_known::Rfc3339,
        ));
        assert_eq!(
            must_ok(export_file_name(ReportKind::ProjectStatus, at)),
            "project_status_report_20260304_070809.csv"
        );
    }

    #[test]
    fn unit_report_text_omits_empty_lists() {
        let report = Report {
            period: DateRange::new(must_date("2026-01-01"), must_date("2026-01-31")),
            rows: ReportRows::UnitEngagementSummary(vec![
                UnitEngagementRow {
                    unit: "Navy".to_string(),
                    engagement_count: 2,
                    projects: vec!["Sensor Trial".to_string()],
                    researchers: vec!["Dana".to_string(), "Lee".to_string()],
                },
                UnitEngagementRow {
                    unit: "Army".to_string(),
                    engagement_count: 0,
                    projects: Vec::new(),
                    researchers: Vec::new(),
                },
            ]),
        };

        let rule = "-".repeat(DASH_RULE_WIDTH);
        let expected = [
            "Unit Engagement Summary Report",
            "Period: 2026-01-01 to 2026-01-31",
            "",
            "Unit: Navy",
            "Total Engagements: 2",
            "Projects Involved:",
            "  - Sensor Trial",
            "Researchers Involved:",
            "  - Dana",
            "  - Lee",
            rule.as_str(),
            "Unit: Army",
            "Total Engagements: 0",
            rule.as_str(),
        ]
        .join("\n");
        assert_eq!(must_ok(report.render_text()), expected);

        let table = must_ok(report.to_table());
        assert_eq!(
            table.columns,
            vec!["Unit", "Total Engagements", "Projects", "Researchers"]
        );
        assert_eq!(table.rows[0], vec!["Navy", "2", "Sensor Trial", "Dana, Lee"]);
        assert_eq!(table.rows[1], vec!["Army", "0", "", ""]);
    }

    #[test]
    fn weekly_review_text_separates_sections_after_summary() {
        let report = Report {
            period: DateRange::new(must_date("2026-01-01"), must_date("2026-01-31")),
            rows: ReportRows::WeeklyReviewSummary(vec![
                WeeklyReviewRow {
                    week_start: must_date("2026-01-12"),
                    summary: Some("Kickoff".to_string()),
                    highlights: None,
                    challenges: Some("Weather".to_string()),
                    next_steps: None,
                },
                WeeklyReviewRow {
                    week_start: must_date("2026-01-05"),
                    summary: None,
                    highlights: Some("Field test passed".to_string()),
                    challenges: Some(String::new()),
                    next_steps: Some("Schedule debrief".to_string()),
                },
            ]),
        };

        let rule = "-".repeat(DASH_RULE_WIDTH);
        let lines = must_ok(report.text_lines());
        assert_eq!(
            &lines[3..],
            &[
                "Week Starting: 2026-01-12",
                "Summary:",
                "Kickoff",
                "",
                "Challenges:",
                "Weather",
                rule.as_str(),
                "Week Starting: 2026-01-05",
                "",
                "Highlights:",
                "Field test passed",
                "",
                "Next Steps:",
                "Schedule debrief",
                rule.as_str(),
            ]
        );
    }

    #[test]
    fn project_status_defaults_to_not_started() {
        let report = Report {
            period: DateRange::new(must_date("2026-01-01"), must_date("2026-01-31")),
            rows: ReportRows::ProjectStatus(vec![ProjectStatusRow {
                project: "Sensor Trial".to_string(),
                status: None,
                engagement_count: 0,
                units: Vec::new(),
                researchers: Vec::new(),
            }]),
        };
        assert!(must_ok(report.render_text()).contains("Status: Not Started\n"));
        assert_eq!(must_ok(report.to_table()).rows[0][1], "");
    }

    #[test]
    fn concat_names_are_split_and_trimmed() {
        assert_eq!(
            split_concat_names(Some("Navy, Army,,  Coast Guard ")),
            vec!["Navy", "Army", "Coast Guard"]
        );
        assert!(split_concat_names(None).is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = must_ok(DateRange::parse("2026-01-01", "2026-01-31"));
        assert!(range.contains(must_date("2026-01-31")));
        assert!(!range.contains(must_date("2026-02-01")));
        assert_eq!(range.to_string(), "2026-01-01 to 2026-01-31");
    }
}
