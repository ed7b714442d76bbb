#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use engagement_tracker_core::{
    convert_message, format_iso_date, parse_iso_date, split_concat_names, DateRange,
    DomainMappings, Engagement, EngagementDraft, EngagementId, EngagementInput,
    EngagementOverview, MailMessage, NamedTable, Project, ProjectId, ProjectInput,
    ProjectStatusRow, Report, ReportKind, ReportRows, Researcher, ResearcherActivityRow,
    ResearcherId, ResearcherInput, ReviewId, TrackerError, Unit, UnitEngagementRow, UnitId,
    UnitInput, WeeklyReview, WeeklyReviewInput, WeeklyReviewRow, IMPORTED_UNIT_TYPE,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

const TRACKER_MIGRATION_VERSION: i64 = 1;

const SCHEMA_TRACKER_V1: &str = r"
CREATE TABLE IF NOT EXISTS units (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  unit_type TEXT NOT NULL,
  location TEXT,
  commander TEXT,
  point_of_contact TEXT,
  notes TEXT
);

CREATE TABLE IF NOT EXISTS researchers (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  department TEXT,
  expertise TEXT,
  email TEXT,
  phone TEXT,
  notes TEXT
);

CREATE TABLE IF NOT EXISTS projects (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  status TEXT,
  start_date TEXT,
  end_date TEXT,
  description TEXT,
  notes TEXT
);

CREATE TABLE IF NOT EXISTS engagements (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  engagement_date TEXT NOT NULL,
  engagement_type TEXT NOT NULL,
  unit_id INTEGER,
  project_id INTEGER,
  summary TEXT,
  status TEXT,
  action_items TEXT,
  FOREIGN KEY (unit_id) REFERENCES units(id),
  FOREIGN KEY (project_id) REFERENCES projects(id)
);

CREATE TABLE IF NOT EXISTS weekly_reviews (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  week_start TEXT NOT NULL,
  summary TEXT,
  highlights TEXT,
  challenges TEXT,
  next_steps TEXT
);

CREATE TABLE IF NOT EXISTS engagement_participants (
  engagement_id INTEGER NOT NULL,
  researcher_id INTEGER NOT NULL,
  PRIMARY KEY (engagement_id, researcher_id),
  FOREIGN KEY (engagement_id) REFERENCES engagements(id),
  FOREIGN KEY (researcher_id) REFERENCES researchers(id)
);

CREATE INDEX IF NOT EXISTS idx_units_name ON units(name, id);
CREATE INDEX IF NOT EXISTS idx_researchers_name ON researchers(name, id);
CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name, id);
CREATE INDEX IF NOT EXISTS idx_engagements_date ON engagements(engagement_date, id);
CREATE INDEX IF NOT EXISTS idx_engagements_unit ON engagements(unit_id);
CREATE INDEX IF NOT EXISTS idx_engagements_project ON engagements(project_id);
CREATE INDEX IF NOT EXISTS idx_participants_researcher
  ON engagement_participants(researcher_id, engagement_id);
CREATE INDEX IF NOT EXISTS idx_weekly_reviews_week ON weekly_reviews(week_start, id);
";

const ENGAGEMENT_COLUMNS: &str = "e.id, e.engagement_date, e.engagement_type, e.unit_id, \
     e.project_id, e.summary, e.status, e.action_items";

/// Message supplier consumed by the importer.
pub trait MailSource {
    /// Returns the messages of `folder`, newest first.
    fn fetch(&self, folder: &str) -> Result<Vec<MailMessage>>;
}

pub struct SqliteTrackerStore {
    conn: Connection,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub created_units: usize,
    pub created_researchers: usize,
    pub engagement_ids: Vec<EngagementId>,
}

impl SqliteTrackerStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        // Deletes never cascade; dependents keep dangling ids.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = OFF;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );",
            )
            .context("failed to ensure schema_migrations exists")?;

        ensure_existing_layout(&self.conn)?;

        self.conn
            .execute_batch(SCHEMA_TRACKER_V1)
            .context("failed to apply tracker schema")?;

        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format migration timestamp")?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![TRACKER_MIGRATION_VERSION, now],
            )
            .context("failed to register tracker schema migration")?;

        debug!(
            version = TRACKER_MIGRATION_VERSION,
            newly_applied = inserted > 0,
            "tracker schema ready"
        );
        Ok(())
    }

    pub fn create_unit(&mut self, input: &UnitInput) -> Result<UnitId> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start unit transaction")?;
        let id = insert_unit(&tx, input)?;
        tx.commit().context("failed to commit unit transaction")?;
        Ok(id)
    }

    pub fn update_unit(&mut self, id: UnitId, input: &UnitInput) -> Result<()> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start unit transaction")?;
        let changed = tx
            .execute(
                "UPDATE units
                 SET name = ?2, unit_type = ?3, location = ?4, commander = ?5,
                     point_of_contact = ?6, notes = ?7
                 WHERE id = ?1",
                params![
                    id.0,
                    input.name,
                    input.unit_type,
                    input.location,
                    input.commander,
                    input.point_of_contact,
                    input.notes,
                ],
            )
            .with_context(|| format!("failed to update unit {id}"))?;
        ensure_changed(changed, "unit", id.0)?;
        tx.commit().context("failed to commit unit transaction")?;
        Ok(())
    }

    pub fn delete_unit(&mut self, id: UnitId) -> Result<()> {
        delete_by_id(&mut self.conn, "units", "unit", id.0)
    }

    pub fn get_unit(&self, id: UnitId) -> Result<Option<Unit>> {
        self.conn
            .query_row(
                "SELECT id, name, unit_type, location, commander, point_of_contact, notes
                 FROM units
                 WHERE id = ?1",
                params![id.0],
                parse_unit_row,
            )
            .optional()
            .with_context(|| format!("failed to load unit {id}"))
    }

    pub fn list_units(&self) -> Result<Vec<Unit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, unit_type, location, commander, point_of_contact, notes
             FROM units
             ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], parse_unit_row)?;
        collect_rows(rows)
    }

    pub fn create_researcher(&mut self, input: &ResearcherInput) -> Result<ResearcherId> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start researcher transaction")?;
        let id = insert_researcher(&tx, input)?;
        tx.commit()
            .context("failed to commit researcher transaction")?;
        Ok(id)
    }

    pub fn update_researcher(&mut self, id: ResearcherId, input: &ResearcherInput) -> Result<()> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start researcher transaction")?;
        let changed = tx
            .execute(
                "UPDATE researchers
                 SET name = ?2, department = ?3, expertise = ?4, email = ?5, phone = ?6, notes = ?7
                 WHERE id = ?1",
                params![
                    id.0,
                    input.name,
                    input.department,
                    input.expertise,
                    input.email,
                    input.phone,
                    input.notes,
                ],
            )
            .with_context(|| format!("failed to update researcher {id}"))?;
        ensure_changed(changed, "researcher", id.0)?;
        tx.commit()
            .context("failed to commit researcher transaction")?;
        Ok(())
    }

    pub fn delete_researcher(&mut self, id: ResearcherId) -> Result<()> {
        delete_by_id(&mut self.conn, "researchers", "researcher", id.0)
    }

    pub fn get_researcher(&self, id: ResearcherId) -> Result<Option<Researcher>> {
        self.conn
            .query_row(
                "SELECT id, name, department, expertise, email, phone, notes
                 FROM researchers
                 WHERE id = ?1",
                params![id.0],
                parse_researcher_row,
            )
            .optional()
            .with_context(|| format!("failed to load researcher {id}"))
    }

    pub fn list_researchers(&self) -> Result<Vec<Researcher>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, department, expertise, email, phone, notes
             FROM researchers
             ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], parse_researcher_row)?;
        collect_rows(rows)
    }

    pub fn create_project(&mut self, input: &ProjectInput) -> Result<ProjectId> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start project transaction")?;
        tx.execute(
            "INSERT INTO projects(name, status, start_date, end_date, description, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                input.name,
                input.status,
                input.start_date.map(format_iso_date).transpose()?,
                input.end_date.map(format_iso_date).transpose()?,
                input.description,
                input.notes,
            ],
        )
        .context("failed to insert project")?;
        let id = ProjectId(tx.last_insert_rowid());
        tx.commit().context("failed to commit project transaction")?;
        Ok(id)
    }

    pub fn update_project(&mut self, id: ProjectId, input: &ProjectInput) -> Result<()> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start project transaction")?;
        let changed = tx
            .execute(
                "UPDATE projects
                 SET name = ?2, status = ?3, start_date = ?4, end_date = ?5,
                     description = ?6, notes = ?7
                 WHERE id = ?1",
                params![
                    id.0,
                    input.name,
                    input.status,
                    input.start_date.map(format_iso_date).transpose()?,
                    input.end_date.map(format_iso_date).transpose()?,
                    input.description,
                    input.notes,
                ],
            )
            .with_context(|| format!("failed to update project {id}"))?;
        ensure_changed(changed, "project", id.0)?;
        tx.commit().context("failed to commit project transaction")?;
        Ok(())
    }

    pub fn delete_project(&mut self, id: ProjectId) -> Result<()> {
        delete_by_id(&mut self.conn, "projects", "project", id.0)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, status, start_date, end_date, description, notes
                 FROM projects
                 WHERE id = ?1",
                params![id.0],
                parse_project_row,
            )
            .optional()
            .with_context(|| format!("failed to load project {id}"))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, status, start_date, end_date, description, notes
             FROM projects
             ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], parse_project_row)?;
        collect_rows(rows)
    }

    /// Inserts the engagement and its participant set in one transaction.
    pub fn create_engagement(
        &mut self,
        input: &EngagementInput,
        participants: &BTreeSet<ResearcherId>,
    ) -> Result<EngagementId> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start engagement transaction")?;
        ensure_engagement_references(&tx, input)?;
        ensure_researchers_exist(&tx, participants)?;

        let id = insert_engagement(&tx, input)?;
        apply_participant_set(&tx, id, participants)?;
        tx.commit()
            .context("failed to commit engagement transaction")?;
        Ok(id)
    }

    pub fn update_engagement(
        &mut self,
        id: EngagementId,
        input: &EngagementInput,
        participants: &BTreeSet<ResearcherId>,
    ) -> Result<()> {
        input.validate()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start engagement transaction")?;
        ensure_engagement_references(&tx, input)?;
        ensure_researchers_exist(&tx, participants)?;

        let changed = tx
            .execute(
                "UPDATE engagements
                 SET engagement_date = ?2, engagement_type = ?3, unit_id = ?4, project_id = ?5,
                     summary = ?6, status = ?7, action_items = ?8
                 WHERE id = ?1",
                params![
                    id.0,
                    format_iso_date(input.date)?,
                    input.engagement_type,
                    input.unit_id.map(|unit| unit.0),
                    input.project_id.map(|project| project.0),
                    input.summary,
                    input.status,
                    input.action_items,
                ],
            )
            .with_context(|| format!("failed to update engagement {id}"))?;
        ensure_changed(changed, "engagement", id.0)?;
        apply_participant_set(&tx, id, participants)?;
        tx.commit()
            .context("failed to commit engagement transaction")?;
        Ok(())
    }

    /// Removes the engagement together with its own participation rows.
    pub fn delete_engagement(&mut self, id: EngagementId) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start engagement delete transaction")?;
        tx.execute(
            "DELETE FROM engagement_participants WHERE engagement_id = ?1",
            params![id.0],
        )
        .with_context(|| format!("failed to delete participants of engagement {id}"))?;
        let changed = tx
            .execute("DELETE FROM engagements WHERE id = ?1", params![id.0])
            .with_context(|| format!("failed to delete engagement {id}"))?;
        ensure_changed(changed, "engagement", id.0)?;
        tx.commit()
            .context("failed to commit engagement delete transaction")?;
        Ok(())
    }

    pub fn get_engagement(&self, id: EngagementId) -> Result<Option<Engagement>> {
        self.conn
            .query_row(
                &format!("SELECT {ENGAGEMENT_COLUMNS} FROM engagements e WHERE e.id = ?1"),
                params![id.0],
                parse_engagement_row,
            )
            .optional()
            .with_context(|| format!("failed to load engagement {id}"))
    }

    pub fn list_engagements(&self) -> Result<Vec<Engagement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENGAGEMENT_COLUMNS}
             FROM engagements e
             ORDER BY e.engagement_date DESC, e.id DESC"
        ))?;
        let rows = stmt.query_map([], parse_engagement_row)?;
        collect_rows(rows)
    }

    /// Engagements newest first with unit, project and participant names.
    pub fn list_engagement_overviews(&self) -> Result<Vec<EngagementOverview>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENGAGEMENT_COLUMNS}, u.name, p.name
             FROM engagements e
             LEFT JOIN units u ON u.id = e.unit_id
             LEFT JOIN projects p ON p.id = e.project_id
             ORDER BY e.engagement_date DESC, e.id DESC"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                parse_engagement_row(row)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })?;

        let mut overviews = Vec::new();
        for (engagement, unit_name, project_name) in collect_rows(rows)? {
            let participants = participant_names(&self.conn, engagement.id)?;
            overviews.push(EngagementOverview {
                engagement,
                unit_name,
                project_name,
                participants,
            });
        }
        Ok(overviews)
    }

    pub fn participants_of(&self, id: EngagementId) -> Result<Vec<ResearcherId>> {
        let ids = current_participants(&self.conn, id)?;
        Ok(ids.into_iter().collect())
    }

    /// Makes the participant set of `id` exactly `researchers`.
    pub fn replace_participants(
        &mut self,
        id: EngagementId,
        researchers: &BTreeSet<ResearcherId>,
    ) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start participant transaction")?;
        if !row_exists(&tx, "engagements", id.0)? {
            return Err(not_found("engagement", id.0));
        }
        ensure_researchers_exist(&tx, researchers)?;
        apply_participant_set(&tx, id, researchers)?;
        tx.commit()
            .context("failed to commit participant transaction")?;
        Ok(())
    }

    pub fn create_review(&mut self, input: &WeeklyReviewInput) -> Result<ReviewId> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start weekly review transaction")?;
        tx.execute(
            "INSERT INTO weekly_reviews(week_start, summary, highlights, challenges, next_steps)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_iso_date(input.week_start)?,
                input.summary,
                input.highlights,
                input.challenges,
                input.next_steps,
            ],
        )
        .context("failed to insert weekly review")?;
        let id = ReviewId(tx.last_insert_rowid());
        tx.commit()
            .context("failed to commit weekly review transaction")?;
        Ok(id)
    }

    pub fn update_review(&mut self, id: ReviewId, input: &WeeklyReviewInput) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start weekly review transaction")?;
        let changed = tx
            .execute(
                "UPDATE weekly_reviews
                 SET week_start = ?2, summary = ?3, highlights = ?4, challenges = ?5, next_steps = ?6
                 WHERE id = ?1",
                params![
                    id.0,
                    format_iso_date(input.week_start)?,
                    input.summary,
                    input.highlights,
                    input.challenges,
                    input.next_steps,
                ],
            )
            .with_context(|| format!("failed to update weekly review {id}"))?;
        ensure_changed(changed, "weekly review", id.0)?;
        tx.commit()
            .context("failed to commit weekly review transaction")?;
        Ok(())
    }

    pub fn delete_review(&mut self, id: ReviewId) -> Result<()> {
        delete_by_id(&mut self.conn, "weekly_reviews", "weekly review", id.0)
    }

    pub fn get_review(&self, id: ReviewId) -> Result<Option<WeeklyReview>> {
        self.conn
            .query_row(
                "SELECT id, week_start, summary, highlights, challenges, next_steps
                 FROM weekly_reviews
                 WHERE id = ?1",
                params![id.0],
                parse_review_row,
            )
            .optional()
            .with_context(|| format!("failed to load weekly review {id}"))
    }

    pub fn list_reviews(&self) -> Result<Vec<WeeklyReview>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, week_start, summary, highlights, challenges, next_steps
             FROM weekly_reviews
             ORDER BY week_start DESC, id DESC",
        )?;
        let rows = stmt.query_map([], parse_review_row)?;
        collect_rows(rows)
    }

    /// Exact-name lookup; the lowest id wins when names repeat.
    pub fn find_by_name(&self, table: NamedTable, name: &str) -> Result<Option<i64>> {
        find_id_by_name(&self.conn, table, name)
    }

    pub fn find_unit_by_name(&self, name: &str) -> Result<Option<UnitId>> {
        Ok(self.find_by_name(NamedTable::Units, name)?.map(UnitId))
    }

    pub fn find_researcher_by_name(&self, name: &str) -> Result<Option<ResearcherId>> {
        Ok(self
            .find_by_name(NamedTable::Researchers, name)?
            .map(ResearcherId))
    }

    pub fn find_project_by_name(&self, name: &str) -> Result<Option<ProjectId>> {
        Ok(self
            .find_by_name(NamedTable::Projects, name)?
            .map(ProjectId))
    }

    pub fn run_report(&self, kind: ReportKind, period: &DateRange) -> Result<Report> {
        let start = format_iso_date(period.start)?;
        let end = format_iso_date(period.end)?;

        let rows = match kind {
            ReportKind::UnitEngagementSummary => {
                let mut stmt = self.conn.prepare(
                    "SELECT u.id, u.name,
                            COUNT(DISTINCT e.id),
                            GROUP_CONCAT(DISTINCT p.name),
                            GROUP_CONCAT(DISTINCT r.name)
                     FROM units u
                     LEFT JOIN engagements e
                       ON e.unit_id = u.id AND e.engagement_date BETWEEN ?1 AND ?2
                     LEFT JOIN projects p ON p.id = e.project_id
                     LEFT JOIN engagement_participants ep ON ep.engagement_id = e.id
                     LEFT JOIN researchers r ON r.id = ep.researcher_id
                     GROUP BY u.id, u.name
                     ORDER BY COUNT(DISTINCT e.id) DESC, u.id ASC",
                )?;
                let rows = stmt.query_map(params![start, end], |row| {
                    Ok(UnitEngagementRow {
                        unit: row.get(1)?,
                        engagement_count: count_column(row, 2)?,
                        projects: names_column(row, 3)?,
                        researchers: names_column(row, 4)?,
                    })
                })?;
                ReportRows::UnitEngagementSummary(collect_rows(rows)?)
            }
            ReportKind::ResearcherActivity => {
                let mut stmt = self.conn.prepare(
                    "SELECT r.id, r.name,
                            COUNT(DISTINCT e.id),
                            GROUP_CONCAT(DISTINCT u.name),
                            GROUP_CONCAT(DISTINCT p.name)
                     FROM researchers r
                     LEFT JOIN engagement_participants ep ON ep.researcher_id = r.id
                     LEFT JOIN engagements e
                       ON e.id = ep.engagement_id AND e.engagement_date BETWEEN ?1 AND ?2
                     LEFT JOIN units u ON u.id = e.unit_id
                     LEFT JOIN projects p ON p.id = e.project_id
                     GROUP BY r.id, r.name
                     ORDER BY COUNT(DISTINCT e.id) DESC, r.id ASC",
                )?;
                let rows = stmt.query_map(params![start, end], |row| {
                    Ok(ResearcherActivityRow {
                        researcher: row.get(1)?,
                        engagement_count: count_column(row, 2)?,
                        units: names_column(row, 3)?,
                        projects: names_column(row, 4)?,
                    })
                })?;
                ReportRows::ResearcherActivity(collect_rows(rows)?)
            }
            ReportKind::ProjectStatus => {
                let mut stmt = self.conn.prepare(
                    "SELECT p.id, p.name, p.status,
                            COUNT(DISTINCT e.id),
                            GROUP_CONCAT(DISTINCT u.name),
                            GROUP_CONCAT(DISTINCT r.name)
                     FROM projects p
                     LEFT JOIN engagements e
                       ON e.project_id = p.id AND e.engagement_date BETWEEN ?1 AND ?2
                     LEFT JOIN units u ON u.id = e.unit_id
                     LEFT JOIN engagement_participants ep ON ep.engagement_id = e.id
                     LEFT JOIN researchers r ON r.id = ep.researcher_id
                     GROUP BY p.id, p.name, p.status
                     ORDER BY COUNT(DISTINCT e.id) DESC, p.id ASC",
                )?;
                let rows = stmt.query_map(params![start, end], |row| {
                    Ok(ProjectStatusRow {
                        project: row.get(1)?,
                        status: row.get(2)?,
                        engagement_count: count_column(row, 3)?,
                        units: names_column(row, 4)?,
                        researchers: names_column(row, 5)?,
                    })
                })?;
                ReportRows::ProjectStatus(collect_rows(rows)?)
            }
            ReportKind::WeeklyReviewSummary => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, week_start, summary, highlights, challenges, next_steps
                     FROM weekly_reviews
                     WHERE week_start BETWEEN ?1 AND ?2
                     ORDER BY week_start DESC, id DESC",
                )?;
                let rows = stmt.query_map(params![start, end], |row| {
                    let review = parse_review_row(row)?;
                    Ok(WeeklyReviewRow {
                        week_start: review.week_start,
                        summary: review.summary,
                        highlights: review.highlights,
                        challenges: review.challenges,
                        next_steps: review.next_steps,
                    })
                })?;
                ReportRows::WeeklyReviewSummary(collect_rows(rows)?)
            }
        };

        debug!(kind = %kind, rows = rows.len(), period = %period, "report aggregated");
        Ok(Report {
            period: *period,
            rows,
        })
    }

    /// Stores each draft in its own transaction.
    ///
    /// Drafts committed before a failure stay committed; the error names how
    /// many were.
    pub fn import_drafts(&mut self, drafts: &[EngagementDraft]) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for (index, draft) in drafts.iter().enumerate() {
            self.import_one(draft, &mut report).with_context(|| {
                format!(
                    "failed to import message {} of {}; {} engagement(s) committed before the failure",
                    index + 1,
                    drafts.len(),
                    report.imported
                )
            })?;
        }

        info!(
            imported = report.imported,
            created_units = report.created_units,
            created_researchers = report.created_researchers,
            "mail import finished"
        );
        Ok(report)
    }

    pub fn import_from_source(
        &mut self,
        source: &dyn MailSource,
        folder: &str,
        mappings: &DomainMappings,
    ) -> Result<ImportReport> {
        let messages = source
            .fetch(folder)
            .with_context(|| format!("failed to fetch messages from folder {folder}"))?;
        let drafts: Vec<EngagementDraft> = messages
            .iter()
            .map(|message| convert_message(message, mappings))
            .collect();
        info!(folder, messages = drafts.len(), "importing mail folder");
        self.import_drafts(&drafts)
    }

    fn import_one(&mut self, draft: &EngagementDraft, report: &mut ImportReport) -> Result<()> {
        let mut input = EngagementInput::new(draft.date, &draft.engagement_type);
        input.summary = Some(draft.summary.clone());
        input.status = Some(draft.status.clone());
        input.action_items = Some(draft.action_items.clone());
        input.validate()?;

        let tx = self
            .conn
            .transaction()
            .context("failed to start import transaction")?;

        let mut created_units = 0;
        if let Some(unit_name) = draft.unit.as_deref() {
            let unit_id = match find_id_by_name(&tx, NamedTable::Units, unit_name)? {
                Some(existing) => UnitId(existing),
                None => {
                    created_units += 1;
                    insert_unit(
                        &tx,
                        &UnitInput {
                            name: unit_name.to_string(),
                            unit_type: IMPORTED_UNIT_TYPE.to_string(),
                            ..UnitInput::default()
                        },
                    )?
                }
            };
            input.unit_id = Some(unit_id);
        }

        let engagement_id = insert_engagement(&tx, &input)?;

        let mut created_researchers = 0;
        let mut participants = BTreeSet::new();
        for name in &draft.participants {
            let researcher_id = match find_id_by_name(&tx, NamedTable::Researchers, name)? {
                Some(existing) => ResearcherId(existing),
                None => {
                    created_researchers += 1;
                    insert_researcher(&tx, &ResearcherInput::named(name))?
                }
            };
            participants.insert(researcher_id);
        }
        apply_participant_set(&tx, engagement_id, &participants)?;

        tx.commit().context("failed to commit import transaction")?;

        report.imported += 1;
        report.created_units += created_units;
        report.created_researchers += created_researchers;
        report.engagement_ids.push(engagement_id);
        Ok(())
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn not_found(entity: &str, id: i64) -> anyhow::Error {
    TrackerError::NotFound(format!("{entity} {id} does not exist")).into()
}

fn ensure_changed(changed: usize, entity: &str, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(not_found(entity, id));
    }
    Ok(())
}

fn delete_by_id(conn: &mut Connection, table: &str, entity: &str, id: i64) -> Result<()> {
    let tx = conn
        .transaction()
        .with_context(|| format!("failed to start {entity} delete transaction"))?;
    let changed = tx
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .with_context(|| format!("failed to delete {entity} {id}"))?;
    ensure_changed(changed, entity, id)?;
    tx.commit()
        .with_context(|| format!("failed to commit {entity} delete transaction"))?;
    Ok(())
}

fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let exists = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1 LIMIT 1"),
            params![id],
            |_| Ok(()),
        )
        .optional()
        .with_context(|| format!("failed to look up {table} id {id}"))?
        .is_some();
    Ok(exists)
}

fn ensure_engagement_references(conn: &Connection, input: &EngagementInput) -> Result<()> {
    if let Some(unit_id) = input.unit_id {
        if !row_exists(conn, "units", unit_id.0)? {
            return Err(TrackerError::Validation(format!(
                "engagement references missing unit {unit_id}"
            ))
            .into());
        }
    }
    if let Some(project_id) = input.project_id {
        if !row_exists(conn, "projects", project_id.0)? {
            return Err(TrackerError::Validation(format!(
                "engagement references missing project {project_id}"
            ))
            .into());
        }
    }
    Ok(())
}

fn ensure_researchers_exist(conn: &Connection, researchers: &BTreeSet<ResearcherId>) -> Result<()> {
    for researcher_id in researchers {
        if !row_exists(conn, "researchers", researcher_id.0)? {
            return Err(TrackerError::Validation(format!(
                "participant references missing researcher {researcher_id}"
            ))
            .into());
        }
    }
    Ok(())
}

fn find_id_by_name(conn: &Connection, table: NamedTable, name: &str) -> Result<Option<i64>> {
    let found = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE name = ?1 ORDER BY id ASC LIMIT 1",
                table.table_name()
            ),
            params![name],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .with_context(|| format!("failed to look up {} by name", table.table_name()))?;
    debug!(table = table.table_name(), name, found = ?found, "name lookup");
    Ok(found)
}

fn insert_unit(conn: &Connection, input: &UnitInput) -> Result<UnitId> {
    conn.execute(
        "INSERT INTO units(name, unit_type, location, commander, point_of_contact, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.name,
            input.unit_type,
            input.location,
            input.commander,
            input.point_of_contact,
            input.notes,
        ],
    )
    .context("failed to insert unit")?;
    Ok(UnitId(conn.last_insert_rowid()))
}

fn insert_researcher(conn: &Connection, input: &ResearcherInput) -> Result<ResearcherId> {
    conn.execute(
        "INSERT INTO researchers(name, department, expertise, email, phone, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.name,
            input.department,
            input.expertise,
            input.email,
            input.phone,
            input.notes,
        ],
    )
    .context("failed to insert researcher")?;
    Ok(ResearcherId(conn.last_insert_rowid()))
}

fn insert_engagement(conn: &Connection, input: &EngagementInput) -> Result<EngagementId> {
    conn.execute(
        "INSERT INTO engagements(
            engagement_date, engagement_type, unit_id, project_id, summary, status, action_items
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            format_iso_date(input.date)?,
            input.engagement_type,
            input.unit_id.map(|unit| unit.0),
            input.project_id.map(|project| project.0),
            input.summary,
            input.status,
            input.action_items,
        ],
    )
    .context("failed to insert engagement")?;
    Ok(EngagementId(conn.last_insert_rowid()))
}

fn current_participants(conn: &Connection, id: EngagementId) -> Result<BTreeSet<ResearcherId>> {
    let mut stmt = conn.prepare(
        "SELECT researcher_id
         FROM engagement_participants
         WHERE engagement_id = ?1
         ORDER BY researcher_id ASC",
    )?;
    let rows = stmt.query_map(params![id.0], |row| row.get::<_, i64>(0).map(ResearcherId))?;
    Ok(collect_rows(rows)?.into_iter().collect())
}

fn apply_participant_set(
    conn: &Connection,
    id: EngagementId,
    wanted: &BTreeSet<ResearcherId>,
) -> Result<()> {
    let existing = current_participants(conn, id)?;

    for removed in existing.difference(wanted) {
        conn.execute(
            "DELETE FROM engagement_participants WHERE engagement_id = ?1 AND researcher_id = ?2",
            params![id.0, removed.0],
        )
        .with_context(|| format!("failed to remove researcher {removed} from engagement {id}"))?;
    }

    for added in wanted.difference(&existing) {
        conn.execute(
            "INSERT INTO engagement_participants(engagement_id, researcher_id) VALUES (?1, ?2)",
            params![id.0, added.0],
        )
        .with_context(|| format!("failed to add researcher {added} to engagement {id}"))?;
    }

    Ok(())
}

fn participant_names(conn: &Connection, id: EngagementId) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT r.name
         FROM engagement_participants ep
         JOIN researchers r ON r.id = ep.researcher_id
         WHERE ep.engagement_id = ?1
         ORDER BY r.name ASC, r.id ASC",
    )?;
    let rows = stmt.query_map(params![id.0], |row| row.get::<_, String>(0))?;
    collect_rows(rows)
}

fn ensure_existing_layout(conn: &Connection) -> Result<()> {
    let expected: [(&str, &[&str]); 6] = [
        ("units", &["id", "name", "unit_type"]),
        ("researchers", &["id", "name"]),
        ("projects", &["id", "name", "status"]),
        (
            "engagements",
            &["id", "engagement_date", "engagement_type", "unit_id", "project_id"],
        ),
        ("weekly_reviews", &["id", "week_start"]),
        ("engagement_participants", &["engagement_id", "researcher_id"]),
    ];

    for (table_name, columns) in expected {
        if table_exists(conn, table_name)? {
            ensure_table_has_columns(conn, table_name, columns)?;
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT 1
             FROM sqlite_master
             WHERE type = 'table' AND name = ?1
             LIMIT 1",
            params![table_name],
            |_| Ok(()),
        )
        .optional()
        .context("failed to query sqlite_master")?
        .is_some();

    Ok(exists)
}

fn ensure_table_has_columns(conn: &Connection, table_name: &str, columns: &[&str]) -> Result<()> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table_name})"))
        .with_context(|| format!("failed to inspect table_info for {table_name}"))?;
    let mut rows = stmt.query([])?;

    let mut available = Vec::new();
    while let Some(row) = rows.next()? {
        available.push(row.get::<_, String>(1)?);
    }

    for required in columns {
        if !available.iter().any(|candidate| candidate == required) {
            return Err(anyhow!(
                "existing table {table_name} is missing required column {required}"
            ));
        }
    }
    Ok(())
}

fn conversion_error(index: usize, kind: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        kind,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn date_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Date> {
    let raw: String = row.get(index)?;
    parse_iso_date(&raw).map_err(|err| conversion_error(index, Type::Text, err.to_string()))
}

fn optional_date_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Option<Date>> {
    let raw: Option<String> = row.get(index)?;
    raw.as_deref()
        .map(|value| {
            parse_iso_date(value).map_err(|err| conversion_error(index, Type::Text, err.to_string()))
        })
        .transpose()
}

fn count_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(index)?;
    u32::try_from(raw)
        .map_err(|_| conversion_error(index, Type::Integer, format!("invalid count: {raw}")))
}

fn names_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(index)?;
    let mut names = split_concat_names(raw.as_deref());
    names.sort();
    names.dedup();
    Ok(names)
}

fn parse_unit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Unit> {
    Ok(Unit {
        id: UnitId(row.get(0)?),
        name: row.get(1)?,
        unit_type: row.get(2)?,
        location: row.get(3)?,
        commander: row.get(4)?,
        point_of_contact: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn parse_researcher_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Researcher> {
    Ok(Researcher {
        id: ResearcherId(row.get(0)?),
        name: row.get(1)?,
        department: row.get(2)?,
        expertise: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn parse_project_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get(0)?),
        name: row.get(1)?,
        status: row.get(2)?,
        start_date: optional_date_column(row, 3)?,
        end_date: optional_date_column(row, 4)?,
        description: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn parse_engagement_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Engagement> {
    Ok(Engagement {
        id: EngagementId(row.get(0)?),
        date: date_column(row, 1)?,
        engagement_type: row.get(2)?,
        unit_id: row.get::<_, Option<i64>>(3)?.map(UnitId),
        project_id: row.get::<_, Option<i64>>(4)?.map(ProjectId),
        summary: row.get(5)?,
        status: row.get(6)?,
        action_items: row.get(7)?,
    })
}

fn parse_review_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeeklyReview> {
    Ok(WeeklyReview {
        id: ReviewId(row.get(0)?),
        week_start: date_column(row, 1)?,
        summary: row.get(2)?,
        highlights: row.get(3)?,
        challenges: row.get(4)?,
        next_steps: row.get(5)?,
    })
}

fn collect_rows<T>(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>>,
) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for row in rows {
        values.push(row?);
    }
    Ok(values)
}
