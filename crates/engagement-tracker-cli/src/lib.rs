//! Command surface for the engagement tracker.
//!
//! Embedders can drive the tracker through:
//! - [`run_cli`] for full parsed CLI execution.
//! - [`run_tracker_with_db`] for direct [`TrackerCommand`] execution against a DB path.
//! - [`run_tracker`] for execution against an existing [`SqliteTrackerStore`].
//!
//! Command results are printed to stdout as pretty JSON; reports and import
//! previews print as text unless JSON is requested.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use engagement_tracker_core::{
    analyze_messages, convert_message, export_file_name, parse_iso_date, render_import_preview,
    DateRange, DomainMappings, EngagementDraft, EngagementId, EngagementInput, MailMessage,
    ProjectId, ProjectInput, Report, ReportKind, ResearcherId, ResearcherInput, ReviewId,
    TrackerError, UnitId, UnitInput, WeeklyReviewInput,
};
use engagement_tracker_store_sqlite::{MailSource, SqliteTrackerStore};
use serde_json::json;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

pub const DEFAULT_MAIL_FOLDER: &str = "Engagements";

#[derive(Debug, Parser)]
#[command(name = "etrack")]
#[command(about = "Engagement tracker CLI")]
pub struct Cli {
    #[arg(long, default_value = "./engagement_tracker.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: TrackerCommand,
}

#[derive(Debug, Subcommand)]
pub enum TrackerCommand {
    Unit {
        #[command(subcommand)]
        command: Box<UnitCommand>,
    },
    Researcher {
        #[command(subcommand)]
        command: Box<ResearcherCommand>,
    },
    Project {
        #[command(subcommand)]
        command: Box<ProjectCommand>,
    },
    Engagement {
        #[command(subcommand)]
        command: Box<EngagementCommand>,
    },
    Review {
        #[command(subcommand)]
        command: Box<ReviewCommand>,
    },
    Report {
        #[command(subcommand)]
        command: Box<ReportCommand>,
    },
    Import {
        #[command(subcommand)]
        command: Box<ImportCommand>,
    },
}

#[derive(Debug, Args)]
pub struct IdArgs {
    #[arg(long)]
    id: i64,
}

#[derive(Debug, Subcommand)]
pub enum UnitCommand {
    Add(UnitArgs),
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: UnitArgs,
    },
    Delete(IdArgs),
    Show(IdArgs),
    List,
}

#[derive(Debug, Args)]
pub struct UnitArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "type")]
    unit_type: String,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    commander: Option<String>,
    #[arg(long)]
    point_of_contact: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ResearcherCommand {
    Add(ResearcherArgs),
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: ResearcherArgs,
    },
    Delete(IdArgs),
    Show(IdArgs),
    List,
}

#[derive(Debug, Args)]
pub struct ResearcherArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    expertise: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    Add(ProjectArgs),
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: ProjectArgs,
    },
    Delete(IdArgs),
    Show(IdArgs),
    List,
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    end_date: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum EngagementCommand {
    Add(EngagementArgs),
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: EngagementArgs,
    },
    Delete(IdArgs),
    Show(IdArgs),
    List,
    /// Replace the participant set of an engagement.
    Participants(ParticipantsArgs),
}

#[derive(Debug, Args)]
pub struct EngagementArgs {
    #[arg(long)]
    date: String,
    #[arg(long = "type")]
    engagement_type: String,
    #[arg(long)]
    unit_id: Option<i64>,
    #[arg(long)]
    project_id: Option<i64>,
    #[arg(long)]
    summary: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    action_items: Option<String>,
    #[arg(long = "participant")]
    participants: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct ParticipantsArgs {
    #[arg(long)]
    id: i64,
    #[arg(long = "researcher")]
    researchers: Vec<i64>,
}

#[derive(Debug, Subcommand)]
pub enum ReviewCommand {
    Add(ReviewArgs),
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        fields: ReviewArgs,
    },
    Delete(IdArgs),
    Show(IdArgs),
    List,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    #[arg(long)]
    week_start: String,
    #[arg(long)]
    summary: Option<String>,
    #[arg(long)]
    highlights: Option<String>,
    #[arg(long)]
    challenges: Option<String>,
    #[arg(long)]
    next_steps: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    Run {
        #[command(flatten)]
        selection: ReportSelectionArgs,
        #[arg(long)]
        json: bool,
    },
    Export {
        #[command(flatten)]
        selection: ReportSelectionArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct ReportSelectionArgs {
    #[arg(long, value_parser = parse_report_kind)]
    kind: ReportKind,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
}

#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    Preview(MailFolderArgs),
    Run(MailFolderArgs),
    Analyze(MailFolderArgs),
}

#[derive(Debug, Args)]
pub struct MailFolderArgs {
    #[arg(long, default_value = "./mail")]
    mail_root: PathBuf,
    #[arg(long, default_value = DEFAULT_MAIL_FOLDER)]
    folder: String,
    #[arg(long)]
    domain_map: Option<PathBuf>,
}

/// Mail folders stored as `<root>/<folder>.json` arrays of messages.
#[derive(Debug, Clone)]
pub struct JsonFolderSource {
    root: PathBuf,
}

impl JsonFolderSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join(format!("{folder}.json"))
    }
}

impl MailSource for JsonFolderSource {
    fn fetch(&self, folder: &str) -> Result<Vec<MailMessage>> {
        let path = self.folder_path(folder);
        if !path.exists() {
            fs::create_dir_all(&self.root).with_context(|| {
                format!("failed to create mail root {}", self.root.display())
            })?;
            fs::write(&path, "[]\n")
                .with_context(|| format!("failed to create mail folder {}", path.display()))?;
            warn!(folder, path = %path.display(), "mail folder was missing; created it empty");
            return Ok(Vec::new());
        }

        let body = fs::read_to_string(&path)
            .with_context(|| format!("failed to read mail folder {}", path.display()))?;
        let mut messages: Vec<MailMessage> = serde_json::from_str(&body)
            .with_context(|| format!("failed to parse mail folder {}", path.display()))?;
        messages.sort_by(|lhs, rhs| rhs.received.cmp(&lhs.received));
        Ok(messages)
    }
}

/// Writes report tables as CSV files into one directory.
#[derive(Debug, Clone)]
pub struct CsvExportSink {
    dir: PathBuf,
}

impl CsvExportSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the header row and every data row, returning the file path.
    ///
    /// # Errors
    /// Returns an error when the directory or file cannot be written.
    pub fn write(&self, report: &Report, at: OffsetDateTime) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create export directory {}", self.dir.display()))?;
        let path = self.dir.join(export_file_name(report.kind(), at)?);

        let table = report.to_table()?;
        let mut writer = csv::WriterBuilder::new()
            .from_path(&path)
            .with_context(|| format!("failed to create export file {}", path.display()))?;
        writer
            .write_record(&table.columns)
            .context("failed to write export header")?;
        for row in &table.rows {
            writer
                .write_record(row)
                .context("failed to write export row")?;
        }
        writer.flush().context("failed to flush export file")?;

        info!(kind = %report.kind(), rows = table.rows.len(), path = %path.display(), "report exported");
        Ok(path)
    }
}

/// Executes a parsed CLI invocation.
///
/// # Errors
/// Returns an error when store open/migrate fails or the requested command fails.
pub fn run_cli(cli: Cli) -> Result<()> {
    run_tracker_with_db(&cli.db, cli.command)
}

/// Executes a parsed tracker command using the provided `SQLite` DB path.
///
/// # Errors
/// Returns an error when store open/migrate fails or the requested command fails.
pub fn run_tracker_with_db(db_path: &Path, command: TrackerCommand) -> Result<()> {
    let mut store = SqliteTrackerStore::open(db_path)?;
    store.migrate()?;
    run_tracker(command, &mut store)
}

/// Executes a parsed tracker command against an existing store handle.
///
/// # Errors
/// Returns an error when validation, persistence, report or import operations fail.
pub fn run_tracker(command: TrackerCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        TrackerCommand::Unit { command } => run_unit(*command, store),
        TrackerCommand::Researcher { command } => run_researcher(*command, store),
        TrackerCommand::Project { command } => run_project(*command, store),
        TrackerCommand::Engagement { command } => run_engagement(*command, store),
        TrackerCommand::Review { command } => run_review(*command, store),
        TrackerCommand::Report { command } => run_report(*command, store),
        TrackerCommand::Import { command } => run_import(*command, store),
    }
}

fn run_unit(command: UnitCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        UnitCommand::Add(args) => {
            let id = store.create_unit(&unit_input(args))?;
            print_json(&store.get_unit(id)?)
        }
        UnitCommand::Update { id, fields } => {
            let id = UnitId(id);
            store.update_unit(id, &unit_input(fields))?;
            print_json(&store.get_unit(id)?)
        }
        UnitCommand::Delete(args) => {
            store.delete_unit(UnitId(args.id))?;
            print_deleted("unit", args.id)
        }
        UnitCommand::Show(args) => {
            let unit = store
                .get_unit(UnitId(args.id))?
                .ok_or_else(|| missing("unit", args.id))?;
            print_json(&unit)
        }
        UnitCommand::List => print_json(&store.list_units()?),
    }
}

fn run_researcher(command: ResearcherCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        ResearcherCommand::Add(args) => {
            let id = store.create_researcher(&researcher_input(args))?;
            print_json(&store.get_researcher(id)?)
        }
        ResearcherCommand::Update { id, fields } => {
            let id = ResearcherId(id);
            store.update_researcher(id, &researcher_input(fields))?;
            print_json(&store.get_researcher(id)?)
        }
        ResearcherCommand::Delete(args) => {
            store.delete_researcher(ResearcherId(args.id))?;
            print_deleted("researcher", args.id)
        }
        ResearcherCommand::Show(args) => {
            let researcher = store
                .get_researcher(ResearcherId(args.id))?
                .ok_or_else(|| missing("researcher", args.id))?;
            print_json(&researcher)
        }
        ResearcherCommand::List => print_json(&store.list_researchers()?),
    }
}

fn run_project(command: ProjectCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        ProjectCommand::Add(args) => {
            let id = store.create_project(&project_input(args)?)?;
            print_json(&store.get_project(id)?)
        }
        ProjectCommand::Update { id, fields } => {
            let id = ProjectId(id);
            store.update_project(id, &project_input(fields)?)?;
            print_json(&store.get_project(id)?)
        }
        ProjectCommand::Delete(args) => {
            store.delete_project(ProjectId(args.id))?;
            print_deleted("project", args.id)
        }
        ProjectCommand::Show(args) => {
            let project = store
                .get_project(ProjectId(args.id))?
                .ok_or_else(|| missing("project", args.id))?;
            print_json(&project)
        }
        ProjectCommand::List => print_json(&store.list_projects()?),
    }
}

fn run_engagement(command: EngagementCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        EngagementCommand::Add(args) => {
            let (input, participants) = engagement_input(args)?;
            let id = store.create_engagement(&input, &participants)?;
            print_engagement(store, id)
        }
        EngagementCommand::Update { id, fields } => {
            let id = EngagementId(id);
            let (input, participants) = engagement_input(fields)?;
            store.update_engagement(id, &input, &participants)?;
            print_engagement(store, id)
        }
        EngagementCommand::Delete(args) => {
            store.delete_engagement(EngagementId(args.id))?;
            print_deleted("engagement", args.id)
        }
        EngagementCommand::Show(args) => print_engagement(store, EngagementId(args.id)),
        EngagementCommand::List => print_json(&store.list_engagement_overviews()?),
        EngagementCommand::Participants(args) => {
            let id = EngagementId(args.id);
            let researchers: BTreeSet<ResearcherId> =
                args.researchers.into_iter().map(ResearcherId).collect();
            store.replace_participants(id, &researchers)?;
            print_engagement(store, id)
        }
    }
}

fn run_review(command: ReviewCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        ReviewCommand::Add(args) => {
            let id = store.create_review(&review_input(args)?)?;
            print_json(&store.get_review(id)?)
        }
        ReviewCommand::Update { id, fields } => {
            let id = ReviewId(id);
            store.update_review(id, &review_input(fields)?)?;
            print_json(&store.get_review(id)?)
        }
        ReviewCommand::Delete(args) => {
            store.delete_review(ReviewId(args.id))?;
            print_deleted("weekly review", args.id)
        }
        ReviewCommand::Show(args) => {
            let review = store
                .get_review(ReviewId(args.id))?
                .ok_or_else(|| missing("weekly review", args.id))?;
            print_json(&review)
        }
        ReviewCommand::List => print_json(&store.list_reviews()?),
    }
}

fn run_report(command: ReportCommand, store: &SqliteTrackerStore) -> Result<()> {
    match command {
        ReportCommand::Run { selection, json } => {
            let report = load_report(&selection, store)?;
            if json {
                print_json(&report)
            } else {
                println!("{}", report.render_text()?);
                Ok(())
            }
        }
        ReportCommand::Export { selection, out_dir } => {
            let report = load_report(&selection, store)?;
            let path = CsvExportSink::new(out_dir).write(&report, OffsetDateTime::now_utc())?;
            print_json(&json!({
                "kind": report.kind(),
                "rows": report.rows.len(),
                "path": path.display().to_string(),
            }))
        }
    }
}

fn run_import(command: ImportCommand, store: &mut SqliteTrackerStore) -> Result<()> {
    match command {
        ImportCommand::Preview(args) => {
            let drafts = load_drafts(&args)?;
            println!("{}", render_import_preview(&drafts)?);
            Ok(())
        }
        ImportCommand::Run(args) => {
            let mappings = load_domain_mappings(args.domain_map.as_deref())?;
            let source = JsonFolderSource::new(args.mail_root);
            let report = store.import_from_source(&source, &args.folder, &mappings)?;
            print_json(&report)
        }
        ImportCommand::Analyze(args) => {
            let messages = JsonFolderSource::new(&args.mail_root).fetch(&args.folder)?;
            print_json(&analyze_messages(&messages))
        }
    }
}

fn load_report(selection: &ReportSelectionArgs, store: &SqliteTrackerStore) -> Result<Report> {
    let period = DateRange::parse(&selection.from, &selection.to)?;
    store.run_report(selection.kind, &period)
}

fn load_drafts(args: &MailFolderArgs) -> Result<Vec<EngagementDraft>> {
    let mappings = load_domain_mappings(args.domain_map.as_deref())?;
    let messages = JsonFolderSource::new(&args.mail_root).fetch(&args.folder)?;
    Ok(messages
        .iter()
        .map(|message| convert_message(message, &mappings))
        .collect())
}

fn load_domain_mappings(path: Option<&Path>) -> Result<DomainMappings> {
    let Some(path) = path else {
        return Ok(DomainMappings::default());
    };
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read domain map {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&body)
        .with_context(|| format!("failed to parse domain map {}", path.display()))?;
    let mappings = DomainMappings::from_json(&value)
        .with_context(|| format!("invalid domain map {}", path.display()))?;
    Ok(mappings)
}

fn parse_report_kind(raw: &str) -> std::result::Result<ReportKind, String> {
    ReportKind::parse(raw).map_err(|err| err.to_string())
}

fn parse_date_arg(field: &str, raw: &str) -> Result<Date> {
    parse_iso_date(raw).with_context(|| format!("invalid --{field}"))
}

fn parse_optional_date_arg(field: &str, raw: Option<&str>) -> Result<Option<Date>> {
    raw.map(|value| parse_date_arg(field, value)).transpose()
}

fn unit_input(args: UnitArgs) -> UnitInput {
    UnitInput {
        name: args.name,
        unit_type: args.unit_type,
        location: args.location,
        commander: args.commander,
        point_of_contact: args.point_of_contact,
        notes: args.notes,
    }
}

fn researcher_input(args: ResearcherArgs) -> ResearcherInput {
    ResearcherInput {
        name: args.name,
        department: args.department,
        expertise: args.expertise,
        email: args.email,
        phone: args.phone,
        notes: args.notes,
    }
}

fn project_input(args: ProjectArgs) -> Result<ProjectInput> {
    Ok(ProjectInput {
        start_date: parse_optional_date_arg("start-date", args.start_date.as_deref())?,
        end_date: parse_optional_date_arg("end-date", args.end_date.as_deref())?,
        name: args.name,
        status: args.status,
        description: args.description,
        notes: args.notes,
    })
}

fn engagement_input(args: EngagementArgs) -> Result<(EngagementInput, BTreeSet<ResearcherId>)> {
    let input = EngagementInput {
        date: parse_date_arg("date", &args.date)?,
        engagement_type: args.engagement_type,
        unit_id: args.unit_id.map(UnitId),
        project_id: args.project_id.map(ProjectId),
        summary: args.summary,
        status: args.status,
        action_items: args.action_items,
    };
    let participants = args.participants.into_iter().map(ResearcherId).collect();
    Ok((input, participants))
}

fn review_input(args: ReviewArgs) -> Result<WeeklyReviewInput> {
    Ok(WeeklyReviewInput {
        week_start: parse_date_arg("week-start", &args.week_start)?,
        summary: args.summary,
        highlights: args.highlights,
        challenges: args.challenges,
        next_steps: args.next_steps,
    })
}

fn missing(entity: &str, id: i64) -> TrackerError {
    TrackerError::NotFound(format!("{entity} {id} does not exist"))
}

fn print_engagement(store: &SqliteTrackerStore, id: EngagementId) -> Result<()> {
    let engagement = store
        .get_engagement(id)?
        .ok_or_else(|| missing("engagement", id.0))?;
    let participants = store.participants_of(id)?;
    print_json(&json!({
        "engagement": engagement,
        "participants": participants,
    }))
}

fn print_deleted(entity: &str, id: i64) -> Result<()> {
    print_json(&json!({ "deleted": entity, "id": id }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::too_many_lines, clippy::manual_let_else)]

    use super::*;
    use engagement_tracker_core::{ReportRows, DEFAULT_ENGAGEMENT_TYPE};
    use rusqlite::Connection;

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err:#}"),
        }
    }

    fn execute_cli(args: Vec<String>) -> Result<()> {
        let cli = Cli::try_parse_from(args)?;
        run_cli(cli)
    }

    fn cli_args(db_path: &Path, rest: &[&str]) -> Vec<String> {
        let mut args = vec![
            "etrack".to_string(),
            "--db".to_string(),
            db_path.display().to_string(),
        ];
        args.extend(rest.iter().map(|arg| (*arg).to_string()));
        args
    }

    fn scratch_dir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => panic!("failed to create temp dir: {err}"),
        }
    }

    fn open_store(db_path: &Path) -> SqliteTrackerStore {
        let store = must(SqliteTrackerStore::open(db_path));
        must(store.migrate());
        store
    }

    fn write_mail_folder(root: &Path, folder: &str, body: &str) {
        if let Err(err) = fs::create_dir_all(root) {
            panic!("failed to create mail root: {err}");
        }
        if let Err(err) = fs::write(root.join(format!("{folder}.json")), body) {
            panic!("failed to write mail folder: {err}");
        }
    }

    const MAIL_FOLDER: &str = r#"[
      {
        "subject": "Status update",
        "sender": "Dana Whitfield",
        "to": "ops@army.mil",
        "cc": "",
        "received": "2026-03-01T09:00:00Z",
        "body": "All good."
      },
      {
        "subject": "Training kickoff",
        "sender": "Dana Whitfield",
        "to": "Capt. Lee <lee.k@navy.mil>",
        "received": "2026-03-05T09:00:00Z",
        "body": "Please confirm headcount.\nBy Monday",
        "attachments": ["agenda.pdf"]
      }
    ]"#;

    #[test]
    fn report_kind_argument_rejects_unknown_kinds() {
        let parsed = Cli::try_parse_from([
            "etrack",
            "report",
            "run",
            "--kind",
            "contact-list",
            "--from",
            "2026-01-01",
            "--to",
            "2026-01-31",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "etrack",
            "report",
            "run",
            "--kind",
            "researcher-activity",
            "--from",
            "2026-01-01",
            "--to",
            "2026-01-31",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn entity_commands_round_trip_through_store() {
        let dir = scratch_dir();
        let db_path = dir.path().join("tracker.sqlite3");

        must(execute_cli(cli_args(
            &db_path,
            &["unit", "add", "--name", "Navy", "--type", "Research Unit"],
        )));
        must(execute_cli(cli_args(
            &db_path,
            &["researcher", "add", "--name", "Dana", "--department", "Signals"],
        )));
        must(execute_cli(cli_args(
            &db_path,
            &[
                "project",
                "add",
                "--name",
                "Sensor Trial",
                "--status",
                "Planning",
                "--start-date",
                "2026-01-01",
            ],
        )));
        must(execute_cli(cli_args(
            &db_path,
            &[
                "engagement",
                "add",
                "--date",
                "2026-01-15",
                "--type",
                "Meeting",
                "--unit-id",
                "1",
                "--project-id",
                "1",
                "--participant",
                "1",
            ],
        )));
        must(execute_cli(cli_args(
            &db_path,
            &["unit", "update", "--id", "1", "--name", "Navy", "--type", "Support Unit"],
        )));

        let store = open_store(&db_path);
        let unit = must(store.get_unit(UnitId(1)));
        assert_eq!(unit.map(|unit| unit.unit_type).as_deref(), Some("Support Unit"));
        let overviews = must(store.list_engagement_overviews());
        assert_eq!(overviews.len(), 1);
        assert_eq!(overviews[0].unit_name.as_deref(), Some("Navy"));
        assert_eq!(overviews[0].project_name.as_deref(), Some("Sensor Trial"));
        assert_eq!(overviews[0].participants, vec!["Dana"]);
    }

    #[test]
    fn participants_command_replaces_set() {
        let dir = scratch_dir();
        let db_path = dir.path().join("tracker.sqlite3");

        for name in ["Dana", "Lee", "Kim"] {
            must(execute_cli(cli_args(&db_path, &["researcher", "add", "--name", name])));
        }
        must(execute_cli(cli_args(
            &db_path,
            &["engagement", "add", "--date", "2026-01-15", "--type", "Demo", "--participant", "1"],
        )));
        for _ in 0..2 {
            must(execute_cli(cli_args(
                &db_path,
                &["engagement", "participants", "--id", "1", "--researcher", "2", "--researcher", "3"],
            )));
        }

        let conn = match Connection::open(&db_path) {
            Ok(conn) => conn,
            Err(err) => panic!("failed to open db: {err}"),
        };
        let rows: i64 = match conn.query_row(
            "SELECT COUNT(*) FROM engagement_participants WHERE engagement_id = 1",
            [],
            |row| row.get(0),
        ) {
            Ok(value) => value,
            Err(err) => panic!("failed to count participants: {err}"),
        };
        assert_eq!(rows, 2);
    }

    #[test]
    fn missing_ids_and_blank_fields_fail() {
        let dir = scratch_dir();
        let db_path = dir.path().join("tracker.sqlite3");

        let err = match execute_cli(cli_args(&db_path, &["unit", "delete", "--id", "9"])) {
            Ok(()) => panic!("expected not found"),
            Err(err) => err,
        };
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound(_))
        ));

        let err = match execute_cli(cli_args(&db_path, &["researcher", "add", "--name", " "])) {
            Ok(()) => panic!("expected validation failure"),
            Err(err) => err,
        };
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Validation(_))
        ));

        assert!(execute_cli(cli_args(
            &db_path,
            &["engagement", "add", "--date", "15/01/2026", "--type", "Demo"],
        ))
        .is_err());
    }

    #[test]
    fn json_folder_source_creates_missing_folder() {
        let dir = scratch_dir();
        let root = dir.path().join("mail");
        let source = JsonFolderSource::new(&root);

        let messages = must(source.fetch("Engagements"));
        assert!(messages.is_empty());
        let body = match fs::read_to_string(source.folder_path("Engagements")) {
            Ok(body) => body,
            Err(err) => panic!("folder file should exist: {err}"),
        };
        assert_eq!(body.trim(), "[]");
    }

    #[test]
    fn json_folder_source_returns_newest_first() {
        let dir = scratch_dir();
        write_mail_folder(dir.path(), "Inbox", MAIL_FOLDER);

        let messages = must(JsonFolderSource::new(dir.path()).fetch("Inbox"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "Training kickoff");
        assert_eq!(messages[1].to, "ops@army.mil");
        assert!(messages[1].attachments.is_empty());
    }

    #[test]
    fn import_run_reuses_sender_researcher() {
        let dir = scratch_dir();
        let db_path = dir.path().join("tracker.sqlite3");
        let mail_root = dir.path().join("mail");
        write_mail_folder(&mail_root, "Inbox", MAIL_FOLDER);
        let mail_root_arg = mail_root.display().to_string();

        must(execute_cli(cli_args(
            &db_path,
            &["import", "run", "--mail-root", &mail_root_arg, "--folder", "Inbox"],
        )));

        let store = open_store(&db_path);
        let researchers: Vec<String> = must(store.list_researchers())
            .into_iter()
            .map(|researcher| researcher.name)
            .collect();
        assert_eq!(researchers, vec!["Capt. Lee", "Dana Whitfield", "ops"]);

        let overviews = must(store.list_engagement_overviews());
        assert_eq!(overviews.len(), 2);
        assert_eq!(overviews[0].engagement.engagement_type, "Training");
        assert_eq!(overviews[0].unit_name.as_deref(), Some("Navy"));
        assert_eq!(overviews[1].engagement.engagement_type, DEFAULT_ENGAGEMENT_TYPE);
        assert_eq!(overviews[1].unit_name.as_deref(), Some("Army"));
    }

    #[test]
    fn import_honours_custom_domain_map() {
        let dir = scratch_dir();
        let mail_root = dir.path().join("mail");
        write_mail_folder(&mail_root, "Inbox", MAIL_FOLDER);
        let map_path = dir.path().join("domains.json");
        if let Err(err) = fs::write(&map_path, r#"{"army.mil": "1st Cavalry"}"#) {
            panic!("failed to write domain map: {err}");
        }

        let args = MailFolderArgs {
            mail_root,
            folder: "Inbox".to_string(),
            domain_map: Some(map_path),
        };
        let drafts = must(load_drafts(&args));
        assert_eq!(drafts[0].unit, None);
        assert_eq!(drafts[1].unit.as_deref(), Some("1st Cavalry"));

        let bad_map = dir.path().join("bad.json");
        if let Err(err) = fs::write(&bad_map, r#"{"": "Nobody"}"#) {
            panic!("failed to write domain map: {err}");
        }
        let err = match load_domain_mappings(Some(&bad_map)) {
            Ok(mappings) => panic!("expected configuration error, got {mappings:?}"),
            Err(err) => err,
        };
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Configuration(_))
        ));
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let dir = scratch_dir();
        let mut store = open_store(&dir.path().join("tracker.sqlite3"));
        let unit = must(store.create_unit(&UnitInput {
            name: "Navy".to_string(),
            unit_type: "Support Unit".to_string(),
            ..UnitInput::default()
        }));
        let mut input = EngagementInput::new(must(parse_date_arg("date", "2026-01-10")), "Demo");
        input.unit_id = Some(unit);
        must(store.create_engagement(&input, &BTreeSet::new()));

        let period = must(DateRange::parse("2026-01-01", "2026-01-31").map_err(Into::into));
        let report = must(store.run_report(ReportKind::UnitEngagementSummary, &period));
        assert!(matches!(report.rows, ReportRows::UnitEngagementSummary(_)));

        let at = must(
            OffsetDateTime::parse(
                "2026-02-01T08:30:00Z",
                &time::format_description::well_known::Rfc3339,
            )
            .map_err(Into::into),
        );
        let out_dir = dir.path().join("exports");
        let path = must(CsvExportSink::new(&out_dir).write(&report, at));
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("unit_engagement_report_20260201_083000.csv")
        );

        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(err) => panic!("failed to read export: {err}"),
        };
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Unit,Total Engagements,Projects,Researchers");
        assert_eq!(lines[1], "Navy,1,,");
    }
}
