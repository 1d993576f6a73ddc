//! LabSense MCP Server Implementation
//!
//! Implements the MCP server with all LabSense tools.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::ReportError;
use crate::history;
use crate::models::{AnalysisRecord, BodyProfile, Gender, MealPlanDay, WorkoutPlanDay};
use crate::providers::{
    load_attachment, AnalysisProvider, Attachment, JsonCompletion, MealPlanRequest, PlanProvider,
    WorkoutPlanRequest,
};
use crate::report::charts::{render_trend_chart, resolve_selection, trend_points};
use crate::report::{compose_report, export_report, PageBox, ReportView, TableOptions};
use crate::session::{Session, Theme};
use crate::tools::status::StatusTracker;

/// LabSense MCP Service
#[derive(Clone)]
pub struct LabSenseService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    session: Arc<Mutex<Session>>,
    /// The most recent analysis, whether fresh or recalled from history
    current: Arc<Mutex<Option<AnalysisRecord>>>,
    /// The composed report for the current analysis
    report: Arc<Mutex<Option<ReportView>>>,
    meal_plan: Arc<Mutex<Option<Vec<MealPlanDay>>>>,
    workout_plan: Arc<Mutex<Option<Vec<WorkoutPlanDay>>>>,
    backend: Option<Arc<dyn JsonCompletion>>,
    tool_router: ToolRouter<LabSenseService>,
}

impl LabSenseService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        backend: Option<Arc<dyn JsonCompletion>>,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            session: Arc::new(Mutex::new(Session::load_from_env())),
            current: Arc::new(Mutex::new(None)),
            report: Arc::new(Mutex::new(None)),
            meal_plan: Arc::new(Mutex::new(None)),
            workout_plan: Arc::new(Mutex::new(None)),
            backend,
            tool_router: Self::tool_router(),
        }
    }

    fn backend(&self) -> Result<Arc<dyn JsonCompletion>, McpError> {
        self.backend.clone().ok_or_else(|| {
            McpError::internal_error(
                "provider endpoint is not configured; set LABSENSE_API_URL and LABSENSE_API_KEY",
                None,
            )
        })
    }

    async fn require_user(&self) -> Result<String, McpError> {
        let session = self.session.lock().await;
        session
            .active_user()
            .map(|u| u.to_string())
            .ok_or_else(|| McpError::invalid_request("no active user; call set_active_user", None))
    }

    async fn require_current(&self) -> Result<AnalysisRecord, McpError> {
        let current = self.current.lock().await;
        current
            .clone()
            .ok_or_else(|| McpError::invalid_request("no analysis loaded; run analyze_labs or get_history_entry", None))
    }
}

fn report_err(e: ReportError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Response Structs
// ============================================================================

#[derive(Debug, Serialize)]
struct AckResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct HistoryEntrySummary {
    index: usize,
    date: String,
    score: f64,
    label: String,
}

#[derive(Debug, Serialize)]
struct ExportResponse {
    success: bool,
    path: String,
    file_name: String,
    pages: usize,
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetActiveUserParams {
    /// Email address identifying the user; history is keyed by it
    pub email: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetThemeParams {
    /// Visual theme: "light" or "dark"
    pub theme: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeLabsParams {
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// "male" or "female"
    pub gender: String,
    pub occupation: String,
    /// Paths to lab report files (PDF or image) to attach
    #[serde(default)]
    pub attachment_paths: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetHistoryEntryParams {
    /// Zero-based index into the list_history output (0 is the newest entry)
    pub index: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HealthTrendParams {
    /// Also render the trend chart as a PNG file at this path (optional)
    pub chart_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SelectTrendPointParams {
    /// Zero-based index of the plotted point in the health_trend series
    /// (0 is the oldest analysis)
    pub index: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectMetricsParams {
    /// Move abnormal metrics ahead of normal ones, preserving relative order
    #[serde(default)]
    pub sort_abnormal_first: bool,
    /// Show only High and Low metrics
    #[serde(default)]
    pub filter_abnormal_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportReportParams {
    /// Directory the PDF is written into (default: current directory)
    pub output_dir: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateMealPlanParams {
    /// Number of days the plan covers
    pub days: u32,
    /// Dietary preferences or restrictions, free text
    #[serde(default)]
    pub preferences: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateWorkoutPlanParams {
    /// Number of days the plan covers
    pub days: u32,
    /// Fitness level, e.g. "beginner"
    pub fitness_level: String,
    /// Training goal, e.g. "general fitness"
    pub goal: String,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl LabSenseService {
    // --- Status ---

    #[tool(description = "Get the current status of the LabSense service including build info, database status, and process information")]
    async fn service_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        json_result(&status)
    }

    // --- Session ---

    #[tool(description = "Set the active user by email. History reads and writes are keyed by this identity.")]
    async fn set_active_user(
        &self,
        Parameters(p): Parameters<SetActiveUserParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        session.sign_in(p.email.clone());
        json_result(&AckResponse {
            success: true,
            message: format!("active user is now {}", p.email),
        })
    }

    #[tool(description = "Sign out the active user. Clears the loaded analysis, the composed report, and any generated plans.")]
    async fn sign_out(&self) -> Result<CallToolResult, McpError> {
        self.session.lock().await.sign_out();
        *self.current.lock().await = None;
        *self.report.lock().await = None;
        *self.meal_plan.lock().await = None;
        *self.workout_plan.lock().await = None;
        json_result(&AckResponse {
            success: true,
            message: "signed out; derived state cleared".to_string(),
        })
    }

    #[tool(description = "Set the visual theme (light or dark). A composed report is recomposed under the new theme.")]
    async fn set_theme(
        &self,
        Parameters(p): Parameters<SetThemeParams>,
    ) -> Result<CallToolResult, McpError> {
        let theme = Theme::from_str(&p.theme)
            .ok_or_else(|| McpError::invalid_params("theme must be \"light\" or \"dark\"", None))?;
        self.session.lock().await.theme = theme;

        let mut report = self.report.lock().await;
        if let Some(view) = report.as_ref() {
            let record = view.record().clone();
            let opts = view.table_options();
            *report = Some(compose_report(&record, opts, theme).map_err(report_err)?);
        }

        json_result(&AckResponse {
            success: true,
            message: format!("theme set to {}", theme.as_str()),
        })
    }

    // --- Analysis ---

    #[tool(description = "Analyze attached lab report files for a body profile. Returns the structured analysis and composes the report for it. The result is held in memory until save_analysis is called.")]
    async fn analyze_labs(
        &self,
        Parameters(p): Parameters<AnalyzeLabsParams>,
    ) -> Result<CallToolResult, McpError> {
        let backend = self.backend()?;
        let gender = Gender::from_str(&p.gender)
            .ok_or_else(|| McpError::invalid_params("gender must be \"male\" or \"female\"", None))?;
        let profile = BodyProfile {
            age: p.age,
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            gender,
            occupation: p.occupation,
        };

        let attachments: Vec<Attachment> = p
            .attachment_paths
            .iter()
            .map(|path| load_attachment(std::path::Path::new(path)))
            .collect::<Result<_, _>>()
            .map_err(report_err)?;

        let provider = AnalysisProvider::new(backend);
        let analysis = provider
            .analyze(&profile, attachments)
            .await
            .map_err(report_err)?;

        let record = AnalysisRecord {
            date: Utc::now(),
            inputs: profile,
            analysis,
        };

        let theme = self.session.lock().await.theme;
        let view = compose_report(&record, TableOptions::default(), theme).map_err(report_err)?;

        let response = json_result(&record)?;
        *self.current.lock().await = Some(record);
        *self.report.lock().await = Some(view);
        Ok(response)
    }

    #[tool(description = "Save the current analysis into the active user's history")]
    async fn save_analysis(&self) -> Result<CallToolResult, McpError> {
        let user = self.require_user().await?;
        let record = self.require_current().await?;

        let id = history::append(&self.database, &user, &record).map_err(report_err)?;
        json_result(&AckResponse {
            success: true,
            message: format!("analysis saved as record {id}"),
        })
    }

    // --- History ---

    #[tool(description = "List the active user's saved analyses, newest first")]
    async fn list_history(&self) -> Result<CallToolResult, McpError> {
        let user = self.require_user().await?;
        let records = history::list_for_user(&self.database, &user).map_err(report_err)?;

        let summaries: Vec<HistoryEntrySummary> = records
            .iter()
            .enumerate()
            .map(|(index, record)| HistoryEntrySummary {
                index,
                date: record.date.format("%d/%m/%Y").to_string(),
                score: record.analysis.overall_health_score.score,
                label: record.analysis.overall_health_score.label.clone(),
            })
            .collect();
        json_result(&summaries)
    }

    #[tool(description = "Load one saved analysis by its list_history index (0 is the newest). Makes it the current analysis and composes its report.")]
    async fn get_history_entry(
        &self,
        Parameters(p): Parameters<GetHistoryEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        let user = self.require_user().await?;
        let records = history::list_for_user(&self.database, &user).map_err(report_err)?;

        let record = records.get(p.index).cloned().ok_or_else(|| {
            McpError::invalid_params(
                format!("index {} out of range; history has {} entries", p.index, records.len()),
                None,
            )
        })?;

        let theme = self.session.lock().await.theme;
        let view = compose_report(&record, TableOptions::default(), theme).map_err(report_err)?;

        let response = json_result(&record)?;
        *self.current.lock().await = Some(record);
        *self.report.lock().await = Some(view);
        Ok(response)
    }

    #[tool(description = "Overall-score trend across the active user's saved analyses, oldest first: one date label (DD/MM/YYYY) and score per analysis. Optionally renders the chart to a PNG file.")]
    async fn health_trend(
        &self,
        Parameters(p): Parameters<HealthTrendParams>,
    ) -> Result<CallToolResult, McpError> {
        let user = self.require_user().await?;
        let mut records = history::list_for_user(&self.database, &user).map_err(report_err)?;
        // list order is newest first; the trend runs chronologically
        records.reverse();

        if let Some(path) = &p.chart_path {
            let theme = self.session.lock().await.theme;
            let png = render_trend_chart(&records, theme, 800, 400)
                .map_err(|e| McpError::internal_error(e, None))?;
            std::fs::write(path, png)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        }

        json_result(&trend_points(&records))
    }

    #[tool(description = "Open the analysis behind one plotted health_trend point, by its index in the series. Selection is index-addressed, so analyses with identical scores stay distinguishable. Makes it the current analysis and composes its report.")]
    async fn select_trend_point(
        &self,
        Parameters(p): Parameters<SelectTrendPointParams>,
    ) -> Result<CallToolResult, McpError> {
        let user = self.require_user().await?;
        let mut records = history::list_for_user(&self.database, &user).map_err(report_err)?;
        // same chronological slice health_trend plots from
        records.reverse();

        let record = resolve_selection(&records, p.index).cloned().ok_or_else(|| {
            McpError::invalid_params(
                format!("index {} out of range; trend has {} points", p.index, records.len()),
                None,
            )
        })?;

        let theme = self.session.lock().await.theme;
        let view = compose_report(&record, TableOptions::default(), theme).map_err(report_err)?;

        let response = json_result(&record)?;
        *self.current.lock().await = Some(record);
        *self.report.lock().await = Some(view);
        Ok(response)
    }

    // --- Report ---

    #[tool(description = "Re-project the metrics table of the composed report: abnormal-first ordering and/or abnormal-only filtering. Returns the projected metric list.")]
    async fn project_metrics(
        &self,
        Parameters(p): Parameters<ProjectMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        let opts = TableOptions {
            sort_abnormal_first: p.sort_abnormal_first,
            filter_abnormal_only: p.filter_abnormal_only,
        };

        let mut report = self.report.lock().await;
        let view = report.as_mut().ok_or_else(|| {
            McpError::invalid_request("no composed report; run analyze_labs or get_history_entry", None)
        })?;
        view.set_table_options(opts);
        json_result(&view.table().to_vec())
    }

    #[tool(description = "Export the composed report as a paginated A4 PDF, one page per section. The file is named Health-Analysis-Report-<date>.pdf.")]
    async fn export_report(
        &self,
        Parameters(p): Parameters<ExportReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let output_dir = PathBuf::from(p.output_dir.unwrap_or_else(|| ".".to_string()));

        let mut report = self.report.lock().await;
        let summary = export_report(report.as_mut(), PageBox::A4, &output_dir)
            .map_err(report_err)?;

        json_result(&ExportResponse {
            success: true,
            path: summary.path.display().to_string(),
            file_name: summary.file_name,
            pages: summary.pages,
        })
    }

    // --- Plans ---

    #[tool(description = "Generate a meal plan grounded in the current analysis")]
    async fn generate_meal_plan(
        &self,
        Parameters(p): Parameters<GenerateMealPlanParams>,
    ) -> Result<CallToolResult, McpError> {
        let backend = self.backend()?;
        let record = self.require_current().await?;

        let provider = PlanProvider::new(backend);
        let plan = provider
            .generate_meal_plan(
                &MealPlanRequest {
                    days: p.days,
                    preferences: p.preferences,
                },
                &record,
            )
            .await
            .map_err(report_err)?;

        let response = json_result(&plan)?;
        *self.meal_plan.lock().await = Some(plan);
        Ok(response)
    }

    #[tool(description = "Generate a workout plan grounded in the current analysis")]
    async fn generate_workout_plan(
        &self,
        Parameters(p): Parameters<GenerateWorkoutPlanParams>,
    ) -> Result<CallToolResult, McpError> {
        let backend = self.backend()?;
        let record = self.require_current().await?;

        let provider = PlanProvider::new(backend);
        let plan = provider
            .generate_workout_plan(
                &WorkoutPlanRequest {
                    days: p.days,
                    fitness_level: p.fitness_level,
                    goal: p.goal,
                },
                &record,
            )
            .await
            .map_err(report_err)?;

        let response = json_result(&plan)?;
        *self.workout_plan.lock().await = Some(plan);
        Ok(response)
    }
}

#[tool_handler]
impl ServerHandler for LabSenseService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "labsense".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("LabSense".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "LabSense - lab-report analysis, health reports, and PDF export. \
                 Session: set_active_user/sign_out/set_theme. \
                 Analysis: analyze_labs (attach lab report files), save_analysis. \
                 History: list_history, get_history_entry (index 0 is newest), health_trend, \
                 select_trend_point (index 0 is oldest). \
                 Report: project_metrics (abnormal-first sort, abnormal-only filter), \
                 export_report (paginated A4 PDF, one page per section). \
                 Plans: generate_meal_plan/generate_workout_plan, grounded in the current analysis. \
                 Service: service_status."
                    .into(),
            ),
        }
    }
}
