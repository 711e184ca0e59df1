//! Session orchestration and builder.

use crate::charts::{ChartResolver, ChartSelector, PlotRenderer};
use crate::config::EdaConfig;
use crate::error::{EdaError, Result, ResultExt};
use crate::imputers::ImputationEngine;
use crate::loader::{DataLoader, UploadedFile};
use crate::session::progress::{
    ClosureProgressReporter, ProgressReporter, ProgressUpdate, SessionStage,
};
use crate::store::{ExportArtifact, PlotStore};
use crate::types::{ChartSpec, ImputationReport, StoredPlot, Table};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A chart that was rendered and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub title: String,
    pub png: Vec<u8>,
}

/// Result of one chart request. A failure here never affects other charts.
#[derive(Debug)]
pub struct ChartOutcome {
    pub spec: ChartSpec,
    pub result: Result<RenderedChart>,
}

impl ChartOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes are serialized without image bytes: title, kind, status and
/// either the PNG size or the error.
impl Serialize for ChartOutcome {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ChartOutcome", 4)?;
        state.serialize_field("title", &self.spec.title)?;
        state.serialize_field("kind", &self.spec.kind)?;
        match &self.result {
            Ok(chart) => {
                state.serialize_field("status", "stored")?;
                state.serialize_field("png_bytes", &chart.png.len())?;
            }
            Err(e) => {
                state.serialize_field("status", "failed")?;
                state.serialize_field("error", e)?;
            }
        }
        state.end()
    }
}

/// An EDA session over one plot store.
///
/// # Example
///
/// ```rust,ignore
/// use lex_eda::{EdaConfig, Session, UploadedFile};
///
/// let mut session = Session::builder()
///     .config(EdaConfig::builder().store_path("plots.db").build()?)
///     .build()?;
///
/// let report = session.load(UploadedFile::from_path("sales.csv")?, None)?;
/// for outcome in session.visualize(&["price", "region"])? {
///     println!("{}: {}", outcome.spec.title, outcome.is_ok());
/// }
/// let artifact = session.export()?;
/// ```
pub struct Session {
    config: EdaConfig,
    store: PlotStore,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    imputer: ImputationEngine,
    selector: ChartSelector,
    resolver: ChartResolver,
    renderer: PlotRenderer,
    rng: StdRng,
    table: Option<Table>,
}

// Sessions may be moved to a worker thread
static_assertions::assert_impl_all!(Session: Send);

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn config(&self) -> &EdaConfig {
        &self.config
    }

    pub fn store(&self) -> &PlotStore {
        &self.store
    }

    /// The cleaned table, once ingested.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Load an upload and ingest it.
    ///
    /// `table` selects the table of a database upload.
    pub fn load(&mut self, upload: UploadedFile, table: Option<&str>) -> Result<ImputationReport> {
        self.report_progress(ProgressUpdate::new(
            SessionStage::Loading,
            0.0,
            format!("Loading {}", upload.name()),
        ));

        let name = upload.name().to_string();
        match DataLoader::load(upload, table).context(format!("Failed to load '{}'", name)) {
            Ok(loaded) => self.ingest(loaded),
            Err(e) => {
                error!("{}", e);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Impute missing values and keep the cleaned table for charting.
    ///
    /// Replaces any previously ingested table.
    pub fn ingest(&mut self, table: Table) -> Result<ImputationReport> {
        self.report_progress(ProgressUpdate::new(
            SessionStage::Cleaning,
            0.0,
            format!(
                "Cleaning {} rows x {} columns",
                table.height(),
                table.width()
            ),
        ));

        let (cleaned, report) = self.imputer.impute(&table)?;
        info!(
            "Ingested table: {} rows, {} -> {} columns",
            report.rows, report.columns_before, report.columns_after
        );
        self.table = Some(cleaned);

        self.report_progress(ProgressUpdate::new(
            SessionStage::Cleaning,
            1.0,
            "Cleaning complete",
        ));
        Ok(report)
    }

    /// Select, render and store the charts for `columns`.
    ///
    /// Fails only when no table is loaded or a column is unknown; render and
    /// store failures are reported per chart.
    pub fn visualize(&mut self, columns: &[&str]) -> Result<Vec<ChartOutcome>> {
        let table = self.table.as_ref().ok_or(EdaError::NoDataLoaded)?;

        self.report_progress(ProgressUpdate::new(
            SessionStage::Selecting,
            0.0,
            format!("Selecting charts for {:?}", columns),
        ));
        let specs = match self.selector.select(table, columns) {
            Ok(specs) => specs,
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                return Err(e);
            }
        };

        let total = specs.len();
        let mut outcomes = Vec::with_capacity(total);
        for (i, spec) in specs.into_iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                SessionStage::Rendering,
                spec.title.clone(),
                i,
                total,
                format!("Rendering chart {} of {}", i + 1, total),
            ));

            let result = self.render_and_store(&spec);
            if let Err(e) = &result {
                warn!("Chart '{}' failed: {}", spec.title, e);
            }
            outcomes.push(ChartOutcome { spec, result });
        }

        // Each chart is stored right after it renders; storing is reported
        // once all charts are through so progress never moves backwards
        let stored = outcomes.iter().filter(|o| o.is_ok()).count();
        self.report_progress(ProgressUpdate::new(
            SessionStage::Storing,
            1.0,
            format!("{} of {} charts in {}", stored, total, self.store.path().display()),
        ));
        info!("Stored {} of {} charts", stored, total);
        self.report_progress(ProgressUpdate::complete(format!(
            "Stored {} of {} charts",
            stored, total
        )));
        Ok(outcomes)
    }

    fn render_and_store(&mut self, spec: &ChartSpec) -> Result<RenderedChart> {
        let table = self.table.as_ref().ok_or(EdaError::NoDataLoaded)?;
        let data = self.resolver.resolve(spec, table, &mut self.rng)?;
        let png = self.renderer.render(spec, &data)?;

        let plot = StoredPlot::new(spec.title.clone(), png);
        self.store.append(&plot)?;

        Ok(RenderedChart {
            title: plot.name,
            png: plot.image,
        })
    }

    /// Export the plot store as `plots.db`.
    pub fn export(&self) -> Result<ExportArtifact> {
        self.store.export()
    }
}

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<EdaConfig>,
    store: Option<PlotStore>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(SessionBuilder: Send);

impl SessionBuilder {
    pub fn config(mut self, config: EdaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already opened store instead of opening `config.store_path`.
    pub fn store(mut self, store: PlotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Validate the configuration and open the store.
    pub fn build(self) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => PlotStore::open(&config.store_path)?,
        };
        let rng = match config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Session {
            imputer: ImputationEngine::new(&config),
            selector: ChartSelector::new(&config),
            resolver: ChartResolver::new(&config),
            renderer: PlotRenderer::new(&config),
            config,
            store,
            progress_reporter: self.progress_reporter,
            rng,
            table: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartKind;
    use polars::prelude::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        let config = EdaConfig::builder()
            .store_path(dir.path().join("plots.db"))
            .image_size(320, 240)
            .sample_seed(1)
            .build()
            .unwrap();
        Session::builder().config(config).build().unwrap()
    }

    fn table() -> Table {
        let df = df![
            "price" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
            "city" => ["Oslo", "Rome", "Oslo", "Lima", "Rome"],
            "empty" => [Option::<f64>::None, None, None, None, None],
        ]
        .unwrap();
        Table::new(df)
    }

    #[test]
    fn test_visualize_requires_data() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        assert!(matches!(
            session.visualize(&["price"]),
            Err(EdaError::NoDataLoaded)
        ));
    }

    #[test]
    fn test_ingest_reports_imputation() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        let report = session.ingest(table()).unwrap();

        assert_eq!(report.dropped_columns(), vec!["empty"]);
        let cleaned = session.table().unwrap();
        assert_eq!(cleaned.column_names(), vec!["price", "city"]);
        assert_eq!(cleaned.series("price").unwrap().null_count(), 0);
    }

    #[test]
    fn test_visualize_stores_each_chart() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        session.ingest(table()).unwrap();

        let outcomes = session.visualize(&["city"]).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(ChartOutcome::is_ok));
        let names: Vec<String> = session
            .store()
            .entries()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Bar Chart: city", "Pie Chart: city"]);
    }

    #[test]
    fn test_visualize_unknown_column() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        session.ingest(table()).unwrap();

        // Dropped during cleaning
        assert!(matches!(
            session.visualize(&["empty"]),
            Err(EdaError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_progress_stages() {
        let dir = TempDir::new().unwrap();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = stages.clone();
        let config = EdaConfig::builder()
            .store_path(dir.path().join("plots.db"))
            .image_size(320, 240)
            .build()
            .unwrap();
        let mut session = Session::builder()
            .config(config)
            .on_progress(move |update| seen.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        session.ingest(table()).unwrap();
        session.visualize(&["price", "city"]).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&SessionStage::Cleaning));
        assert!(stages.contains(&SessionStage::Selecting));
        assert!(stages.contains(&SessionStage::Rendering));
        assert!(stages.contains(&SessionStage::Storing));
        assert_eq!(stages.last(), Some(&SessionStage::Complete));
    }

    #[test]
    fn test_visualize_progress_never_decreases() {
        let dir = TempDir::new().unwrap();
        let progress = Arc::new(Mutex::new(Vec::new()));
        let seen = progress.clone();
        let config = EdaConfig::builder()
            .store_path(dir.path().join("plots.db"))
            .image_size(320, 240)
            .build()
            .unwrap();
        let mut session = Session::builder()
            .config(config)
            .on_progress(move |update| seen.lock().unwrap().push(update.progress))
            .build()
            .unwrap();

        session.ingest(table()).unwrap();
        session.visualize(&["city"]).unwrap();

        let progress = progress.lock().unwrap();
        assert!(progress.len() >= 4);
        assert!(
            progress.windows(2).all(|w| w[0] <= w[1] + 1e-6),
            "progress went backwards: {:?}",
            progress
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ChartOutcome {
            spec: ChartSpec {
                kind: ChartKind::Pie,
                primary: "city".to_string(),
                secondary: None,
                aggregation: None,
                title: "Pie Chart: city".to_string(),
            },
            result: Err(EdaError::render("Pie Chart: city", "no values to plot")),
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "pie");
        assert_eq!(json["error"]["code"], "RENDER_FAILED");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EdaConfig::default();
        config.histogram_bins = 0;
        assert!(matches!(
            Session::builder().config(config).build(),
            Err(EdaError::InvalidConfig(_))
        ));
    }
}
