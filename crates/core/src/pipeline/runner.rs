//! Pipeline runner: wires the stages together for one window.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::Archiver;
use crate::config::Config;
use crate::document::DocumentOptions;
use crate::mailer::Mailer;
use crate::notify::Notifier;
use crate::orders::OrderApi;
use crate::report::ErrorReporter;
use crate::window::TimeWindow;

use super::deliver::{ArchiveStage, DeliveryStage};
use super::enrich::OrderEnricher;
use super::error::{PipelineError, Resolution, StageOrigin};
use super::fetch::OrderFetcher;
use super::render::BatchRenderer;
use super::types::{Batch, RunOutcome, RunReport, RunState};

/// Runs fetch → enrich → render → archive → deliver for a window.
///
/// At most one run executes at a time; a run requested while another is in
/// progress returns immediately with `RunOutcome::Skipped`.
pub struct PipelineRunner {
    fetcher: OrderFetcher,
    enricher: OrderEnricher,
    renderer: BatchRenderer,
    archive: ArchiveStage,
    delivery: DeliveryStage,
    reporter: Arc<ErrorReporter>,
    run_lock: Mutex<()>,
}

impl PipelineRunner {
    pub fn new(
        config: &Config,
        order_api: Arc<dyn OrderApi>,
        mailer: Arc<dyn Mailer>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        let reporter = Arc::new(ErrorReporter::new(Arc::clone(&mailer), &config.mail));
        let notifier = Arc::new(Notifier::new(mailer, &config.mail));
        let options = DocumentOptions {
            issuing_office: config.pipeline.issuing_office.clone(),
        };

        Self {
            fetcher: OrderFetcher::new(
                Arc::clone(&order_api),
                Arc::clone(&notifier),
                Arc::clone(&reporter),
            ),
            enricher: OrderEnricher::new(
                order_api,
                Arc::clone(&reporter),
                config.pipeline.max_concurrent_requests,
            ),
            renderer: BatchRenderer::new(
                config.output.base_dir.clone(),
                options,
                config.pipeline.max_concurrent_writes,
                Arc::clone(&reporter),
            ),
            archive: ArchiveStage::new(archiver, Arc::clone(&reporter)),
            delivery: DeliveryStage::new(notifier, Arc::clone(&reporter)),
            reporter,
            run_lock: Mutex::new(()),
        }
    }

    /// Executes one run. Never fails: every failure has already been
    /// reported by the time the report is returned.
    pub async fn run(&self, window: TimeWindow) -> RunReport {
        let run_id = Uuid::new_v4();

        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!(
                %run_id,
                "Run for {} - {} skipped: previous run still in progress",
                window.start_label(),
                window.end_label()
            );
            return RunReport {
                run_id,
                window,
                states: vec![RunState::Idle],
                outcome: RunOutcome::Skipped,
            };
        };

        let span = info_span!(
            "pipeline_run",
            %run_id,
            start = %window.start_label(),
            end = %window.end_label()
        );

        async {
            info!("Run started");
            let mut states = vec![RunState::Idle];
            let result = self.execute(&window, &mut states).await;
            let outcome = self.finish(result, &window, &mut states).await;
            info!(outcome = ?outcome, "Run finished");

            RunReport {
                run_id,
                window: window.clone(),
                states,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        window: &TimeWindow,
        states: &mut Vec<RunState>,
    ) -> Result<(PathBuf, usize), PipelineError> {
        enter(states, RunState::WindowResolved);

        let orders = self.fetcher.fetch(window).await?;
        enter(states, RunState::OrdersFetched);

        let enriched = self.enricher.enrich(window, orders).await?;
        enter(states, RunState::Enriched);

        let location = self.renderer.render(window, &enriched).await?;
        let batch = Batch {
            window: window.clone(),
            orders: enriched,
            location,
        };
        enter(states, RunState::Rendered);

        let artifact = self.archive.archive(&batch.window, &batch.location).await?;
        enter(states, RunState::Archived);

        self.delivery.deliver(&batch.window, &artifact).await?;
        enter(states, RunState::Delivered);

        Ok((artifact, batch.orders.len()))
    }

    /// Maps a run result to its outcome. An error that is still unresolved
    /// here slipped past its stage; it is reported once as unhandled.
    async fn finish(
        &self,
        result: Result<(PathBuf, usize), PipelineError>,
        window: &TimeWindow,
        states: &mut Vec<RunState>,
    ) -> RunOutcome {
        let err = match result {
            Ok((artifact, orders)) => {
                enter(states, RunState::Done);
                return RunOutcome::Delivered { artifact, orders };
            }
            Err(err) => err,
        };

        let resolution = match err {
            PipelineError::Resolved(resolution) => resolution,
            PipelineError::Unresolved { origin, cause } => {
                warn!(%origin, "Unresolved error reached the runner");
                let err = PipelineError::unresolved(StageOrigin::Unhandled, cause);
                match self.reporter.resolve(err, window).await {
                    PipelineError::Resolved(resolution) => resolution,
                    PipelineError::Unresolved { .. } => Resolution::Reported(StageOrigin::Unhandled),
                }
            }
        };

        enter(states, RunState::Failed(resolution));
        match resolution {
            Resolution::NoOrders => RunOutcome::NoOrders,
            Resolution::Reported(origin) => RunOutcome::Failed { origin },
        }
    }
}

fn enter(states: &mut Vec<RunState>, state: RunState) {
    info!(state = ?state, "Pipeline state changed");
    states.push(state);
}
