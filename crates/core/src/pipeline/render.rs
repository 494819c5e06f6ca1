//! Batch rendering stage: one XML document per order on disk.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::document::{render_order_document, DocumentOptions};
use crate::orders::EnrichedOrder;
use crate::report::ErrorReporter;
use crate::window::TimeWindow;

use super::error::{PipelineError, StageError, StageOrigin};
use super::types::BatchLocation;

pub struct BatchRenderer {
    base_dir: PathBuf,
    options: DocumentOptions,
    max_concurrent: usize,
    reporter: Arc<ErrorReporter>,
}

impl BatchRenderer {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        options: DocumentOptions,
        max_concurrent: usize,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            options,
            max_concurrent: max_concurrent.max(1),
            reporter,
        }
    }

    /// Writes `<base_dir>/<start>__<end>/<order id>.xml` for every order.
    ///
    /// The directory is reused if it already exists, so re-running a window
    /// overwrites its documents in place. Writes are not transactional: when
    /// one fails, others already in flight may still land on disk.
    pub async fn render(
        &self,
        window: &TimeWindow,
        orders: &[EnrichedOrder],
    ) -> Result<BatchLocation, PipelineError> {
        let name = window.batch_name();
        let dir = self.base_dir.join(&name);

        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            let err = PipelineError::unresolved(
                StageOrigin::CreateBatchDirectory,
                StageError::io(&dir, e),
            );
            return Err(self.reporter.resolve(err, window).await);
        }

        let file_names = match document_file_names(orders) {
            Ok(names) => names,
            Err(cause) => {
                let err = PipelineError::unresolved(StageOrigin::WriteOrderFile, cause);
                return Err(self.reporter.resolve(err, window).await);
            }
        };

        let pending: Vec<_> = orders
            .iter()
            .zip(file_names)
            .map(|(order, file_name)| self.write_document(dir.join(file_name), order))
            .collect();
        let mut writes = stream::iter(pending).buffer_unordered(self.max_concurrent);

        let mut documents = Vec::with_capacity(orders.len());
        while let Some(result) = writes.next().await {
            match result {
                Ok(path) => documents.push(path),
                Err(cause) => {
                    drop(writes);
                    let err = PipelineError::unresolved(StageOrigin::WriteOrderFile, cause);
                    return Err(self.reporter.resolve(err, window).await);
                }
            }
        }

        info!(
            dir = %dir.display(),
            "Wrote {} order documents",
            documents.len()
        );

        Ok(BatchLocation {
            name,
            path: dir,
            documents,
        })
    }

    async fn write_document(
        &self,
        path: PathBuf,
        order: &EnrichedOrder,
    ) -> Result<PathBuf, StageError> {
        let xml = render_order_document(order, &self.options)?;
        tokio::fs::write(&path, xml)
            .await
            .map_err(|e| StageError::io(&path, e))?;

        debug!(order_id = %order.id(), path = %path.display(), "Wrote order document");
        Ok(path)
    }
}

/// One file name per order, in order. Every order must map to its own file.
fn document_file_names(orders: &[EnrichedOrder]) -> Result<Vec<String>, StageError> {
    let mut seen = HashSet::with_capacity(orders.len());
    orders
        .iter()
        .map(|order| {
            let name = document_file_name(order.id())?;
            if !seen.insert(name.clone()) {
                return Err(StageError::DuplicateOrderId(order.id().to_string()));
            }
            Ok(name)
        })
        .collect()
}

/// `<order id>.xml`, rejecting ids that would escape the batch directory.
fn document_file_name(order_id: &str) -> Result<String, StageError> {
    let unusable = order_id.is_empty()
        || order_id == "."
        || order_id == ".."
        || order_id.contains(['/', '\\', '\0'])
        || order_id.chars().any(char::is_whitespace);
    if unusable {
        return Err(StageError::InvalidOrderId(order_id.to_string()));
    }
    Ok(format!("{}.xml", order_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::pipeline::Resolution;
    use crate::testing::{fixtures, MockMailer};

    fn renderer(base: &Path, mailer: Arc<MockMailer>) -> BatchRenderer {
        let reporter = Arc::new(ErrorReporter::new(mailer, &fixtures::mail_config()));
        BatchRenderer::new(base, DocumentOptions::default(), 4, reporter)
    }

    fn enriched(id: &str) -> EnrichedOrder {
        fixtures::order(id).with_line_items(vec![fixtures::line_item("SKU-1")])
    }

    #[test]
    fn test_document_file_name() {
        assert_eq!(document_file_name("113-1").unwrap(), "113-1.xml");
        assert!(document_file_name("../etc/passwd").is_err());
        assert!(document_file_name("a\\b").is_err());
        assert!(document_file_name("..").is_err());
        assert!(document_file_name("  ").is_err());
        assert!(document_file_name("113-1 ").is_err());
        assert!(document_file_name("113 1").is_err());
    }

    #[tokio::test]
    async fn test_ids_sharing_a_file_fail_the_write() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::new());
        let window = fixtures::window();

        let err = renderer(tmp.path(), mailer.clone())
            .render(
                &window,
                &[enriched("113-1"), enriched("113-2"), enriched("113-1")],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Resolved(Resolution::Reported(StageOrigin::WriteOrderFile))
        ));
        let sent = mailer.recorded_messages().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("appears more than once"));
        let batch = tmp.path().join(window.batch_name());
        assert_eq!(std::fs::read_dir(&batch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_id_with_trailing_space_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::new());

        let err = renderer(tmp.path(), mailer.clone())
            .render(&fixtures::window(), &[enriched("113-1"), enriched("113-1 ")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Resolved(Resolution::Reported(StageOrigin::WriteOrderFile))
        ));
        assert_eq!(mailer.recorded_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_writes_one_file_per_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::new());
        let window = fixtures::window();
        let orders = vec![enriched("113-1"), enriched("113-2"), enriched("113-3")];

        let location = renderer(tmp.path(), mailer.clone())
            .render(&window, &orders)
            .await
            .unwrap();

        assert_eq!(location.name, window.batch_name());
        assert_eq!(location.path, tmp.path().join(window.batch_name()));
        assert_eq!(location.documents.len(), 3);
        for id in ["113-1", "113-2", "113-3"] {
            let contents = std::fs::read_to_string(location.path.join(format!("{}.xml", id))).unwrap();
            assert!(contents.contains(&format!("orderID=\"{}\"", id)));
        }
        assert!(mailer.recorded_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_rerun_reuses_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::new());
        let window = fixtures::window();
        let renderer = renderer(tmp.path(), mailer);

        let first = renderer.render(&window, &[enriched("113-1")]).await.unwrap();
        let second = renderer.render(&window, &[enriched("113-1")]).await.unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(std::fs::read_dir(&second.path).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mailer = Arc::new(MockMailer::new());

        let err = renderer(&blocker, mailer.clone())
            .render(&fixtures::window(), &[enriched("113-1")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Resolved(Resolution::Reported(StageOrigin::CreateBatchDirectory))
        ));
        assert_eq!(mailer.recorded_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_order_id_fails_write_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::new());

        let err = renderer(tmp.path(), mailer.clone())
            .render(
                &fixtures::window(),
                &[enriched("113-1"), enriched("../escape"), enriched("a/b")],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Resolved(Resolution::Reported(StageOrigin::WriteOrderFile))
        ));
        let sent = mailer.recorded_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "ORDER FEED ERROR: write order file");
        assert!(!tmp.path().join("escape.xml").exists());
    }
}
