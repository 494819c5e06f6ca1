//! Types flowing between pipeline stages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orders::EnrichedOrder;
use crate::window::TimeWindow;

use super::error::{Resolution, StageOrigin};

/// A list with at least one element.
#[derive(Debug, Clone, PartialEq)]
pub struct NonEmpty<T>(Vec<T>);

impl<T> NonEmpty<T> {
    /// Returns `None` for an empty vector.
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `Vec`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &T {
        &self.0[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> IntoIterator for NonEmpty<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Where a rendered batch lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLocation {
    /// Directory name, `<start_label>__<end_label>`.
    pub name: String,
    /// Full directory path.
    pub path: PathBuf,
    /// One XML document per order, in completion order.
    pub documents: Vec<PathBuf>,
}

impl BatchLocation {
    /// Path of the archive for this batch, `<dir>/<name>.zip`.
    pub fn artifact_path(&self) -> PathBuf {
        self.path.join(format!("{}.zip", self.name))
    }
}

/// Everything produced for one window once rendering succeeded.
#[derive(Debug, Clone)]
pub struct Batch {
    pub window: TimeWindow,
    pub orders: Vec<EnrichedOrder>,
    pub location: BatchLocation,
}

/// Steps a run moves through. Transitions only go forward; `Failed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "resolution", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    WindowResolved,
    OrdersFetched,
    Enriched,
    Rendered,
    Archived,
    Delivered,
    Done,
    Failed(Resolution),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The archive was mailed to the recipient.
    Delivered { artifact: PathBuf, orders: usize },
    /// The window had no orders; the recipient was notified.
    NoOrders,
    /// A stage failed and the operator was notified.
    Failed { origin: StageOrigin },
    /// Another run was still in progress.
    Skipped,
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub window: TimeWindow,
    /// Every state the run entered, starting with `Idle`.
    pub states: Vec<RunState>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn final_state(&self) -> RunState {
        self.states.last().copied().unwrap_or(RunState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_rejects_empty() {
        assert!(NonEmpty::<u32>::new(vec![]).is_none());

        let items = NonEmpty::new(vec![3, 1, 2]).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(*items.first(), 3);
        assert_eq!(items.into_vec(), vec![3, 1, 2]);
    }

    #[test]
    fn test_artifact_named_after_directory() {
        let location = BatchLocation {
            name: "03_15_24_09:00__03_15_24_13:00".to_string(),
            path: PathBuf::from("/files/03_15_24_09:00__03_15_24_13:00"),
            documents: vec![],
        };
        assert_eq!(
            location.artifact_path(),
            PathBuf::from(
                "/files/03_15_24_09:00__03_15_24_13:00/03_15_24_09:00__03_15_24_13:00.zip"
            )
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Failed(Resolution::NoOrders).is_terminal());
        assert!(!RunState::Archived.is_terminal());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(RunOutcome::Failed {
            origin: StageOrigin::CompressBatch,
        })
        .unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["origin"], "compress_batch");
    }
}
