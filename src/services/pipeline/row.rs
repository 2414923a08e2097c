//! Row Processor - run the transform worker over one validated row
//!
//! Images within a row are fetched with bounded concurrency; the
//! buffered stream preserves URL order in `output_refs` even when
//! downloads complete out of order.
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::warn;

use super::transform::TransformWorker;
use super::validator::ValidRow;
use crate::models::RowResult;

pub struct RowProcessor {
    worker: Arc<TransformWorker>,
    concurrency: usize,
}

impl RowProcessor {
    pub fn new(worker: Arc<TransformWorker>, concurrency: usize) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
        }
    }

    /// Transform every image in the row. Per-URL failures are recorded
    /// as `None` at that URL's position; a completed row always yields a
    /// `RowResult` with `output_refs.len() == input_urls.len()`.
    ///
    /// The cancellation signal is checked before each URL is scheduled.
    /// Returns `None` when cancellation interrupted the row; no partial
    /// row is emitted in that case.
    pub async fn process(
        &self,
        row: &ValidRow,
        cancel: &watch::Receiver<bool>,
    ) -> Option<RowResult> {
        let slots: Vec<Option<Option<String>>> = stream::iter(row.input_urls.clone())
            .map(|image_url| {
                let worker = self.worker.clone();
                let cancel = cancel.clone();
                async move {
                    if *cancel.borrow() {
                        return None;
                    }
                    Some(match worker.transform(&image_url).await {
                        Ok(reference) => Some(reference),
                        Err(e) => {
                            warn!(url = %image_url, error = %e, "Image transform failed");
                            None
                        }
                    })
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        if slots.iter().any(|slot| slot.is_none()) {
            return None;
        }

        Some(RowResult {
            product_name: row.product_name.clone(),
            input_urls: row.input_urls.clone(),
            output_refs: slots.into_iter().flatten().collect(),
        })
    }
}
