//! Progress Tracker - derive completion percentage and persistence policy
//!
//! Pure function of the two counters. Persisting only every
//! `batch_size` rows (and always at the end) bounds write amplification
//! against the Job Store.

/// Returns `(should_persist, new_progress)` after one more row has been
/// consumed. `new_progress` is `floor(processed / total * 100)`.
pub fn on_row_processed(processed: u64, total: u64, batch_size: u64) -> (bool, i32) {
    let progress = if total == 0 {
        100
    } else {
        ((processed * 100) / total) as i32
    };

    let batch_size = batch_size.max(1);
    let should_persist = processed % batch_size == 0 || processed == total;

    (should_persist, progress)
}
