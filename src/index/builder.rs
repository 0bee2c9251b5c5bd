//! Index assembly: validate inputs, enrich covers with a bounded worker
//! pool, pair records with embeddings positionally.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

use crate::covers::CoverResolver;
use crate::index::record::{BookRecord, CoverStatus};
use crate::index::{IndexError, VibeIndex};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Index(#[from] IndexError),
}

pub struct BuildOptions {
    /// Truncate input records (and embeddings) to the first M entries when
    /// positive; zero or negative means no truncation.
    pub sample_limit: i64,
    /// Enrichment worker count; clamped to at least 1.
    pub workers: usize,
    /// Skip cover resolution; records keep whatever cover state they
    /// already carry.
    pub skip_covers: bool,
    /// Suppress the progress bar (tests, non-tty runs).
    pub quiet: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            sample_limit: 0,
            workers: 4,
            skip_covers: false,
            quiet: false,
        }
    }
}

pub struct IndexBuilder<'a> {
    resolver: &'a CoverResolver,
    options: BuildOptions,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(resolver: &'a CoverResolver, options: BuildOptions) -> Self {
        Self { resolver, options }
    }

    /// Build an index from raw records and their externally computed
    /// embeddings.
    ///
    /// Preconditions (fatal, checked before any network work): equal
    /// counts, uniform embedding dimension, at least one record after
    /// sampling. Each record's cover is resolved exactly once; outcomes
    /// are written back positionally so input order survives even though
    /// enrichment completes out of order.
    pub fn build(
        &self,
        mut records: Vec<BookRecord>,
        mut embeddings: Vec<Vec<f32>>,
    ) -> Result<VibeIndex, BuildError> {
        if records.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                records: records.len(),
                embeddings: embeddings.len(),
            }
            .into());
        }

        if self.options.sample_limit > 0 {
            let limit = self.options.sample_limit as usize;
            if limit < records.len() {
                log::info!("sampling limit active: {} of {} records", limit, records.len());
                records.truncate(limit);
                embeddings.truncate(limit);
            }
        }

        // Validate the matrix shape before spending network calls.
        validate_dims(&records, &embeddings)?;

        if !self.options.skip_covers {
            self.enrich_covers(&mut records);
        }

        let index = VibeIndex::new(records, embeddings)?;
        log::info!(
            "index assembled: {} records, {} dims, {} distinct cover lookups",
            index.len(),
            index.dims(),
            self.resolver.cached_outcomes()
        );
        Ok(index)
    }

    /// Resolve covers with a fixed-size pool. Workers pull record indices
    /// from a shared cursor and publish outcomes into positional slots.
    fn enrich_covers(&self, records: &mut [BookRecord]) {
        let workers = self.options.workers.max(1).min(records.len().max(1));
        let cursor = AtomicUsize::new(0);
        let outcomes: Vec<OnceLock<CoverStatus>> =
            records.iter().map(|_| OnceLock::new()).collect();

        let progress = if self.options.quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(records.len() as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "resolving covers [{bar:40}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("=> "),
            );
            bar
        };

        let records_view: &[BookRecord] = records;
        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let i = cursor.fetch_add(1, Ordering::SeqCst);
                    if i >= records_view.len() {
                        break;
                    }
                    let outcome = self.resolver.resolve(&records_view[i]);
                    let _ = outcomes[i].set(outcome);
                    progress.inc(1);
                });
            }
        });

        progress.finish_and_clear();

        for (record, slot) in records.iter_mut().zip(outcomes) {
            // Every index was visited by exactly one worker.
            if let Some(outcome) = slot.into_inner() {
                record.cover = outcome;
            }
        }
    }
}

/// Check the embedding matrix shape up front so a misconfigured run fails
/// before any provider call is spent.
fn validate_dims(records: &[BookRecord], embeddings: &[Vec<f32>]) -> Result<(), IndexError> {
    if records.is_empty() {
        return Err(IndexError::Empty);
    }

    let dims = embeddings[0].len();
    for (row, emb) in embeddings.iter().enumerate() {
        if emb.len() != dims {
            return Err(IndexError::DimensionMismatch {
                row,
                expected: dims,
                got: emb.len(),
            });
        }
    }
    Ok(())
}
