//! Async entry points: single image and batch
//!
//! Each image runs on tokio's blocking pool. A batch launches every image at
//! once (or up to `max_in_flight`), waits for all of them and reports results
//! in input order.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::debug;

use super::cancel::CancelSignal;
use super::error::{ErrorKind, ImageError};
use super::metrics::BatchSummary;
use super::payload::{OptimizedImage, SourceImage};
use super::policy::{OptimizationPolicy, PolicyOverrides};
use super::processor::{ImageProcessor, RasterPipeline};

/// Failure of an all-or-nothing batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchError {
    /// The policy was rejected before any image was touched
    InvalidPolicy(ImageError),
    /// At least one image failed; `index` is the lowest failing position
    Item {
        index: usize,
        file_name: String,
        error: ImageError,
        failed: usize,
    },
}

impl BatchError {
    /// Kind of the reported underlying error
    pub fn kind(&self) -> ErrorKind {
        self.error().kind()
    }

    pub fn error(&self) -> &ImageError {
        match self {
            BatchError::InvalidPolicy(error) => error,
            BatchError::Item { error, .. } => error,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            BatchError::InvalidPolicy(_) => None,
            BatchError::Item { index, .. } => Some(*index),
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::InvalidPolicy(error) => write!(f, "Batch rejected: {}", error),
            BatchError::Item {
                index,
                file_name,
                error,
                failed,
            } => write!(
                f,
                "Image {} ({}) failed: {} [{} of the batch failed]",
                index, file_name, error, failed
            ),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

/// Optimizer bound to one policy
///
/// Cheap to clone; clones share the processor.
#[derive(Clone)]
pub struct Optimizer {
    processor: Arc<dyn ImageProcessor>,
    policy: OptimizationPolicy,
    timeout: Option<Duration>,
    max_in_flight: Option<usize>,
    cancel: CancelSignal,
}

impl fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .field("max_in_flight", &self.max_in_flight)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Optimizer {
    /// Create an optimizer using the default raster pipeline
    ///
    /// # Errors
    /// * `InvalidPolicy` if `policy` fails validation
    pub fn new(policy: OptimizationPolicy) -> Result<Self, ImageError> {
        policy.validate()?;
        Ok(Self {
            processor: Arc::new(RasterPipeline::default()),
            policy,
            timeout: None,
            max_in_flight: None,
            cancel: CancelSignal::never(),
        })
    }

    pub fn with_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Fail any single image that takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the number of images processed at once; zero is treated as one
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight.max(1));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy of this optimizer with `overrides` merged over its policy
    pub fn with_overrides(&self, overrides: Option<&PolicyOverrides>) -> Result<Self, ImageError> {
        let mut optimizer = self.clone();
        optimizer.policy = self.policy.merge(overrides)?;
        Ok(optimizer)
    }

    pub fn policy(&self) -> &OptimizationPolicy {
        &self.policy
    }

    /// Optimize one image
    pub async fn optimize(&self, source: &SourceImage) -> Result<OptimizedImage, ImageError> {
        self.run(source.clone(), None).await
    }

    /// Optimize every image and return each outcome in input order
    pub async fn optimize_each(
        &self,
        sources: &[SourceImage],
    ) -> Vec<Result<OptimizedImage, ImageError>> {
        let limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let started = Instant::now();

        let results = join_all(
            sources
                .iter()
                .map(|source| self.run(source.clone(), limiter.clone())),
        )
        .await;

        debug!(
            images = sources.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch settled"
        );

        results
    }

    /// Optimize every image; fail the whole batch if any image fails
    ///
    /// All images run to completion before the outcome is decided. The
    /// reported error is the one at the lowest failing index.
    pub async fn optimize_all(
        &self,
        sources: &[SourceImage],
    ) -> Result<Vec<OptimizedImage>, BatchError> {
        let results = self.optimize_each(sources).await;

        let mut images = Vec::with_capacity(results.len());
        let mut first_failure = None;
        let mut failed = 0;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(image) => images.push(image),
                Err(error) => {
                    failed += 1;
                    first_failure.get_or_insert((index, error));
                }
            }
        }

        if let Some((index, error)) = first_failure {
            return Err(BatchError::Item {
                index,
                file_name: sources[index].file_name.clone(),
                error,
                failed,
            });
        }

        let summary = BatchSummary::from_metrics(images.iter().map(|i| &i.metrics));
        debug!(
            images = summary.images,
            resized = summary.resized,
            original_bytes = summary.original_bytes,
            optimized_bytes = summary.optimized_bytes,
            "Batch optimized"
        );

        Ok(images)
    }

    async fn run(
        &self,
        source: SourceImage,
        limiter: Option<Arc<Semaphore>>,
    ) -> Result<OptimizedImage, ImageError> {
        let permit = match limiter {
            Some(semaphore) => tokio::select! {
                permit = semaphore.acquire_owned() => Some(permit.map_err(|_| ImageError::Cancelled)?),
                _ = self.cancel.cancelled() => return Err(ImageError::Cancelled),
            },
            None => None,
        };

        if self.cancel.is_cancelled() {
            return Err(ImageError::Cancelled);
        }

        let processor = Arc::clone(&self.processor);
        let policy = self.policy;
        let cancel = self.cancel.clone();
        // The permit is released when the blocking work ends, not when the
        // caller stops waiting for it
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            processor.process(&source, &policy, &cancel)
        });

        let job = async {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(ImageError::context_unavailable(format!(
                    "optimization task failed: {}",
                    e
                ))),
            }
        };

        // A timed-out or cancelled blocking job is detached; it observes the
        // cancel signal at its next stage boundary
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, job).await.unwrap_or_else(|_| {
                    Err(ImageError::ProcessingTimeout {
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
                None => job.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = self.cancel.cancelled() => Err(ImageError::Cancelled),
        }
    }
}

/// Optimize one image with the default policy plus `overrides`
pub async fn optimize_image(
    source: &SourceImage,
    overrides: Option<PolicyOverrides>,
) -> Result<OptimizedImage, ImageError> {
    let policy = OptimizationPolicy::resolve(overrides.as_ref())?;
    Optimizer::new(policy)?.optimize(source).await
}

/// Optimize a batch, all-or-nothing, with the default policy plus `overrides`
pub async fn optimize_images(
    sources: &[SourceImage],
    overrides: Option<PolicyOverrides>,
) -> Result<Vec<OptimizedImage>, BatchError> {
    let policy =
        OptimizationPolicy::resolve(overrides.as_ref()).map_err(BatchError::InvalidPolicy)?;
    let optimizer = Optimizer::new(policy).map_err(BatchError::InvalidPolicy)?;
    optimizer.optimize_all(sources).await
}
