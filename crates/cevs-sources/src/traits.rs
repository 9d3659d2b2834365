use async_trait::async_trait;

use cevs_core::SourceKind;

use crate::error::ProviderError;
use crate::types::{FetchQuery, RawRecord};

/// Uniform capability every source adapter exposes: fetch rows matching
/// filters, or fail with a typed error. The adapter never substitutes its
/// fallback sample on failure itself; the caller decides, so error
/// information is not silently swallowed.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> SourceKind;

    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<RawRecord>, ProviderError>;

    /// Small fixed dataset substituted by callers when the live source is
    /// unavailable. Rows carry a `sample` marker field.
    fn sample_records(&self) -> Vec<RawRecord>;
}
