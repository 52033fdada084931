use crate::domain::model::ResultStream;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Everything the dispatcher needs from a redbiom store.
///
/// Search operations hand back streams rather than collections so that a
/// backend able to produce results incrementally can do so; errors raised
/// while producing an item surface as an `Err` item.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fails with `UnknownContext` when the store does not know `context`.
    async fn validate_context(&self, context: &str) -> Result<()>;

    fn samples_from_observations<'a>(
        &'a self,
        observations: &'a [String],
        exact: bool,
        context: &'a str,
    ) -> ResultStream<'a>;

    fn metadata_full<'a>(&'a self, query: &'a str, categories: bool) -> ResultStream<'a>;

    fn taxon_descendants<'a>(&'a self, context: &'a str, taxon: &'a str) -> ResultStream<'a>;
}
