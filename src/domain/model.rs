use crate::utils::error::Result;
use futures::stream::BoxStream;

/// Lazily produced identifiers coming back from a search.
pub type ResultStream<'a> = BoxStream<'a, Result<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    /// Samples containing any (or, when `exact`, all) of the observations.
    Observations {
        context: String,
        exact: bool,
        observations: Vec<String>,
    },
    /// Samples or categories matching a metadata query.
    Metadata { query: String, categories: bool },
    /// Features descending from a taxon.
    Taxon { context: String, query: String },
}

impl SearchRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Observations { .. } => "observations",
            Self::Metadata { .. } => "metadata",
            Self::Taxon { .. } => "taxon",
        }
    }
}
