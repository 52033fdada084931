use crate::core::{ResultStream, SearchBackend, SearchRequest};
use crate::utils::error::{RedbiomError, Result};
use futures::TryStreamExt;
use std::io::Write;

/// Routes a search request to the backend and writes one result per line.
pub struct Dispatcher<B: SearchBackend> {
    backend: B,
}

impl<B: SearchBackend> Dispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Runs `request`, returning the number of lines written to `out`.
    pub async fn dispatch<W: Write>(&self, request: &SearchRequest, out: &mut W) -> Result<usize> {
        tracing::debug!("Dispatching {} search", request.name());

        let results = match request {
            SearchRequest::Observations {
                context,
                exact,
                observations,
            } => {
                // Context must be known before any lookup is attempted.
                self.backend.validate_context(context).await?;
                if observations.is_empty() {
                    return Err(RedbiomError::EmptyInput);
                }
                self.backend
                    .samples_from_observations(observations, *exact, context)
            }
            SearchRequest::Metadata { query, categories } => {
                self.backend.metadata_full(query, *categories)
            }
            SearchRequest::Taxon { context, query } => {
                self.backend.taxon_descendants(context, query)
            }
        };

        let written = emit(results, out).await?;
        tracing::debug!("{} search wrote {} lines", request.name(), written);
        Ok(written)
    }
}

async fn emit<W: Write>(mut results: ResultStream<'_>, out: &mut W) -> Result<usize> {
    let mut written = 0;
    while let Some(item) = results.try_next().await? {
        writeln!(out, "{}", item)?;
        // Each result is visible before the next lookup starts.
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
