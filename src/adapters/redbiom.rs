use crate::adapters::webdis::WebdisClient;
use crate::core::query::{self, MetadataQuery};
use crate::core::{ResultStream, SearchBackend};
use crate::utils::error::{RedbiomError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const CONTEXTS_KEY: &str = "state:contexts";
const TEXT_SEARCH_PREFIX: &str = "metadata:text-search";
const CATEGORY_SEARCH_PREFIX: &str = "metadata:category-search";
const CATEGORY_PREFIX: &str = "metadata:category";

fn context_key(context: &str, key: &str) -> String {
    format!("{}:{}", context, key)
}

/// Search backend reading a redbiom store through webdis.
#[derive(Debug, Clone)]
pub struct RedbiomBackend {
    store: WebdisClient,
}

impl RedbiomBackend {
    pub fn new(store: WebdisClient) -> Self {
        Self { store }
    }

    async fn observation_samples(
        &self,
        observations: &[String],
        exact: bool,
        context: &str,
    ) -> Result<BTreeSet<String>> {
        let mut samples: Option<BTreeSet<String>> = None;

        for observation in observations {
            let key = context_key(context, &format!("samples:{}", observation));
            let found: BTreeSet<String> = self.store.smembers(&key).await?.into_iter().collect();
            tracing::debug!("{} is present in {} samples", observation, found.len());

            samples = Some(match samples {
                None => found,
                Some(acc) if exact => acc.intersection(&found).cloned().collect(),
                Some(mut acc) => {
                    acc.extend(found);
                    acc
                }
            });

            if exact && samples.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }

        Ok(samples.unwrap_or_default())
    }

    async fn metadata_matches(&self, query: &str, categories: bool) -> Result<BTreeSet<String>> {
        let MetadataQuery { stems, filter } = query::parse(query)?;

        if categories && filter.is_some() {
            return Err(RedbiomError::query(
                "where clauses cannot be combined with --categories",
            ));
        }

        let stem_matches = match stems {
            Some(expr) => {
                let prefix = if categories {
                    CATEGORY_SEARCH_PREFIX
                } else {
                    TEXT_SEARCH_PREFIX
                };
                let mut terms = BTreeSet::new();
                expr.terms(&mut terms);

                let mut sets = HashMap::with_capacity(terms.len());
                for term in terms {
                    let key = format!("{}:{}", prefix, term);
                    let members: BTreeSet<String> =
                        self.store.smembers(&key).await?.into_iter().collect();
                    sets.insert(term, members);
                }
                Some(expr.evaluate(&sets))
            }
            None => None,
        };

        let filter_matches = match filter {
            Some(expr) => {
                let mut referenced = BTreeSet::new();
                expr.categories(&mut referenced);

                let mut values = HashMap::with_capacity(referenced.len());
                for category in referenced {
                    let key = format!("{}:{}", CATEGORY_PREFIX, category);
                    values.insert(category, self.store.hgetall(&key).await?);
                }
                Some(expr.evaluate(&values))
            }
            None => None,
        };

        Ok(match (stem_matches, filter_matches) {
            (Some(a), Some(b)) => a.intersection(&b).cloned().collect(),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => BTreeSet::new(),
        })
    }
}

/// Depth-first walk state for the taxonomy tree.
struct TaxonomyWalk<'a> {
    store: &'a WebdisClient,
    context: &'a str,
    root: &'a str,
    pending: Vec<String>,
    seen: HashSet<String>,
}

impl TaxonomyWalk<'_> {
    /// Next feature in walk order: nodes without children, root excluded.
    async fn next_feature(&mut self) -> Result<Option<String>> {
        while let Some(node) = self.pending.pop() {
            let key = context_key(self.context, &format!("taxonomy-children:{}", node));
            let mut children = self.store.smembers(&key).await?;

            if children.is_empty() {
                if node != self.root {
                    return Ok(Some(node));
                }
                continue;
            }

            children.sort();
            for child in children.into_iter().rev() {
                if self.seen.insert(child.clone()) {
                    self.pending.push(child);
                }
            }
        }
        Ok(None)
    }
}

fn single_shot<'a, F>(fut: F) -> ResultStream<'a>
where
    F: std::future::Future<Output = Result<BTreeSet<String>>> + Send + 'a,
{
    stream::once(fut)
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<String, RedbiomError>)))
        .try_flatten()
        .boxed()
}

#[async_trait]
impl SearchBackend for RedbiomBackend {
    async fn validate_context(&self, context: &str) -> Result<()> {
        if self.store.hexists(CONTEXTS_KEY, context).await? {
            Ok(())
        } else {
            Err(RedbiomError::UnknownContext {
                context: context.to_string(),
            })
        }
    }

    fn samples_from_observations<'a>(
        &'a self,
        observations: &'a [String],
        exact: bool,
        context: &'a str,
    ) -> ResultStream<'a> {
        single_shot(self.observation_samples(observations, exact, context))
    }

    fn metadata_full<'a>(&'a self, query: &'a str, categories: bool) -> ResultStream<'a> {
        single_shot(self.metadata_matches(query, categories))
    }

    fn taxon_descendants<'a>(&'a self, context: &'a str, taxon: &'a str) -> ResultStream<'a> {
        let walk = TaxonomyWalk {
            store: &self.store,
            context,
            root: taxon,
            pending: vec![taxon.to_string()],
            seen: HashSet::from([taxon.to_string()]),
        };

        stream::try_unfold(walk, |mut walk| async move {
            let next = walk.next_feature().await?;
            Ok::<_, RedbiomError>(next.map(|feature| (feature, walk)))
        })
        .boxed()
    }
}
