use crate::domain::model::SearchRequest;
use crate::utils::error::Result;
use crate::utils::input::{merge_inputs, open_source};
use crate::utils::validation::validate_non_empty_string;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "redbiom")]
#[command(about = "Search a redbiom store")]
pub struct Cli {
    /// webdis endpoint, overrides REDBIOM_HOST and the config file
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// TOML configuration file (defaults to REDBIOM_CONFIG when set)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Observation and sample search support.
    Search {
        #[command(subcommand)]
        command: SearchCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SearchCommand {
    /// Find samples containing observations.
    Observations {
        /// A file or stdin ("-") which provides observations to search for
        #[arg(long = "from")]
        from: Option<PathBuf>,

        /// All found samples must contain all specified observations
        #[arg(long)]
        exact: bool,

        /// The context to search within.
        #[arg(long)]
        context: String,

        observations: Vec<String>,
    },

    /// Find samples or categories.
    ///
    /// The metadata search engine searches for word stems within a sample's
    /// metadata. A stem disregards modifiers and plurals, so a search for
    /// "antibiotics" looks for "antibiot" and a search for "crying" looks for
    /// "cry". Words combine with set operations: "&" for intersection, "|" for
    /// union and "-" for difference. "antibiotics & crying" finds samples with
    /// both stems somewhere in their metadata, not necessarily in the same
    /// category.
    ///
    /// With --categories the stem search applies to metadata category names.
    ///
    /// Value based searches use a Python-like grammar after "where":
    /// "where qiita_study_id == 10317" finds samples whose qiita_study_id is
    /// 10317. Comparisons (==, !=, <, <=, >, >=, in) combine with and, or and
    /// not.
    ///
    /// Examples:
    ///
    ///   redbiom search metadata antibiotics
    ///
    ///   redbiom search metadata "infant & antibiotics where age_days < 30"
    ///
    ///   redbiom search metadata --categories "ph - water"
    #[command(verbatim_doc_comment)]
    Metadata {
        /// Search for metadata categories instead of metadata values
        #[arg(long)]
        categories: bool,

        query: String,
    },

    /// Find features associated with a taxon
    Taxon {
        /// The context to search within.
        #[arg(long)]
        context: String,

        query: String,
    },
}

impl Cli {
    pub fn search_command(&self) -> &SearchCommand {
        match &self.command {
            Command::Search { command } => command,
        }
    }

    pub fn into_search_command(self) -> SearchCommand {
        match self.command {
            Command::Search { command } => command,
        }
    }
}

impl SearchCommand {
    /// Builds the request, reading `--from` when given.
    pub fn into_request(self) -> Result<SearchRequest> {
        let request = match self {
            Self::Observations {
                from,
                exact,
                context,
                observations,
            } => {
                validate_non_empty_string("context", &context)?;
                let source = from.as_deref().map(open_source).transpose()?;
                SearchRequest::Observations {
                    context,
                    exact,
                    observations: merge_inputs(source, observations)?,
                }
            }
            Self::Metadata { categories, query } => SearchRequest::Metadata { query, categories },
            Self::Taxon { context, query } => {
                validate_non_empty_string("context", &context)?;
                SearchRequest::Taxon { context, query }
            }
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("redbiom").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_observations() {
        let cli = parse(&["search", "observations", "--context", "ctx1", "--exact", "A", "B"]);
        match cli.search_command() {
            SearchCommand::Observations {
                from,
                exact,
                context,
                observations,
            } => {
                assert!(from.is_none());
                assert!(*exact);
                assert_eq!(context, "ctx1");
                assert_eq!(observations, &["A".to_string(), "B".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_context_is_required() {
        let result = Cli::try_parse_from(["redbiom", "search", "taxon", "g__Foo"]);
        assert!(result.is_err());
        let result = Cli::try_parse_from(["redbiom", "search", "observations", "A"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_metadata_takes_exactly_one_query() {
        let cli = parse(&["search", "metadata", "--categories", "ph - water"]);
        let request = cli.into_search_command().into_request().unwrap();
        assert_eq!(
            request,
            SearchRequest::Metadata {
                query: "ph - water".to_string(),
                categories: true,
            }
        );

        let result = Cli::try_parse_from(["redbiom", "search", "metadata", "a", "b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&[
            "search",
            "taxon",
            "--context",
            "ctx1",
            "g__Foo",
            "--host",
            "http://webdis:7379",
            "-v",
        ]);
        assert_eq!(cli.host.as_deref(), Some("http://webdis:7379"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_from_file_merged_into_request() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "C\nA\n").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&["search", "observations", "--context", "ctx1", "--from", path, "A", "B"]);
        let request = cli.into_search_command().into_request().unwrap();

        assert_eq!(
            request,
            SearchRequest::Observations {
                context: "ctx1".to_string(),
                exact: false,
                observations: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            }
        );
    }

    #[test]
    fn test_blank_context_rejected() {
        let cli = parse(&["search", "taxon", "--context", " ", "g__Foo"]);
        assert!(cli.into_search_command().into_request().is_err());
    }

    #[test]
    fn test_no_observations_is_an_error() {
        let cli = parse(&["search", "observations", "--context", "ctx1"]);
        assert!(cli.into_search_command().into_request().is_err());
    }
}
