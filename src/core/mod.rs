pub mod dispatch;
pub mod query;
pub mod stem;

pub use crate::domain::model::{ResultStream, SearchRequest};
pub use crate::domain::ports::SearchBackend;
pub use crate::utils::error::Result;
