//! Knowledge building and retrieval on top of the tool session, plus
//! configuration and bootstrap.

pub mod bootstrap;
pub mod builder;
pub mod config;
pub mod context;
pub mod extract;
pub mod prompts;
pub mod retriever;
pub mod vault;

pub use bootstrap::{AppBuilder, AppContext};
pub use builder::{BuildError, BuildReport, KnowledgeBuilder};
pub use config::Config;
pub use context::{ContextItem, assemble_context, filter_context};
pub use extract::{FaqPair, extract_json_array};
pub use retriever::{KnowledgeRetriever, RetrieveError, RetrieverSettings};
