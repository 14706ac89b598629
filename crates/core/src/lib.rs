pub mod canonical;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod handlers;
pub mod humanize;
pub mod lookup;
pub mod metadata;
pub mod outcome;
pub mod parse;
pub mod session;
pub mod signature;
pub mod summarize;
pub mod summary;

pub use canonical::{canonicalize, root_domain};
pub use error::{GlimpseError, Result};
pub use fallback::{FallbackChain, Strategy};
pub use fetch::{RetrievalRequest, RetrievedDocument, Retriever, RetryPolicy, is_allowed_content_type};
pub use handlers::{Context, DomainTable, Handler};
pub use lookup::{ShortcutResolver, SourceLookup, StaticShortcuts, StaticSources};
pub use metadata::PageMetadata;
pub use outcome::{Outcome, Rejection};
pub use parse::Document;
pub use signature::SignatureTable;
pub use summarize::{
    BlueskyCredentials, Endpoints, ProxyConfig, Summarizer, SummarizerBuilder, SummarizerConfig,
    SummarizerConfigBuilder, find_urls,
};
pub use summary::{Assembler, BOLD, SEPARATOR, Summary, accept};
