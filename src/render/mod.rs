//! Rendering documents into page units and streaming them to a consumer.

mod corpus;
mod prefetch;
mod renderer;

pub use corpus::CorpusStream;
pub use prefetch::{stream, BackgroundPrefetch, Prefetch};
pub use renderer::{DocumentRenderer, PageStream};
