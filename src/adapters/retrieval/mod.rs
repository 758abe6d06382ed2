//! Paper retrieval adapters.

pub mod keyword;

pub use keyword::KeywordCorpus;
