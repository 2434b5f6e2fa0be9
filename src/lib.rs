//! Flag words that fall outside an allowed vocabulary.
//!
//! The vocabulary is a base list of common words plus one topical glossary cut
//! down to its first `cutoff` rows. [`load_vocabulary`] builds an immutable
//! [`VocabularyState`]; [`highlight`] and [`classify`] are pure functions over
//! that snapshot.

pub mod config;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod store;
pub mod vocabulary;

#[cfg(feature = "cli")]
pub mod logging;

#[cfg(feature = "web")]
pub mod web;

pub use config::{AppConfig, GlossarySources, LoaderConfig, ServeConfig};
pub use filter::{Annotated, AnnotatedToken, Verdict, classify, highlight};
pub use loader::{
    AnySource, DirSource, DocumentSource, FetchError, HttpSource, LoadError, LoadReport,
    MemorySource, PartialLoadWarning, load_vocabulary,
};
pub use normalize::{normalize, word_count};
pub use store::VocabularyStore;
pub use vocabulary::{
    BaseVocabulary, Cutoff, EffectiveSubset, Glossary, Selection, VocabularyCatalog,
    VocabularyState,
};
