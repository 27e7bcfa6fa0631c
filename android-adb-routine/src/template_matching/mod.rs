/// Template matching module for locating UI elements in screenshots
///
/// - Template lookup by name (directory-backed or in-memory)
/// - Normalized squared-difference scoring, lower is better
/// - Capture-per-attempt retry with an inclusive threshold
pub mod error;
pub mod matcher;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use error::TemplateError;
pub use matcher::{Candidate, MatchPolicy, TemplateMatcher, best_match};
pub use store::{DirTemplateStore, MemoryTemplateStore, TemplateStore};
pub use types::{MatchResult, Point, Template};
