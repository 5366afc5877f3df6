//! retag: tolerant single-pass tag rewriter for (X)HTML ebook markup.
//!
//! The engine scans a document once, alternating literal text runs and tag
//! spans, and deletes, unwraps or modifies the tags a [`Criteria`] selects.
//! There is no DOM: nesting is tracked with a stack of open element names,
//! comments / doctype / CDATA / processing instructions / whole `<svg>`
//! subtrees pass through untouched, and every byte the rule does not touch is
//! reproduced exactly.
//!
//! ```
//! use retag::{process, Action, Criteria};
//!
//! let rule = Criteria::new("span", Action::Modify)
//!     .with_attribute("class", "x")
//!     .rename_to("div")
//!     .with_new_attributes(r#"id="y""#);
//! assert_eq!(process(r#"<span class="x">hi</span>"#, &rule), r#"<div id="y">hi</div>"#);
//! ```

pub mod batch;
pub mod config;
pub mod criteria;
pub mod error;
pub mod rewrite;
pub mod scanner;
pub mod tag;

pub use batch::{run_batch, BatchOptions, BatchReport, DirectoryStore, DocumentStore, MediaType, MemoryStore};
pub use config::{load_rule, Profile, ProfileViolation};
pub use criteria::{Action, Criteria, MatchMode, Rule};
pub use error::{BatchError, ConfigError, CriteriaError};
pub use rewrite::{process, Rewrite, RewriteStats};
