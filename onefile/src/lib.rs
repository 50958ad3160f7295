//! Single-file assembly for contest submissions.
//!
//! A program includes snippet libraries with `#include "<libdir>/<name>.cpp"`.
//! Each library is one namespace split into named blocks by `//::name`
//! marker comments. [`Merger`] replaces every library include with only the
//! blocks the program actually references (plus whatever those blocks use),
//! and hoists all `#include <...>` headers to the top of the output.

pub mod block;
pub mod error;
pub mod library;
pub mod merger;
mod patterns;

pub use block::Block;
pub use error::{MergeError, ParseError};
pub use library::LibraryFile;
pub use merger::{Line, Merger};

use std::path::Path;

use codespan_reporting::files::SimpleFiles;

/// Load `main` and every library it includes from `libdir`.
///
/// Every library source read along the way is added to `files` so that
/// parse errors can be rendered against it.
pub fn merge(
    main: impl AsRef<Path>,
    libdir: &str,
    files: &mut SimpleFiles<String, String>,
) -> Result<Merger, MergeError> {
    Merger::load(main.as_ref(), libdir, files)
}
