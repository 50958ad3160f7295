use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: test input has no `===` separator before the end of the file")]
    MissingSeparator { line: usize },

    #[error("line {line}: second `===` separator in the same test case")]
    UnexpectedSeparator { line: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("cannot start '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running test: {0}")]
    Io(#[from] io::Error),
}
