//! Run a compiled contest solution against a fixture of sample cases.

pub mod error;
pub mod fixture;
pub mod runner;

pub use error::{FixtureError, HarnessError};
pub use fixture::{TestCase, load_fixture, parse_fixture};
pub use runner::{DEFAULT_TIMEOUT, Outcome, Runner, normalize_output};
