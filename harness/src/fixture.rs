use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FixtureError;

/// Three or more `=` on a line of their own.
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^={3,}$").unwrap());

/// One sample case: program input and the output it must produce.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// 1-based position in the fixture file.
    pub num: usize,
    pub input: Vec<String>,
    pub expected: Vec<String>,
}

impl TestCase {
    /// Index of the first expected line that `actual` is missing or gets
    /// wrong. Extra trailing lines in `actual` are not checked.
    pub fn first_mismatch(&self, actual: &[String]) -> Option<usize> {
        self.expected
            .iter()
            .enumerate()
            .find(|&(i, line)| actual.get(i) != Some(line))
            .map(|(i, _)| i)
    }

    pub fn check(&self, actual: &[String]) -> bool {
        self.first_mismatch(actual).is_none()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Input,
    Expected,
}

/// Parse fixture text into numbered test cases.
///
/// Each case is its input lines, a `===` separator, then its expected
/// output, ended by a blank line or the end of the file. Lines are trimmed.
pub fn parse_fixture(source: &str) -> Result<Vec<TestCase>, FixtureError> {
    let mut cases = Vec::new();
    let mut input = Vec::new();
    let mut expected = Vec::new();
    let mut section = Section::Input;
    let mut case_start = 0;

    let mut finish = |input: &mut Vec<String>, expected: &mut Vec<String>| {
        let num = cases.len() + 1;
        cases.push(TestCase {
            num,
            input: std::mem::take(input),
            expected: std::mem::take(expected),
        });
    };

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        match section {
            Section::Input => {
                if line.is_empty() {
                    continue;
                }
                if SEPARATOR.is_match(line) {
                    section = Section::Expected;
                    continue;
                }
                if input.is_empty() {
                    case_start = index + 1;
                }
                input.push(line.to_string());
            }
            Section::Expected => {
                if line.is_empty() {
                    finish(&mut input, &mut expected);
                    section = Section::Input;
                    continue;
                }
                if SEPARATOR.is_match(line) {
                    return Err(FixtureError::UnexpectedSeparator { line: index + 1 });
                }
                expected.push(line.to_string());
            }
        }
    }

    match section {
        Section::Expected => finish(&mut input, &mut expected),
        Section::Input if !input.is_empty() => {
            return Err(FixtureError::MissingSeparator { line: case_start });
        }
        Section::Input => {}
    }

    Ok(cases)
}

pub fn load_fixture(path: &Path) -> Result<Vec<TestCase>, FixtureError> {
    let source = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fixture(&source)
}
