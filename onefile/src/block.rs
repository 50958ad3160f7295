use std::collections::BTreeSet;
use std::ops::Range;

use regex::Regex;

/// A named chunk of library code, introduced by a `//::name` marker.
#[derive(Debug, Clone)]
pub struct Block {
    /// Namespace of the owning library file.
    pub namespace: String,
    /// Scoped identifier as written in the marker, e.g. `::dsu`.
    pub id: String,
    /// Content lines, trailing whitespace and blank lines removed.
    pub lines: Vec<String>,
    /// Indices of sibling blocks (same library) this block mentions.
    pub deps: Vec<usize>,
    /// Byte span in the library source, marker through last content line.
    pub span: Range<usize>,
    /// Bare name as a whole token.
    name_pattern: Regex,
    /// `namespace::name` as a whole token.
    qualified_pattern: Regex,
}

impl Block {
    pub fn new(
        namespace: impl Into<String>,
        id: impl Into<String>,
        start: usize,
    ) -> Result<Self, regex::Error> {
        let namespace = namespace.into();
        let id = id.into();
        let name = id.strip_prefix("::").unwrap_or(&id);
        let name_pattern = token_pattern(name)?;
        let qualified_pattern = token_pattern(&format!("{namespace}{id}"))?;
        Ok(Block {
            namespace,
            id,
            lines: Vec::new(),
            deps: Vec::new(),
            span: start..start,
            name_pattern,
            qualified_pattern,
        })
    }

    /// The identifier without its leading `::`.
    pub fn name(&self) -> &str {
        self.id.strip_prefix("::").unwrap_or(&self.id)
    }

    /// `namespace::name`, the way the main program refers to this block.
    pub fn qualified_name(&self) -> String {
        format!("{}{}", self.namespace, self.id)
    }

    /// Whether the block's identifier occurs in `text` as a whole token.
    ///
    /// Library code refers to siblings without the namespace, so dependency
    /// detection passes `fully_qualified = false`.
    pub fn appears_in(&self, text: &str, fully_qualified: bool) -> bool {
        if fully_qualified {
            self.qualified_pattern.is_match(text)
        } else {
            self.name_pattern.is_match(text)
        }
    }

    pub fn fulltext(&self) -> String {
        self.lines.join("\n")
    }

    pub(crate) fn push_line(&mut self, line: &str, end: usize) {
        self.lines.push(line.trim_end().to_string());
        self.span.end = end;
    }

    pub(crate) fn strip_blank_lines(&mut self) {
        self.lines.retain(|line| !line.is_empty());
    }
}

/// Insert `root` and everything it transitively depends on into `needed`.
///
/// Blocks already in `needed` are not revisited, so dependency cycles
/// terminate.
pub fn add_to_deps(blocks: &[Block], root: usize, needed: &mut BTreeSet<usize>) {
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        if !needed.insert(index) {
            continue;
        }
        stack.extend(
            blocks[index]
                .deps
                .iter()
                .copied()
                .filter(|dep| !needed.contains(dep)),
        );
    }
}

/// `token` with no identifier character directly before or after it. The
/// start and end of the text count as boundaries.
fn token_pattern(token: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?:^|[^A-Za-z0-9_]){}(?:$|[^A-Za-z0-9_])",
        regex::escape(token)
    ))
}
