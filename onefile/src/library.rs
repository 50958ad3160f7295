use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use codespan_reporting::files::SimpleFiles;

use crate::block::{Block, add_to_deps};
use crate::error::{MergeError, ParseError, read_source};
use crate::patterns::{BLOCK_ID, NAMESPACE_CLOSE, NAMESPACE_OPEN, STD_INCLUDE};

/// One snippet library: a single namespace split into blocks.
#[derive(Debug, Clone)]
pub struct LibraryFile {
    /// Library name, which is also the namespace name.
    pub name: String,
    /// `#include <...>` lines found anywhere in the file.
    pub headers: BTreeSet<String>,
    /// Blocks in declaration order.
    pub blocks: Vec<Block>,
    /// Source file ID (for error reporting with codespan-reporting).
    pub file_id: usize,
}

/// What a single library line means to the parser.
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    Header(&'a str),
    NamespaceOpen(&'a str),
    NamespaceClose,
    BlockMarker(&'a str),
    MalformedMarker(&'a str),
    Comment,
    Content(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if STD_INCLUDE.is_match(trimmed) {
        return LineKind::Header(trimmed);
    }
    if let Some(caps) = NAMESPACE_OPEN.captures(trimmed) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        return LineKind::NamespaceOpen(name);
    }
    if NAMESPACE_CLOSE.is_match(trimmed) {
        return LineKind::NamespaceClose;
    }
    // Only comments starting in the first column can be markers.
    if let Some(rest) = line.strip_prefix("//") {
        let rest = rest.trim();
        if !rest.starts_with("::") {
            return LineKind::Comment;
        }
        if BLOCK_ID.is_match(rest) {
            return LineKind::BlockMarker(rest);
        }
        return LineKind::MalformedMarker(rest);
    }
    LineKind::Content(line)
}

impl LibraryFile {
    /// Read `<libdir>/<name>.cpp`, register it in `files` and parse it.
    pub fn load(
        name: &str,
        libdir: &str,
        files: &mut SimpleFiles<String, String>,
    ) -> Result<Self, MergeError> {
        let path = Path::new(libdir).join(format!("{name}.cpp"));
        let source = read_source(&path)?;
        let file_id = files.add(path.display().to_string(), source.clone());
        let library = Self::parse(name, &source, file_id)?;
        log::info!(
            "loaded {} ({} blocks)",
            path.display(),
            library.blocks.len()
        );
        Ok(library)
    }

    /// Parse library source and link block dependencies.
    pub fn parse(name: &str, source: &str, file_id: usize) -> Result<Self, ParseError> {
        let mut headers = BTreeSet::new();
        let mut blocks: Vec<Block> = Vec::new();
        let mut current: Option<Block> = None;

        let mut offset = 0;
        for raw in source.split_inclusive('\n') {
            let start = offset;
            offset += raw.len();
            let line = raw.trim_end_matches(['\n', '\r']);
            let span = start..start + line.len();

            match classify(line) {
                LineKind::Header(header) => {
                    headers.insert(header.to_string());
                }
                LineKind::NamespaceOpen(ns) => {
                    if ns != name {
                        return Err(ParseError::new(
                            format!("namespace `{ns}` does not match library `{name}`"),
                            span,
                            file_id,
                        )
                        .with_note(format!("a library file must open `namespace {name} {{`")));
                    }
                }
                LineKind::NamespaceClose => match current.take() {
                    Some(block) => close_block(&mut blocks, block),
                    None => {
                        return Err(ParseError::new(
                            "namespace closed with no open block",
                            span,
                            file_id,
                        )
                        .with_note("every library needs at least one `//::name` marker"));
                    }
                },
                LineKind::BlockMarker(id) => {
                    if let Some(block) = current.take() {
                        close_block(&mut blocks, block);
                    }
                    let block = Block::new(name, id, span.start).map_err(|e| {
                        ParseError::new(
                            format!("cannot build a matcher for block `{id}`: {e}"),
                            span.clone(),
                            file_id,
                        )
                    })?;
                    current = Some(block);
                }
                LineKind::MalformedMarker(text) => {
                    return Err(ParseError::new(
                        format!("malformed block marker `{text}`"),
                        span,
                        file_id,
                    )
                    .with_note("block markers have the form `//::identifier`"));
                }
                LineKind::Comment => {}
                LineKind::Content(text) => {
                    if let Some(block) = current.as_mut() {
                        block.push_line(text, span.end);
                    }
                }
            }
        }

        if let Some(block) = current {
            return Err(ParseError::new(
                format!("hanging block `{}` in {name}.cpp", block.id),
                block.span.clone(),
                file_id,
            )
            .with_note("expected `} // namespace` after the last block")
            .with_note(format!("block content:\n{}", block.fulltext())));
        }

        warn_duplicate_ids(name, &blocks);
        link_dependencies(&mut blocks);

        Ok(LibraryFile {
            name: name.to_string(),
            headers,
            blocks,
            file_id,
        })
    }

    /// Indices of every block `body` needs, directly or through other blocks.
    pub fn needed(&self, body: &str) -> BTreeSet<usize> {
        let mut needed = BTreeSet::new();
        for (index, block) in self.blocks.iter().enumerate() {
            if block.appears_in(body, true) {
                add_to_deps(&self.blocks, index, &mut needed);
            }
        }
        needed
    }

    /// The needed blocks in declaration order, wrapped in this library's
    /// namespace. Empty when `body` uses nothing from the library.
    pub fn render(&self, body: &str) -> String {
        let needed = self.needed(body);
        if needed.is_empty() {
            return String::new();
        }

        let texts: Vec<String> = needed
            .iter()
            .map(|&index| {
                let block = &self.blocks[index];
                log::info!("adding {}", block.qualified_name());
                block.fulltext()
            })
            .collect();

        format!("namespace {} {{\n\n{}\n\n}}", self.name, texts.join("\n\n"))
    }
}

fn close_block(blocks: &mut Vec<Block>, mut block: Block) {
    block.strip_blank_lines();
    blocks.push(block);
}

fn warn_duplicate_ids(name: &str, blocks: &[Block]) {
    let mut seen = HashSet::new();
    for block in blocks {
        if !seen.insert(block.id.as_str()) {
            log::warn!("{name}.cpp declares block `{}` more than once", block.id);
        }
    }
}

/// Record `b2` as a dependency of `b1` whenever `b1` mentions `b2` by name.
fn link_dependencies(blocks: &mut [Block]) {
    let texts: Vec<String> = blocks.iter().map(Block::fulltext).collect();
    let mut edges = vec![Vec::new(); blocks.len()];

    for (i, text) in texts.iter().enumerate() {
        for (j, other) in blocks.iter().enumerate() {
            if i != j && other.appears_in(text, false) {
                log::debug!("{} depends on {}", blocks[i].id, other.id);
                edges[i].push(j);
            }
        }
    }

    for (block, deps) in blocks.iter_mut().zip(edges) {
        block.deps = deps;
    }
}
