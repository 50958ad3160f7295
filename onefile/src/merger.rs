use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

use codespan_reporting::files::SimpleFiles;

use crate::error::{MergeError, read_source};
use crate::library::LibraryFile;
use crate::patterns::{STD_INCLUDE, library_include};

/// One line of the main program, before library placeholders are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// A line of the program, kept verbatim (trailing whitespace trimmed).
    Text(String),
    /// A library include, replaced by the library's rendering later.
    /// Indexes the merger's loaded libraries.
    Library(usize),
}

/// A main program together with the libraries it includes.
#[derive(Debug)]
pub struct Merger {
    libdir: String,
    headers: BTreeSet<String>,
    lines: Vec<Line>,
    libraries: Vec<LibraryFile>,
    body: String,
}

impl Merger {
    /// Read `main` and load every library it includes from `libdir`.
    pub fn load(
        main: &Path,
        libdir: &str,
        files: &mut SimpleFiles<String, String>,
    ) -> Result<Self, MergeError> {
        let source = read_source(main)?;
        let libdir = libdir.trim_end_matches('/');
        Self::from_source(&source, libdir, |name| LibraryFile::load(name, libdir, files))
    }

    /// Build a merger from program text, asking `load_library` for each
    /// distinct library name the program includes.
    pub fn from_source<F>(source: &str, libdir: &str, mut load_library: F) -> Result<Self, MergeError>
    where
        F: FnMut(&str) -> Result<LibraryFile, MergeError>,
    {
        let libdir = libdir.trim_end_matches('/');
        let include = library_include(libdir).map_err(|source| MergeError::Pattern {
            libdir: libdir.to_string(),
            source,
        })?;

        let mut headers = BTreeSet::new();
        let mut lines = Vec::new();
        let mut libraries: Vec<LibraryFile> = Vec::new();

        for raw in source.lines() {
            let trimmed = raw.trim();
            if STD_INCLUDE.is_match(trimmed) {
                headers.insert(trimmed.to_string());
                continue;
            }

            if let Some(caps) = include.captures(trimmed) {
                let name = caps.get(1).map_or("", |m| m.as_str());
                let index = match libraries.iter().position(|lib| lib.name == name) {
                    Some(index) => index,
                    None => {
                        let library = load_library(name)?;
                        headers.extend(library.headers.iter().cloned());
                        libraries.push(library);
                        libraries.len() - 1
                    }
                };
                lines.push(Line::Library(index));
                continue;
            }

            lines.push(Line::Text(raw.trim_end().to_string()));
        }

        // Only hand-written program text decides which blocks are needed.
        let body = lines
            .iter()
            .filter_map(|line| match line {
                Line::Text(text) => Some(text.as_str()),
                Line::Library(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Merger {
            libdir: libdir.to_string(),
            headers,
            lines,
            libraries,
            body,
        })
    }

    /// Headers of the program and of every included library.
    pub fn headers(&self) -> &BTreeSet<String> {
        &self.headers
    }

    /// The program text used to decide which blocks are needed.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Program lines with every library include replaced by its rendering.
    ///
    /// A library included more than once is rendered at its first include
    /// only; the repeats produce no line at all.
    pub fn render(&self) -> Vec<String> {
        log::debug!(
            "resolving {} library include(s) from {}",
            self.libraries.len(),
            self.libdir
        );
        let mut rendered = vec![false; self.libraries.len()];
        let mut out = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            match line {
                Line::Text(text) => out.push(text.clone()),
                Line::Library(index) => {
                    if !std::mem::replace(&mut rendered[*index], true) {
                        out.push(self.libraries[*index].render(&self.body));
                    }
                }
            }
        }

        out
    }

    /// Write sorted headers, then the rendered program, one line each.
    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        for header in &self.headers {
            writeln!(out, "{header}")?;
        }
        for line in self.render() {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(name: &str, source: &str) -> LibraryFile {
        LibraryFile::parse(name, source, 0).expect("parse failed")
    }

    fn merged(merger: &Merger) -> String {
        let mut out = Vec::new();
        merger.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    const FOO: &str = "namespace foo {\n//::bar\nvoid bar(){}\n} // namespace\n";

    #[test]
    fn end_to_end() {
        let main = "#include <iostream>\n#include \"lib/foo.cpp\"\nint main(){ foo::bar(); }\n";
        let merger = Merger::from_source(main, "lib", |name| Ok(library(name, FOO))).unwrap();

        assert_eq!(
            merged(&merger),
            "#include <iostream>\nnamespace foo {\n\nvoid bar(){}\n\n}\nint main(){ foo::bar(); }\n"
        );
    }

    #[test]
    fn placeholders_are_excluded_from_body() {
        let main = "#include \"lib/foo.cpp\"\n\nint main() {}   \n";
        let merger = Merger::from_source(main, "lib/", |name| Ok(library(name, FOO))).unwrap();

        assert_eq!(merger.libdir, "lib");
        assert_eq!(merger.body(), "\nint main() {}");
        assert_eq!(
            merger.lines,
            [
                Line::Library(0),
                Line::Text(String::new()),
                Line::Text("int main() {}".to_string()),
            ]
        );
    }

    #[test]
    fn unused_library_still_contributes_headers() {
        let lib = "#include <vector>\n#include <algorithm>\nnamespace foo {\n//::bar\nvoid bar(){}\n} // namespace\n";
        let main = "#include <vector>\n#include <cstdio>\n#include \"lib/foo.cpp\"\nint main(){}\n";
        let merger = Merger::from_source(main, "lib", |name| Ok(library(name, lib))).unwrap();

        let headers: Vec<&str> = merger.headers().iter().map(String::as_str).collect();
        assert_eq!(
            headers,
            vec!["#include <algorithm>", "#include <cstdio>", "#include <vector>"]
        );
        assert_eq!(merger.render(), vec!["", "int main(){}"]);
    }

    #[test]
    fn repeated_include_loads_and_renders_once() {
        let main = "#include \"lib/foo.cpp\"\n#include \"lib/foo.cpp\"\nint main(){ foo::bar(); }\n";
        let mut loads = 0;
        let merger = Merger::from_source(main, "lib", |name| {
            loads += 1;
            Ok(library(name, FOO))
        })
        .unwrap();

        assert_eq!(loads, 1);
        assert_eq!(merger.libraries.len(), 1);
        let rendered = merger.render();
        assert_eq!(rendered.len(), 2);
        assert_eq!(merged(&merger).matches("void bar(){}").count(), 1);
    }

    #[test]
    fn libraries_do_not_trigger_each_other() {
        let a = "namespace a {\n//::f\nint f() { return b::g(); }\n} // namespace\n";
        let b = "namespace b {\n//::g\nint g() { return 1; }\n} // namespace\n";
        let main = "#include \"lib/a.cpp\"\n#include \"lib/b.cpp\"\nint main(){ return a::f(); }\n";
        let merger = Merger::from_source(main, "lib", |name| {
            Ok(library(name, if name == "a" { a } else { b }))
        })
        .unwrap();

        let out = merger.render();
        assert!(out[0].contains("int f()"));
        assert_eq!(out[1], "");
    }

    #[test]
    fn other_includes_stay_in_body() {
        let main = "#include \"other/foo.cpp\"\n#include <bits/stdc++.h>\nint main(){}\n";
        let merger =
            Merger::from_source(main, "lib", |_| panic!("no library should be loaded")).unwrap();
        assert!(merger.headers().is_empty());
        assert_eq!(
            merger.render(),
            vec!["#include \"other/foo.cpp\"", "#include <bits/stdc++.h>", "int main(){}"]
        );
    }

    #[test]
    fn load_error_propagates() {
        let main = "#include \"lib/missing.cpp\"\n";
        let err = Merger::from_source(main, "lib", |name| {
            Err(MergeError::Io {
                path: format!("lib/{name}.cpp").into(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            })
        })
        .unwrap_err();
        assert!(err.to_string().contains("lib/missing.cpp"));
    }
}
