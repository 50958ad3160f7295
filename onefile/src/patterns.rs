use once_cell::sync::Lazy;
use regex::Regex;

/// `#include <name>`, matched against a trimmed line.
pub static STD_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#include +<[A-Za-z0-9_.]+>$").unwrap());

/// `namespace <name> {`, matched against a trimmed line.
pub static NAMESPACE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^namespace\s+(.+?)\s*\{$").unwrap());

/// `} // namespace`, anything after it is ignored.
pub static NAMESPACE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\}\s*//\s*namespace").unwrap());

/// `::name`, the remainder of a block marker comment.
pub static BLOCK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^::[A-Za-z0-9_]+$").unwrap());

/// `#include "<libdir>/<name>.cpp"` for one library directory.
pub fn library_include(libdir: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"^#include +"{}/(.+)\.cpp"$"#,
        regex::escape(libdir)
    ))
}
