//! Language identifier normalization.
//!
//! Identifiers are file extensions (`md`, `.adoc`) or symbolic names
//! (`markdown`). Both forms share a single key space: lookups are
//! case-insensitive and ignore one leading dot.

use std::path::Path;

/// Normalize a registration or lookup key.
///
/// Lowercases and strips a single leading dot, so `.MD`, `md` and `Md`
/// compare equal.
#[must_use]
pub fn normalize(identifier: &str) -> String {
    let trimmed = identifier.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Derive the lookup key from either an identifier or a filename.
///
/// Inputs containing a path separator, or a dot after the first character,
/// are treated as filenames and resolved through their extension. A
/// filename without an extension falls back to its full file name, which
/// normally matches no renderer.
#[must_use]
pub fn resolve(identifier_or_filename: &str) -> String {
    if !looks_like_filename(identifier_or_filename) {
        return normalize(identifier_or_filename);
    }

    let path = Path::new(identifier_or_filename);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => normalize(ext),
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .map(normalize)
            .unwrap_or_default(),
    }
}

fn looks_like_filename(input: &str) -> bool {
    input.contains(['/', '\\']) || input.get(1..).is_some_and(|rest| rest.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("md"), "md");
        assert_eq!(normalize(".md"), "md");
        assert_eq!(normalize(".MD"), "md");
        assert_eq!(normalize("Markdown"), "markdown");
        assert_eq!(normalize("  rst "), "rst");
    }

    #[test]
    fn test_resolve_symbolic_names() {
        assert_eq!(resolve("markdown"), "markdown");
        assert_eq!(resolve("AsciiDoc"), "asciidoc");
        assert_eq!(resolve(".adoc"), "adoc");
    }

    #[test]
    fn test_resolve_filenames() {
        assert_eq!(resolve("doc.md"), "md");
        assert_eq!(resolve("README.MARKDOWN"), "markdown");
        assert_eq!(resolve("file.unknownext"), "unknownext");
        assert_eq!(resolve("docs/guide/intro.adoc"), "adoc");
        assert_eq!(resolve("archive.tar.gz"), "gz");
    }

    #[test]
    fn test_resolve_filename_without_extension() {
        assert_eq!(resolve("docs/README"), "readme");
        assert_eq!(resolve("docs/.profile"), "profile");
    }
}
