//! In-process converters and the loader that resolves them.
//!
//! A [`LibraryLoader`] turns a [`LibrarySpec`] into a ready [`Converter`].
//! The registry asks once, at registration time, and caches the outcome.
//! [`BuiltinLibraries`] knows the converters compiled into this crate; which
//! ones are present depends on Cargo features.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptor::LibrarySpec;

/// Boxed error returned by converters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A library routine converting markup to HTML.
pub trait Converter: Send + Sync {
    fn convert(&self, content: &str) -> Result<String, BoxError>;
}

impl<F> Converter for F
where
    F: Fn(&str) -> Result<String, BoxError> + Send + Sync,
{
    fn convert(&self, content: &str) -> Result<String, BoxError> {
        self(content)
    }
}

/// Failure to load a converter.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The dependency is unknown or not compiled in.
    #[error("dependency '{0}' is not available")]
    Missing(String),
    /// The dependency exists but rejected the descriptor options.
    #[error("invalid options for '{dependency}': {message}")]
    Options { dependency: String, message: String },
}

/// Resolves library dependencies into converters.
pub trait LibraryLoader: Send + Sync {
    /// Probe for `spec.dependency()` and build its converter with `spec.options()`.
    fn load(&self, spec: &LibrarySpec) -> Result<Arc<dyn Converter>, LibraryError>;
}

/// Loader for the converters linked into this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLibraries;

impl BuiltinLibraries {
    /// Names of all dependencies this loader knows, available or not.
    pub const KNOWN: &'static [&'static str] = &["pulldown-cmark", "comrak"];
}

impl LibraryLoader for BuiltinLibraries {
    fn load(&self, spec: &LibrarySpec) -> Result<Arc<dyn Converter>, LibraryError> {
        match spec.dependency() {
            #[cfg(feature = "pulldown-cmark")]
            "pulldown-cmark" => cmark::load(spec.options()),
            #[cfg(feature = "comrak")]
            "comrak" => gfm::load(spec.options()),
            other => Err(LibraryError::Missing(other.to_owned())),
        }
    }
}

/// Read boolean options, rejecting unknown keys and non-boolean values.
#[cfg_attr(not(any(feature = "pulldown-cmark", feature = "comrak")), allow(dead_code))]
fn flags<'a>(
    dependency: &str,
    options: &'a BTreeMap<String, String>,
    known: &[&str],
) -> Result<Vec<(&'a str, bool)>, LibraryError> {
    options
        .iter()
        .map(|(key, value)| {
            if !known.contains(&key.as_str()) {
                return Err(LibraryError::Options {
                    dependency: dependency.to_owned(),
                    message: format!("unknown option '{key}' (expected one of: {})", known.join(", ")),
                });
            }
            let enabled = match value.as_str() {
                "true" | "yes" | "on" => true,
                "false" | "no" | "off" => false,
                _ => {
                    return Err(LibraryError::Options {
                        dependency: dependency.to_owned(),
                        message: format!("option '{key}' must be a boolean, got '{value}'"),
                    });
                }
            };
            Ok((key.as_str(), enabled))
        })
        .collect()
}

#[cfg(feature = "pulldown-cmark")]
mod cmark {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use pulldown_cmark::{Options, Parser, html};

    use super::{BoxError, Converter, LibraryError, flags};

    const KNOWN: &[&str] = &[
        "tables",
        "strikethrough",
        "tasklists",
        "footnotes",
        "smart-punctuation",
        "heading-attributes",
    ];

    struct PulldownCmark {
        options: Options,
    }

    impl Converter for PulldownCmark {
        fn convert(&self, content: &str) -> Result<String, BoxError> {
            let parser = Parser::new_ext(content, self.options);
            let mut out = String::with_capacity(content.len() * 3 / 2);
            html::push_html(&mut out, parser);
            Ok(out)
        }
    }

    pub(super) fn load(
        options: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Converter>, LibraryError> {
        let mut parsed = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES;

        for (key, enabled) in flags("pulldown-cmark", options, KNOWN)? {
            let flag = match key {
                "tables" => Options::ENABLE_TABLES,
                "strikethrough" => Options::ENABLE_STRIKETHROUGH,
                "tasklists" => Options::ENABLE_TASKLISTS,
                "footnotes" => Options::ENABLE_FOOTNOTES,
                "smart-punctuation" => Options::ENABLE_SMART_PUNCTUATION,
                _ => Options::ENABLE_HEADING_ATTRIBUTES,
            };
            parsed.set(flag, enabled);
        }

        Ok(Arc::new(PulldownCmark { options: parsed }))
    }
}

#[cfg(feature = "comrak")]
mod gfm {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::{BoxError, Converter, LibraryError, flags};

    const KNOWN: &[&str] = &[
        "table",
        "strikethrough",
        "autolink",
        "tasklist",
        "footnotes",
        "hardbreaks",
        "unsafe",
    ];

    struct Comrak {
        options: comrak::Options<'static>,
    }

    impl Converter for Comrak {
        fn convert(&self, content: &str) -> Result<String, BoxError> {
            Ok(comrak::markdown_to_html(content, &self.options))
        }
    }

    pub(super) fn load(
        options: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Converter>, LibraryError> {
        let mut parsed = comrak::Options::default();
        let ext = &mut parsed.extension;
        ext.table = true;
        ext.strikethrough = true;
        ext.autolink = true;
        ext.tasklist = true;

        for (key, enabled) in flags("comrak", options, KNOWN)? {
            match key {
                "table" => parsed.extension.table = enabled,
                "strikethrough" => parsed.extension.strikethrough = enabled,
                "autolink" => parsed.extension.autolink = enabled,
                "tasklist" => parsed.extension.tasklist = enabled,
                "footnotes" => parsed.extension.footnotes = enabled,
                "hardbreaks" => parsed.render.hardbreaks = enabled,
                _ => parsed.render.r#unsafe = enabled,
            }
        }

        Ok(Arc::new(Comrak { options: parsed }))
    }
}
