//! Rendering facade: the single entry point for callers.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{RegistryError, RenderError};
use crate::identifier;
use crate::languages;
use crate::registry::Registry;
use crate::renderer::{Render, Renderer};

/// Resolves identifiers through a frozen [`Registry`] and delegates to the
/// matching renderer.
///
/// The engine holds no language-specific logic. It is cheap to clone and can
/// be shared across threads; every clone serves from the same registry.
///
/// # Example
///
/// ```
/// use markup_engine::{Engine, ErrorKind};
///
/// let engine = Engine::with_builtin(None).unwrap();
/// let err = engine.render("notes.unknownext", "x").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
}

impl Engine {
    /// Freeze `registry` and serve from it.
    #[must_use]
    pub fn new(mut registry: Registry) -> Self {
        registry.freeze();
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Engine over the built-in languages only.
    ///
    /// # Errors
    ///
    /// Propagates registration failures of the built-in descriptors.
    pub fn with_builtin(timeout: Option<Duration>) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        languages::register_builtin(&mut registry, timeout)?;
        Ok(Self::new(registry))
    }

    /// Render `content` with the renderer for `identifier_or_filename`.
    ///
    /// A filename (`docs/intro.adoc`) is resolved through its extension; any
    /// other input is used as an identifier (`markdown`, `.md`).
    ///
    /// # Errors
    ///
    /// [`RenderError::UnsupportedFormat`] when nothing is registered for the
    /// identifier; otherwise whatever the renderer returns, unchanged.
    pub fn render(&self, identifier_or_filename: &str, content: &str) -> Result<String, RenderError> {
        let renderer = self.renderer(identifier_or_filename)?;
        tracing::debug!(
            identifier = identifier_or_filename,
            language = renderer.name(),
            bytes = content.len(),
            "Rendering"
        );
        renderer.render(content)
    }

    /// Instantiate the renderer for `identifier_or_filename`.
    ///
    /// # Errors
    ///
    /// [`RenderError::UnsupportedFormat`] when nothing is registered.
    pub fn renderer(&self, identifier_or_filename: &str) -> Result<Renderer<'_>, RenderError> {
        let key = identifier::resolve(identifier_or_filename);
        self.registry
            .renderer(&key)
            .ok_or_else(|| RenderError::UnsupportedFormat {
                identifier: identifier_or_filename.to_owned(),
            })
    }

    /// Whether a renderer is registered for `identifier_or_filename`.
    #[must_use]
    pub fn can_render(&self, identifier_or_filename: &str) -> bool {
        self.language(identifier_or_filename).is_some()
    }

    /// Display name of the language handling `identifier_or_filename`.
    #[must_use]
    pub fn language(&self, identifier_or_filename: &str) -> Option<&str> {
        self.registry
            .lookup(&identifier::resolve(identifier_or_filename))
            .map(|descriptor| descriptor.name())
    }

    /// The frozen registry backing this engine.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
