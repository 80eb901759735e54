//! Rendering through an in-process converter.

use std::sync::Arc;

use crate::error::RenderError;
use crate::library::Converter;
use crate::renderer::Strategy;

/// Strategy that calls a library converter directly, without a subprocess.
///
/// The converter was resolved when the descriptor was registered. When that
/// probe failed, every render reports the dependency as missing.
#[derive(Clone)]
pub struct LibraryStrategy<'a> {
    dependency: &'a str,
    converter: Option<&'a Arc<dyn Converter>>,
}

impl<'a> LibraryStrategy<'a> {
    /// Build a strategy for `dependency`, with `None` marking it unavailable.
    #[must_use]
    pub fn new(dependency: &'a str, converter: Option<&'a Arc<dyn Converter>>) -> Self {
        Self {
            dependency,
            converter,
        }
    }
}

impl Strategy for LibraryStrategy<'_> {
    fn execute(&self, content: &str) -> Result<String, RenderError> {
        let converter = self.converter.ok_or_else(|| RenderError::DependencyMissing {
            dependency: self.dependency.to_owned(),
        })?;

        tracing::debug!(
            dependency = self.dependency,
            bytes = content.len(),
            "Calling library converter"
        );

        converter.convert(content).map_err(|e| {
            tracing::warn!(dependency = self.dependency, error = %e, "Library converter failed");
            RenderError::rendering(format!("{}: {e}", self.dependency))
        })
    }
}

impl std::fmt::Debug for LibraryStrategy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStrategy")
            .field("dependency", &self.dependency)
            .field("available", &self.converter.is_some())
            .finish()
    }
}
