//! The renderer contract and the composed [`Renderer`].

use crate::error::RenderError;

/// Transform markup text into HTML.
///
/// Implementations are stateless between calls: nothing from one invocation
/// may influence a later one. They are shared across threads, so any
/// configuration they carry must be immutable.
pub trait Render: Send + Sync {
    /// Render `content` to HTML.
    fn render(&self, content: &str) -> Result<String, RenderError>;
}

/// One of the interchangeable execution mechanisms behind a [`Renderer`].
///
/// Strategies receive the language parameters from the descriptor they were
/// built from and otherwise satisfy the same contract as [`Render`].
pub trait Strategy: Send + Sync {
    /// Convert `content` to HTML.
    fn execute(&self, content: &str) -> Result<String, RenderError>;
}

/// A renderer for one language: a display name plus the strategy doing the work.
///
/// Renderers are cheap to build and borrow their configuration from the
/// registry entry they were instantiated from.
pub struct Renderer<'r> {
    name: &'r str,
    strategy: Box<dyn Strategy + 'r>,
}

impl<'r> Renderer<'r> {
    /// Compose a renderer from a name and a strategy.
    pub fn new(name: &'r str, strategy: impl Strategy + 'r) -> Self {
        Self {
            name,
            strategy: Box::new(strategy),
        }
    }

    /// Display name of the language.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }
}

impl Render for Renderer<'_> {
    fn render(&self, content: &str) -> Result<String, RenderError> {
        self.strategy.execute(content)
    }
}

impl std::fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").field("name", &self.name).finish_non_exhaustive()
    }
}
