//! Markup-to-HTML rendering engine.
//!
//! Converts many markup formats (Markdown, AsciiDoc, reStructuredText, RDoc,
//! Textile, Org, ...) to HTML through one call, whether the work is done by
//! an external command or an in-process library.
//!
//! # Architecture
//!
//! - [`Render`]: the contract every renderer satisfies
//! - [`CommandStrategy`] / [`LibraryStrategy`]: the two execution models
//! - [`RendererDescriptor`]: immutable per-language configuration
//! - [`Registry`]: identifier lookup with a configure-then-serve lifecycle
//! - [`Engine`]: the facade resolving an identifier and delegating
//!
//! # Example
//!
//! ```
//! use markup_engine::{CommandSpec, Engine, Registry, RendererDescriptor};
//!
//! let mut registry = Registry::new();
//! registry
//!     .add(
//!         RendererDescriptor::command("Plain", CommandSpec::new("cat"))
//!             .with_identifiers(["txt"]),
//!     )
//!     .unwrap();
//!
//! let engine = Engine::new(registry);
//! # #[cfg(unix)]
//! assert_eq!(engine.render("notes.txt", "<p>hi</p>").unwrap(), "<p>hi</p>");
//! ```

mod descriptor;
mod engine;
mod error;
pub mod identifier;
pub mod languages;
mod library;
mod registry;
mod renderer;
mod strategy;

pub use descriptor::{CommandSpec, LibrarySpec, RendererDescriptor, StrategyKind};
pub use engine::Engine;
pub use error::{ErrorKind, RegistryError, RenderError};
pub use library::{BoxError, BuiltinLibraries, Converter, LibraryError, LibraryLoader};
pub use registry::{DuplicatePolicy, Registry};
pub use renderer::{Render, Renderer, Strategy};
pub use strategy::{CommandStrategy, LibraryStrategy};
