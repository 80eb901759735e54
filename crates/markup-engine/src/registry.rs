//! Language registry mapping identifiers to renderer descriptors.
//!
//! The registry has two phases. While **configuring**, descriptors may be
//! registered; library dependencies are probed once at that point and the
//! result is cached with the entry. [`Registry::freeze`] moves it to
//! **serving**, after which it is read-only and any registration attempt is
//! rejected with [`RegistryError::Frozen`]. The transition is irreversible.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{RendererDescriptor, StrategyKind};
use crate::error::RegistryError;
use crate::identifier::normalize;
use crate::library::{BuiltinLibraries, Converter, LibraryError, LibraryLoader};
use crate::renderer::Renderer;
use crate::strategy::{CommandStrategy, LibraryStrategy};

/// What to do when an identifier is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail the registration.
    #[default]
    Reject,
    /// Replace the earlier entry and log a warning.
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Configuring,
    Serving,
}

/// A registered descriptor with its cached library probe.
struct Entry {
    descriptor: RendererDescriptor,
    converter: Option<Arc<dyn Converter>>,
}

impl Entry {
    fn renderer(&self) -> Renderer<'_> {
        let name = self.descriptor.name();
        match self.descriptor.kind() {
            StrategyKind::Command(spec) => Renderer::new(name, CommandStrategy::new(spec)),
            StrategyKind::Library(spec) => Renderer::new(
                name,
                LibraryStrategy::new(spec.dependency(), self.converter.as_ref()),
            ),
        }
    }

    fn is_available(&self) -> bool {
        match self.descriptor.kind() {
            StrategyKind::Command(spec) => which::which(spec.program()).is_ok(),
            StrategyKind::Library(_) => self.converter.is_some(),
        }
    }
}

/// Lookup table from language identifier to renderer descriptor.
pub struct Registry {
    entries: HashMap<String, Arc<Entry>>,
    policy: DuplicatePolicy,
    loader: Arc<dyn LibraryLoader>,
    phase: Phase,
}

impl Registry {
    /// Create an empty registry using [`BuiltinLibraries`] and rejecting duplicates.
    #[must_use]
    pub fn new() -> Self {
        Self::with_loader(BuiltinLibraries)
    }

    /// Create an empty registry resolving libraries through `loader`.
    #[must_use]
    pub fn with_loader(loader: impl LibraryLoader + 'static) -> Self {
        Self {
            entries: HashMap::new(),
            policy: DuplicatePolicy::default(),
            loader: Arc::new(loader),
            phase: Phase::Configuring,
        }
    }

    /// Set the duplicate identifier policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register `descriptor` under a single identifier.
    ///
    /// # Errors
    ///
    /// Fails when the registry is frozen, the identifier is empty or taken
    /// (under [`DuplicatePolicy::Reject`]), or the descriptor is invalid.
    pub fn register(
        &mut self,
        identifier: &str,
        descriptor: RendererDescriptor,
    ) -> Result<(), RegistryError> {
        self.ensure_configuring(identifier)?;

        let key = normalize(identifier);
        if key.is_empty() {
            return Err(invalid(&descriptor, "identifier cannot be empty"));
        }
        self.check_duplicates(std::slice::from_ref(&key))?;

        let entry = Arc::new(self.build_entry(descriptor)?);
        self.insert(key, entry);
        Ok(())
    }

    /// Register `descriptor` under every identifier it declares.
    ///
    /// Either all identifiers are registered or, on error, none are.
    ///
    /// # Errors
    ///
    /// Same conditions as [`register`](Self::register); a descriptor without
    /// identifiers is invalid.
    pub fn add(&mut self, descriptor: RendererDescriptor) -> Result<(), RegistryError> {
        let first = descriptor.identifiers().first().cloned().unwrap_or_default();
        self.ensure_configuring(&first)?;

        if descriptor.identifiers().iter().all(String::is_empty) {
            return Err(invalid(&descriptor, "at least one identifier is required"));
        }
        self.check_duplicates(descriptor.identifiers())?;

        let keys: Vec<String> = descriptor
            .identifiers()
            .iter()
            .filter(|key| !key.is_empty())
            .cloned()
            .collect();
        let entry = Arc::new(self.build_entry(descriptor)?);
        for key in keys {
            self.insert(key, Arc::clone(&entry));
        }
        Ok(())
    }

    /// Find the descriptor registered for `identifier`.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<&RendererDescriptor> {
        self.entry(identifier).map(|entry| &entry.descriptor)
    }

    /// Instantiate the renderer registered for `identifier`.
    #[must_use]
    pub fn renderer(&self, identifier: &str) -> Option<Renderer<'_>> {
        self.entry(identifier).map(|entry| entry.renderer())
    }

    /// Whether the tool or library behind `identifier` is present.
    ///
    /// Commands are resolved on the search path at call time; libraries
    /// report the probe cached at registration.
    #[must_use]
    pub fn is_available(&self, identifier: &str) -> Option<bool> {
        self.entry(identifier).map(|entry| entry.is_available())
    }

    /// Distinct registered descriptors, ordered by name.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&RendererDescriptor> {
        let mut entries: Vec<&Arc<Entry>> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.descriptor
                .name()
                .cmp(b.descriptor.name())
                .then_with(|| Arc::as_ptr(*a).cmp(&Arc::as_ptr(*b)))
        });
        entries.dedup_by(|a, b| Arc::ptr_eq(*a, *b));
        entries.into_iter().map(|entry| &entry.descriptor).collect()
    }

    /// Switch to the serving phase. Idempotent.
    pub fn freeze(&mut self) {
        if self.phase == Phase::Configuring {
            tracing::debug!(identifiers = self.entries.len(), "Registry frozen");
        }
        self.phase = Phase::Serving;
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.phase == Phase::Serving
    }

    /// Number of registered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, identifier: &str) -> Option<&Entry> {
        self.entries.get(&normalize(identifier)).map(|entry| &**entry)
    }

    fn ensure_configuring(&self, identifier: &str) -> Result<(), RegistryError> {
        if self.is_frozen() {
            tracing::error!(identifier, "Registration attempted on a frozen registry");
            return Err(RegistryError::Frozen {
                identifier: identifier.to_owned(),
            });
        }
        Ok(())
    }

    fn check_duplicates(&self, keys: &[String]) -> Result<(), RegistryError> {
        if self.policy == DuplicatePolicy::Override {
            return Ok(());
        }
        match keys.iter().find_map(|key| Some((key, self.entries.get(key)?))) {
            Some((key, existing)) => Err(RegistryError::Duplicate {
                identifier: key.clone(),
                existing: existing.descriptor.name().to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn build_entry(&self, descriptor: RendererDescriptor) -> Result<Entry, RegistryError> {
        if descriptor.name().trim().is_empty() {
            return Err(invalid(&descriptor, "name cannot be empty"));
        }

        let converter = match descriptor.kind() {
            StrategyKind::Command(spec) => {
                if spec.program().trim().is_empty() {
                    return Err(invalid(&descriptor, "command program cannot be empty"));
                }
                None
            }
            StrategyKind::Library(spec) => match self.loader.load(spec) {
                Ok(converter) => Some(converter),
                Err(LibraryError::Missing(dependency)) => {
                    tracing::debug!(
                        renderer = descriptor.name(),
                        dependency = %dependency,
                        "Library dependency unavailable"
                    );
                    None
                }
                Err(e) => return Err(invalid(&descriptor, &e.to_string())),
            },
        };

        Ok(Entry {
            descriptor,
            converter,
        })
    }

    fn insert(&mut self, key: String, entry: Arc<Entry>) {
        let replacement = entry.descriptor.name().to_owned();
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            tracing::warn!(
                identifier = %key,
                previous = previous.descriptor.name(),
                replacement = %replacement,
                "Overriding registered renderer"
            );
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("identifiers", &self.entries.len())
            .field("policy", &self.policy)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

fn invalid(descriptor: &RendererDescriptor, message: &str) -> RegistryError {
    RegistryError::InvalidDescriptor {
        name: descriptor.name().to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CommandSpec, LibrarySpec};
    use crate::library::BoxError;
    use crate::renderer::Render;
    use pretty_assertions::assert_eq;

    fn upcase(content: &str) -> Result<String, BoxError> {
        Ok(content.to_uppercase())
    }

    /// Loader knowing a single `upcase` dependency.
    struct StubLoader;

    impl LibraryLoader for StubLoader {
        fn load(&self, spec: &LibrarySpec) -> Result<Arc<dyn Converter>, LibraryError> {
            match spec.dependency() {
                "upcase" if spec.options().is_empty() => Ok(Arc::new(upcase)),
                "upcase" => Err(LibraryError::Options {
                    dependency: "upcase".to_owned(),
                    message: "takes no options".to_owned(),
                }),
                other => Err(LibraryError::Missing(other.to_owned())),
            }
        }
    }

    fn markdown() -> RendererDescriptor {
        RendererDescriptor::library("Markdown", LibrarySpec::new("upcase"))
            .with_identifiers(["md", "markdown"])
    }

    fn asciidoc() -> RendererDescriptor {
        RendererDescriptor::command("AsciiDoc", CommandSpec::new("asciidoctor"))
            .with_identifiers(["adoc", "asciidoc"])
    }

    fn textile() -> RendererDescriptor {
        RendererDescriptor::command("Textile", CommandSpec::new("pandoc"))
            .with_identifiers(["textile"])
    }

    #[test]
    fn test_lookup_returns_exact_descriptor() {
        let mut registry = Registry::with_loader(StubLoader);
        for descriptor in [markdown(), asciidoc(), textile()] {
            registry.add(descriptor).unwrap();
        }
        registry.freeze();

        for descriptor in [markdown(), asciidoc(), textile()] {
            for identifier in descriptor.identifiers() {
                assert_eq!(registry.lookup(identifier), Some(&descriptor));
            }
        }
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_lookup_normalizes_identifier() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.add(markdown()).unwrap();

        assert!(registry.lookup(".MD").is_some());
        assert!(registry.lookup("Markdown").is_some());
        assert!(registry.lookup("rst").is_none());
    }

    #[test]
    fn test_registration_order_is_irrelevant() {
        let mut forward = Registry::with_loader(StubLoader);
        let mut backward = Registry::with_loader(StubLoader);
        for descriptor in [markdown(), asciidoc(), textile()] {
            forward.add(descriptor).unwrap();
        }
        for descriptor in [textile(), asciidoc(), markdown()] {
            backward.add(descriptor).unwrap();
        }

        for identifier in ["md", "markdown", "adoc", "asciidoc", "textile", "org"] {
            assert_eq!(forward.lookup(identifier), backward.lookup(identifier));
        }
    }

    #[test]
    fn test_register_single_identifier() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.register(".mdown", markdown()).unwrap();

        assert_eq!(registry.lookup("mdown"), Some(&markdown()));
        assert!(registry.lookup("md").is_none());
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.add(markdown()).unwrap();

        let clash = RendererDescriptor::command("Other", CommandSpec::new("cat"))
            .with_identifiers(["mkd", "md"]);
        let err = registry.add(clash).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Duplicate { ref identifier, ref existing }
                if identifier == "md" && existing == "Markdown"
        ));
        // Nothing from the failed descriptor was registered.
        assert!(registry.lookup("mkd").is_none());
        assert_eq!(registry.lookup("md").unwrap().name(), "Markdown");
    }

    #[test]
    fn test_duplicate_override_replaces() {
        let mut registry = Registry::with_loader(StubLoader).with_policy(DuplicatePolicy::Override);
        registry.add(markdown()).unwrap();

        let replacement = RendererDescriptor::command("Pandoc", CommandSpec::new("pandoc"))
            .with_identifiers(["md"]);
        registry.add(replacement).unwrap();

        assert_eq!(registry.lookup("md").unwrap().name(), "Pandoc");
        assert_eq!(registry.lookup("markdown").unwrap().name(), "Markdown");
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.add(markdown()).unwrap();
        registry.freeze();
        assert!(registry.is_frozen());

        let err = registry.add(asciidoc()).unwrap_err();
        assert!(matches!(err, RegistryError::Frozen { ref identifier } if identifier == "adoc"));

        let err = registry.register("rst", textile()).unwrap_err();
        assert!(matches!(err, RegistryError::Frozen { .. }));

        assert!(registry.lookup("adoc").is_none());
        assert!(registry.lookup("md").is_some());
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.freeze();
        registry.freeze();
        assert!(registry.is_frozen());
    }

    #[test]
    fn test_invalid_descriptors() {
        let mut registry = Registry::with_loader(StubLoader);

        let no_ids = RendererDescriptor::command("Bare", CommandSpec::new("cat"));
        assert!(matches!(
            registry.add(no_ids),
            Err(RegistryError::InvalidDescriptor { .. })
        ));

        let empty_program = RendererDescriptor::command("Empty", CommandSpec::new(" "))
            .with_identifiers(["x"]);
        assert!(matches!(
            registry.add(empty_program),
            Err(RegistryError::InvalidDescriptor { .. })
        ));

        assert!(matches!(
            registry.register("", markdown()),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_invalid_library_options_fail_registration() {
        let mut registry = Registry::with_loader(StubLoader);
        let descriptor =
            RendererDescriptor::library("Shout", LibrarySpec::new("upcase").option("loud", "true"))
                .with_identifiers(["shout"]);

        let err = registry.add(descriptor).unwrap_err();
        assert!(err.to_string().contains("takes no options"));
    }

    #[test]
    fn test_missing_library_is_registered_but_unavailable() {
        let mut registry = Registry::with_loader(StubLoader);
        let descriptor = RendererDescriptor::library("Textile", LibrarySpec::new("redcloth"))
            .with_identifiers(["textile"]);
        registry.add(descriptor).unwrap();

        assert_eq!(registry.is_available("textile"), Some(false));
        let err = registry.renderer("textile").unwrap().render("h1. x").unwrap_err();
        assert!(matches!(
            err,
            crate::RenderError::DependencyMissing { ref dependency } if dependency == "redcloth"
        ));
    }

    #[test]
    fn test_availability() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.add(markdown()).unwrap();
        registry
            .add(
                RendererDescriptor::command("Ghost", CommandSpec::new("markup-no-such-tool-xyz"))
                    .with_identifiers(["ghost"]),
            )
            .unwrap();

        assert_eq!(registry.is_available("md"), Some(true));
        assert_eq!(registry.is_available("ghost"), Some(false));
        assert_eq!(registry.is_available("nope"), None);
    }

    #[test]
    fn test_descriptors_are_distinct_and_sorted() {
        let mut registry = Registry::with_loader(StubLoader);
        for descriptor in [textile(), markdown(), asciidoc()] {
            registry.add(descriptor).unwrap();
        }

        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name()).collect();
        assert_eq!(names, ["AsciiDoc", "Markdown", "Textile"]);
    }

    #[test]
    fn test_renderer_instantiation() {
        let mut registry = Registry::with_loader(StubLoader);
        registry.add(markdown()).unwrap();

        let renderer = registry.renderer("md").unwrap();
        assert_eq!(renderer.name(), "Markdown");
        assert_eq!(renderer.render("hello").unwrap(), "HELLO");
    }

    static_assertions::assert_impl_all!(Registry: Send, Sync);
}
