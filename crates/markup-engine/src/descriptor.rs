//! Renderer descriptors: immutable per-language configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::identifier::normalize;

/// Immutable description of one markup language.
///
/// A descriptor names the language, lists the identifiers it answers to and
/// chooses the strategy that performs the conversion. Descriptors are plain
/// values; the [`Registry`](crate::Registry) owns them once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererDescriptor {
    name: String,
    identifiers: Vec<String>,
    kind: StrategyKind,
}

impl RendererDescriptor {
    /// Create a descriptor backed by an external command.
    pub fn command(name: impl Into<String>, spec: CommandSpec) -> Self {
        Self::new(name, StrategyKind::Command(spec))
    }

    /// Create a descriptor backed by an in-process library.
    pub fn library(name: impl Into<String>, spec: LibrarySpec) -> Self {
        Self::new(name, StrategyKind::Library(spec))
    }

    fn new(name: impl Into<String>, kind: StrategyKind) -> Self {
        Self {
            name: name.into(),
            identifiers: Vec::new(),
            kind,
        }
    }

    /// Add identifiers (extensions or symbolic names).
    ///
    /// Identifiers are normalized; repeats are dropped.
    #[must_use]
    pub fn with_identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for identifier in identifiers {
            let key = normalize(identifier.as_ref());
            if !self.identifiers.contains(&key) {
                self.identifiers.push(key);
            }
        }
        self
    }

    /// Display name, e.g. "Markdown".
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized identifiers in declaration order.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Strategy used to perform the conversion.
    #[must_use]
    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }
}

/// Execution model of a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyKind {
    /// Pipe content through an external executable.
    Command(CommandSpec),
    /// Call an in-process converter.
    Library(LibrarySpec),
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(spec) => write!(f, "command `{spec}`"),
            Self::Library(spec) => write!(f, "library `{}`", spec.dependency),
        }
    }
}

/// External command invocation.
///
/// The program and its arguments are kept as a pre-split vector and are
/// never joined into a shell string. Content reaches the process only
/// through its standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    bound: Bound,
}

/// Execution time bound of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    /// Not set; a default may still apply.
    Inherit,
    /// Explicitly unbounded; defaults do not apply.
    Unbounded,
    Within(Duration),
}

impl CommandSpec {
    /// Create a command spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            bound: Bound::Inherit,
        }
    }

    /// Build a spec from an argument vector (`argv[0]` is the program).
    ///
    /// Returns `None` for an empty vector.
    #[must_use]
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
            bound: Bound::Inherit,
        })
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bound the wall-clock execution time.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.bound = Bound::Within(timeout);
        self
    }

    /// Run without a time bound, ignoring any default applied later.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.bound = Bound::Unbounded;
        self
    }

    /// Apply `timeout` unless the spec already carries its own bound or was
    /// made explicitly unbounded.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        if let (Bound::Inherit, Some(timeout)) = (self.bound, timeout) {
            self.bound = Bound::Within(timeout);
        }
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self.bound {
            Bound::Within(timeout) => Some(timeout),
            Bound::Inherit | Bound::Unbounded => None,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// In-process library conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySpec {
    dependency: String,
    options: BTreeMap<String, String>,
}

impl LibrarySpec {
    /// Create a spec for the named dependency with default options.
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            options: BTreeMap::new(),
        }
    }

    /// Set one converter option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Dependency name resolved by the [`LibraryLoader`](crate::LibraryLoader).
    #[must_use]
    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    /// Converter options, passed verbatim to the loader.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }
}
