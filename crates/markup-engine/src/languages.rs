//! Built-in language descriptors.
//!
//! Each language is a descriptor literal: adding one never touches the
//! engine or the registry.

use std::time::Duration;

use crate::descriptor::{CommandSpec, LibrarySpec, RendererDescriptor};
use crate::error::RegistryError;
use crate::registry::Registry;

/// Default wall-clock bound for external renderer commands (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Descriptors for every built-in language.
///
/// Command renderers get `timeout` as their execution bound.
#[must_use]
pub fn builtin(timeout: Option<Duration>) -> Vec<RendererDescriptor> {
    let command = |program: &str, args: &[&str]| {
        CommandSpec::new(program)
            .args(args.iter().copied())
            .with_default_timeout(timeout)
    };
    let pandoc = |from: &str| command("pandoc", &["--from", from, "--to", "html5"]);

    vec![
        RendererDescriptor::library("Markdown", LibrarySpec::new("pulldown-cmark"))
            .with_identifiers(["markdown", "md", "mkd", "mkdn", "mdwn", "mdown"]),
        RendererDescriptor::library("GitHub Flavored Markdown", LibrarySpec::new("comrak"))
            .with_identifiers(["gfm"]),
        RendererDescriptor::command(
            "AsciiDoc",
            command("asciidoctor", &["--no-header-footer", "--out-file", "-", "-"]),
        )
        .with_identifiers(["asciidoc", "adoc", "asc"]),
        RendererDescriptor::command("reStructuredText", pandoc("rst"))
            .with_identifiers(["restructuredtext", "rst", "rest"]),
        RendererDescriptor::command("RDoc", command("rdoc", &["--pipe"]))
            .with_identifiers(["rdoc"]),
        RendererDescriptor::command("Textile", pandoc("textile")).with_identifiers(["textile"]),
        RendererDescriptor::command("Org", pandoc("org")).with_identifiers(["org"]),
        RendererDescriptor::command("MediaWiki", pandoc("mediawiki"))
            .with_identifiers(["mediawiki", "wiki"]),
        RendererDescriptor::command("Pod", command("pod2html", &["--quiet", "--noindex"]))
            .with_identifiers(["pod"]),
    ]
}

/// Register every built-in language.
///
/// # Errors
///
/// Fails if any built-in identifier clashes with an earlier registration
/// and the registry rejects duplicates, or if the registry is frozen.
pub fn register_builtin(
    registry: &mut Registry,
    timeout: Option<Duration>,
) -> Result<(), RegistryError> {
    builtin(timeout)
        .into_iter()
        .try_for_each(|descriptor| registry.add(descriptor))
}
