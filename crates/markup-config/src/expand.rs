//! Environment variable expansion for configuration strings.
//!
//! `${VAR}` expands to the value of VAR and is an error when VAR is unset;
//! `${VAR:-default}` falls back to `default`.

use crate::ConfigError;

/// Expand `${VAR}` references in `value`.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Only braced references are handed to the expander, so bare `$1` or `$HOME`
/// pass through to the renderer command untouched even next to `${VAR}`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}').map(|end| end + 1) else {
            // Unterminated: keep the remainder as written.
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&expand_reference(&rest[start..start + len], field)?);
        rest = &rest[start + len..];
    }
    out.push_str(rest);
    Ok(out)
}

fn expand_reference(reference: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env_with_context(reference, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}
