//! Encode Intents
//!
//! The `encode` operation turns an intent declared in the manifest into the
//! command-line arguments understood by the activity manager, and renders
//! them in a format suitable for the caller.

use serde_json;
use tracing;

/// Encode Errors
///
/// This is the exhaustive list of possible errors raised by the encode
/// operation. See each error for details.
#[derive(Debug)]
pub enum Error {
    /// No intent with the specified ID is declared in the manifest.
    UnknownIntent(String),
}

/// Output Format
///
/// This enum is an enumeration of supported output formats. It implements
/// `FromStr` to allow creation from string representation. Use `as_str()`
/// to get a static string-representation back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// One argument per line, verbatim.
    Lines,
    /// JSON array of strings.
    Json,
    /// Single line of shell-quoted arguments.
    Shell,
}

impl Format {
    /// Get string representation
    ///
    /// Return the string representation of the format. This is guaranteed to
    /// be parsable by the `FromStr` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Lines => "lines",
            Format::Json => "json",
            Format::Shell => "shell",
        }
    }
}

// Parse formats from strings
//
// Note that this uses case-insensitive matching.
impl std::str::FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("lines") {
            Ok(Self::Lines)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("shell") {
            Ok(Self::Shell)
        } else {
            Err(())
        }
    }
}

/// Quote a token for POSIX shells
///
/// Tokens consisting of only safe characters are returned verbatim. Anything
/// else is wrapped in single quotes, with embedded single quotes written as
/// `'\''`. Empty tokens become `''`.
pub fn quote_shell(token: &str) -> String {
    let safe = !token.is_empty() && token.chars().all(
        |v| v.is_ascii_alphanumeric() || "-_./:=@%+,".contains(v)
    );

    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

/// Render arguments
///
/// Render the given arguments in the requested format. The result never
/// carries a trailing newline.
pub fn render(args: &[String], format: Format) -> String {
    match format {
        Format::Lines => args.join("\n"),
        // Serializing a list of strings cannot fail.
        Format::Json => serde_json::Value::from(args.to_vec()).to_string(),
        Format::Shell => {
            args.iter()
                .map(|v| quote_shell(v))
                .collect::<Vec<_>>()
                .join(" ")
        },
    }
}

// Report extras the encoder will skip
//
// The encoder drops these silently, so callers working on behalf of a user
// log them instead.
pub(crate) fn report_skipped(id: &str, intent: &crate::intent::Intent) {
    for (key, extra) in intent.extras.iter() {
        if !extra.is_encodable() {
            tracing::warn!(intent = id, key, kind = extra.kind(), "skipping extra that cannot be encoded");
        }
    }
}

/// Encode an intent from the manifest
///
/// Look up the intent with the given ID and encode it as activity manager
/// arguments. Extras that cannot be encoded are skipped and reported via
/// `tracing`.
pub fn encode(
    manifest: &crate::manifest::Manifest,
    id: &str,
) -> Result<Vec<String>, Error> {
    let intent = manifest.intent_by_id(id)
        .ok_or_else(|| Error::UnknownIntent(id.to_string()))?;

    report_skipped(id, &intent);

    let args = intent.to_command();
    tracing::debug!(intent = id, args = args.len(), "encoded intent");

    Ok(args)
}
