//! Intent Manifest
//!
//! This is a rust implementation of the Osiris Intent Manifest Format. The
//! manifest is a TOML file declaring named intents, so they can be encoded or
//! launched by name rather than by spelling out all activity manager
//! arguments.
//!
//! Extras are declared as an array of tables, so their order in the file is
//! retained as encoding order:
//!
//! ```toml
//! version = 1
//!
//! [[intent]]
//! id = "open-site"
//! action = "android.intent.action.VIEW"
//! data = "https://www.osiris.foo"
//!
//! [[intent.extra]]
//! key = "count"
//! type = "int"
//! value = 5
//! ```

use serde;
use toml;

use crate::intent;

/// Manifest Errors
///
/// This is the exhaustive list of possible errors raised when reading a
/// manifest. See each error for details.
#[derive(Debug)]
pub enum Error {
    /// Reading the manifest file failed with the given error.
    Read(std::ffi::OsString, std::io::Error),
    /// The content is not valid TOML or does not match the manifest layout.
    Syntax(String),
    /// The manifest version is not supported.
    Version(u32),
    /// The intent ID is empty or contains invalid characters.
    IntentId(String),
    /// The intent ID is used more than once.
    DuplicateId(String),
    /// The component reference of the intent is malformed.
    Component(String, intent::ComponentError),
    /// The flags of the intent do not fit 32 bits.
    Flags(String, i64),
    /// The extra of the specified intent and key has a value that does not
    /// match its declared type.
    ExtraValue(String, String),
}

/// Raw Manifest Extra Table
///
/// Sub-type of `RawIntent` declaring a single extra. `value` is kept as raw
/// TOML value, since its interpretation depends on `type`.
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawExtra {
    /// Key of the extra. Passed on verbatim.
    pub key: String,
    /// Type name of the extra, e.g., `int` or `string-list`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Value of the extra.
    pub value: toml::Value,
}

/// Raw Manifest Intent Table
///
/// Sub-type of `Raw` representing one entry of the `intent` array. Each entry
/// declares a single named intent.
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawIntent {
    /// Identifier of the intent. Only alphanumeric and `-`, `_` allowed.
    pub id: String,

    pub action: Option<String>,
    /// Component reference as `<package>/<class>` or `<package>/.<suffix>`.
    pub component: Option<String>,
    pub data: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// MIME type of the data.
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    /// Intent flags. Either signed 32-bit, or unsigned 32-bit, which is
    /// reinterpreted as signed.
    #[serde(default)]
    pub flags: i64,

    /// Extras in declaration order.
    #[serde(default)]
    pub extra: Vec<RawExtra>,
}

/// Raw Manifest Content
///
/// This type contains the raw manifest content as parsed by `toml` and
/// converted into rust types via `serde`.
///
/// Note that content of the type is not verified other than for syntactic
/// correctness required by the given types. Semantic correctness needs to
/// be verified by the caller.
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Raw {
    /// Version of the manifest format. Only version `1` is currently
    /// supported.
    pub version: u32,

    /// Intent table declaring all named intents.
    #[serde(default)]
    pub intent: Vec<RawIntent>,
}

/// Manifest Abstraction
///
/// This type represents a valid and verified manifest. The manifest content
/// can be directly accessed via the `raw` field. The data is verified for
/// semantic correctness (unlike the `Raw` type), so every declared intent
/// converts into an `intent::Intent` without error.
pub struct Manifest {
    /// Raw manifest content as parsed by the TOML module.
    pub raw: Raw,
}

// Convert a TOML value to an `i32`, refusing anything out of range.
fn value_int(v: &toml::Value) -> Option<i32> {
    v.as_integer().and_then(|v| i32::try_from(v).ok())
}

fn value_long(v: &toml::Value) -> Option<i64> {
    v.as_integer()
}

// Convert a TOML value to an `f32`
//
// TOML distinguishes integers and floats, so `1` is accepted as well as
// `1.0`. Finite floats must stay finite in 32 bits, and integers must be
// exactly representable. Fractional precision is reduced to 32 bits.
fn value_float(v: &toml::Value) -> Option<f32> {
    match v {
        toml::Value::Float(v) => {
            let f = *v as f32;
            if v.is_finite() && !f.is_finite() {
                None
            } else {
                Some(f)
            }
        },
        toml::Value::Integer(v) => {
            let f = *v as f32;
            if f as i128 == i128::from(*v) {
                Some(f)
            } else {
                None
            }
        },
        _ => None,
    }
}

fn value_string(v: &toml::Value) -> Option<String> {
    v.as_str().map(|v| v.to_string())
}

// Convert a TOML array with the given element converter
//
// All elements must convert, so mixed arrays are refused.
fn value_list<T>(
    v: &toml::Value,
    element: impl Fn(&toml::Value) -> Option<T>,
) -> Option<Vec<T>> {
    v.as_array()?.iter().map(element).collect()
}

impl RawExtra {
    /// Convert to a typed extra
    ///
    /// Interpret the raw value according to the declared type. Unknown type
    /// names yield `intent::Extra::Unsupported`. `None` is returned if the
    /// value does not match a known type.
    pub fn to_extra(&self) -> Option<intent::Extra> {
        let v = &self.value;

        Some(match self.kind.as_str() {
            "string" => intent::Extra::String(value_string(v)?),
            "bool" => intent::Extra::Bool(v.as_bool()?),
            "int" => intent::Extra::Int(value_int(v)?),
            "long" => intent::Extra::Long(value_long(v)?),
            "float" => intent::Extra::Float(value_float(v)?),
            "uri" => intent::Extra::Uri(intent::Uri::new(v.as_str()?)),
            "component" => intent::Extra::Component(v.as_str()?.parse().ok()?),
            "int-list" => intent::Extra::IntList(value_list(v, value_int)?),
            "long-list" => intent::Extra::LongList(value_list(v, value_long)?),
            "float-list" => intent::Extra::FloatList(value_list(v, value_float)?),
            "string-list" => intent::Extra::StringList(value_list(v, value_string)?),
            "int-array" => intent::Extra::IntArray(value_list(v, value_int)?),
            "long-array" => intent::Extra::LongArray(value_list(v, value_long)?),
            "float-array" => intent::Extra::FloatArray(value_list(v, value_float)?),
            "string-array" => intent::Extra::StringArray(value_list(v, value_string)?),
            other => intent::Extra::Unsupported(other.to_string()),
        })
    }
}

impl RawIntent {
    /// Convert to an intent
    ///
    /// Build the in-memory intent from the raw declaration. This verifies the
    /// component reference, the flags, and all extras. Later extras with the
    /// same key replace earlier ones.
    pub fn to_intent(&self) -> Result<intent::Intent, Error> {
        let mut v = intent::Intent::new();

        v.action = self.action.clone();
        v.data = self.data.as_deref().map(intent::Uri::new);
        v.mime_type = self.mime_type.clone();
        v.categories = self.categories.clone();

        if let Some(component) = &self.component {
            v.component = Some(
                component.parse().map_err(
                    |e| Error::Component(self.id.clone(), e)
                )?
            );
        }

        // Accept both the signed and unsigned 32-bit range, and reinterpret
        // the latter as the signed bit pattern.
        v.flags = if let Ok(flags) = i32::try_from(self.flags) {
            flags
        } else if let Ok(flags) = u32::try_from(self.flags) {
            flags as i32
        } else {
            return Err(Error::Flags(self.id.clone(), self.flags));
        };

        for extra in self.extra.iter() {
            let value = extra.to_extra().ok_or_else(
                || Error::ExtraValue(self.id.clone(), extra.key.clone())
            )?;
            v.extras.put(extra.key.clone(), value);
        }

        Ok(v)
    }
}

impl Raw {
    fn parse_toml(table: toml::Table) -> Result<Self, Error> {
        <Self as serde::Deserialize>::deserialize(table)
            .map_err(|v| Error::Syntax(v.to_string()))
    }

    fn parse_str(content: &str) -> Result<Self, Error> {
        content.parse::<toml::Table>()
            .map_err(|v| Error::Syntax(v.to_string()))
            .and_then(|v| Self::parse_toml(v))
    }

    /// Find matching intent entry
    ///
    /// Search the intent entries for the entry with the specified ID.
    pub fn intent_by_id(&self, id: &str) -> Option<&RawIntent> {
        self.intent.iter().find(
            |v| v.id == id
        )
    }
}

impl Manifest {
    // Check whether a string is a valid identifier
    //
    // This verifies that the given string consists of only alphanumeric
    // characters plus `-`, `_`. Empty identifiers are rejected.
    //
    // Any unicode alpha/numeric character is allowed.
    fn is_identifier(s: &str) -> bool {
        !s.is_empty() && s.chars().all(
            |v| v.is_alphanumeric() || v == '-' || v == '_'
        )
    }

    /// Parse manifest from raw
    ///
    /// Take a raw representation of the manifest and perform post-parsing
    /// validation, ensuring the final manifest will not contain invalid
    /// entries.
    fn parse_raw(raw: Raw) -> Result<Self, Error> {
        // We only support version '1'. Any other version number is explicitly
        // defined to be incompatible, so fail parsing.
        //
        // Unknown fields are ignored, so version '1' can be extended without
        // breaking backwards compatibility.
        if raw.version != 1 {
            return Err(Error::Version(raw.version));
        }

        let mut ids = std::collections::BTreeSet::new();

        for intent in raw.intent.iter() {
            if !Self::is_identifier(&intent.id) {
                return Err(Error::IntentId(intent.id.clone()));
            }

            if !ids.insert(intent.id.as_str()) {
                return Err(Error::DuplicateId(intent.id.clone()));
            }

            // Fully convert the intent once, so lookups cannot fail later on.
            intent.to_intent()?;
        }

        Ok(
            Self {
                raw: raw,
            }
        )
    }

    /// Parse manifest from string
    ///
    /// Parse the given string as a literal manifest in TOML representation.
    /// Content is verified and invalid manifests are refused.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        Raw::parse_str(content)
            .and_then(|v| Self::parse_raw(v))
    }

    /// Parse manifest from file-system
    ///
    /// Open the specified file and parse it as a manifest. The content is
    /// verified and invalid manifests are refused. The file is completely
    /// parsed into memory and then closed again before the function returns.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        std::fs::read_to_string(path)
            .map_err(|v| Error::Read(path.as_os_str().to_os_string(), v))
            .and_then(|v| Self::parse_str(&v))
    }

    /// Return the intent with the given ID
    ///
    /// Look up the declared intent and convert it to its in-memory
    /// representation. Returns `None` if no such intent is declared.
    pub fn intent_by_id(&self, id: &str) -> Option<intent::Intent> {
        self.raw.intent_by_id(id)
            .and_then(|v| v.to_intent().ok())
    }

    /// Iterate the IDs of all declared intents in declaration order.
    pub fn intent_ids(&self) -> impl Iterator<Item = &str> {
        self.raw.intent.iter().map(|v| v.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify basic parsing of `Raw`
    //
    // Parse a minimal raw manifest into `Raw` to have a base-level test for
    // the parsing capabilities. Not complex content verification is done.
    #[test]
    fn raw_parse_minimal() {
        let s = "version = 1";

        Raw::parse_str(s).unwrap();
    }

    // Verify unknown versions in `Raw`
    //
    // Parse a high version number and verify that the raw content parser
    // does not care for its value other than syntactic correctness.
    #[test]
    fn raw_parse_unknown_version() {
        let s = "version = 12345678";

        Raw::parse_str(s).unwrap();
    }

    // Verify parsing of unknown manifest versions
    //
    // Parse an unknown manifest version and verify that the manifest correctly
    // refuses it as invalid.
    #[test]
    fn manifest_parse_unknown_version() {
        let s = "version = 2";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Version(2))));
    }

    // Verify syntax errors
    //
    // Invalid TOML and missing required fields are both syntax errors.
    #[test]
    fn manifest_parse_syntax() {
        assert!(matches!(Manifest::parse_str("version = "), Err(Error::Syntax(_))));
        assert!(matches!(Manifest::parse_str("foo = 1"), Err(Error::Syntax(_))));
    }

    // Verify simple parsing of `Manifest`
    //
    // A rather simple parsing test to verify all routing fields end up in the
    // converted intent.
    #[test]
    fn manifest_parse_simple() {
        let s = "
            version = 1
            [[intent]]
            id = \"open\"
            action = \"android.intent.action.VIEW\"
            component = \"com.example/.Main\"
            data = \"https://x\"
            categories = [\"c0\", \"c1\"]
            type = \"text/html\"
            flags = 0x10000000
        ";

        let m = Manifest::parse_str(s).unwrap();
        let i = m.intent_by_id("open").unwrap();

        assert_eq!(i.action.as_deref(), Some("android.intent.action.VIEW"));
        assert_eq!(i.component.unwrap().class(), "com.example.Main");
        assert_eq!(i.data.unwrap().as_str(), "https://x");
        assert_eq!(i.categories, vec!["c0", "c1"]);
        assert_eq!(i.mime_type.as_deref(), Some("text/html"));
        assert_eq!(i.flags, intent::FLAG_ACTIVITY_NEW_TASK);

        assert!(m.intent_by_id("other").is_none());
        assert_eq!(m.intent_ids().collect::<Vec<_>>(), vec!["open"]);
    }

    // Verify the sample manifest
    //
    // The manifest shipped in `demos/` must stay valid.
    #[test]
    fn manifest_parse_demo() {
        let m = Manifest::parse_str(include_str!("../demos/osiris-intent.toml")).unwrap();

        assert_eq!(
            m.intent_ids().collect::<Vec<_>>(),
            vec!["open-site", "share-text", "refresh"],
        );
        assert_eq!(
            m.intent_by_id("refresh").unwrap().to_command(),
            vec![
                "-a", "com.example.REFRESH",
                "-n", "com.example/com.example.RefreshReceiver",
                "--ela", "ids", "1,2,3",
                "--ez", "force", "true",
                "-f", "32",
            ],
        );
    }

    // Verify order of extras
    //
    // Extras must retain their declaration order, including all types.
    #[test]
    fn manifest_parse_extras() {
        let s = "
            version = 1
            [[intent]]
            id = \"x\"
            [[intent.extra]]
            key = \"z\"
            type = \"int\"
            value = 5
            [[intent.extra]]
            key = \"a\"
            type = \"string-list\"
            value = [\"a,b\", \"c\"]
            [[intent.extra]]
            key = \"m\"
            type = \"float-array\"
            value = [1, 2.5]
            [[intent.extra]]
            key = \"p\"
            type = \"parcelable\"
            value = {}
            [[intent.extra]]
            key = \"c\"
            type = \"component\"
            value = \"a.b/.C\"
        ";

        let m = Manifest::parse_str(s).unwrap();
        let i = m.intent_by_id("x").unwrap();

        let keys: Vec<_> = i.extras.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "m", "p", "c"]);
        assert_eq!(i.extras.get("m"), Some(&intent::Extra::FloatArray(vec![1.0, 2.5])));
        assert_eq!(
            i.extras.get("p"),
            Some(&intent::Extra::Unsupported("parcelable".to_string())),
        );

        assert_eq!(
            i.to_command(),
            vec![
                "--ei", "z", "5",
                "--esal", "a", "a\\,b,c",
                "--efa", "m", "1.0,2.5",
                "--ecn", "c", "a.b/a.b.C",
                "-f", "0",
            ],
        );
    }

    // Verify refusal of mismatched extras
    //
    // Values that do not match their type are refused, including mixed lists
    // and integers out of range.
    #[test]
    fn manifest_parse_extra_mismatch() {
        for (kind, value) in [
            ("int", "\"5\""),
            ("int", "2147483648"),
            ("bool", "1"),
            ("int-list", "[1, \"2\"]"),
            ("string-array", "\"a\""),
            ("component", "\"nope\""),
            ("float", "1e300"),
            ("float", "-1e39"),
            ("float", "16777217"),
            ("float-list", "[1.5, 16777217]"),
            ("float-array", "[1e300]"),
        ] {
            let s = format!(
                "version = 1\n[[intent]]\nid = \"x\"\n[[intent.extra]]\nkey = \"k\"\ntype = \"{}\"\nvalue = {}\n",
                kind, value,
            );

            assert!(
                matches!(Manifest::parse_str(&s), Err(Error::ExtraValue(ref i, ref k)) if i == "x" && k == "k"),
                "{} = {}", kind, value,
            );
        }
    }

    // Verify float limits
    //
    // Values within the 32-bit range are accepted, including exactly
    // representable integers and explicit infinities.
    #[test]
    fn manifest_parse_extra_float() {
        let s = "
            version = 1
            [[intent]]
            id = \"x\"
            [[intent.extra]]
            key = \"a\"
            type = \"float-list\"
            value = [16777216, -3.0e38, 0.25]
            [[intent.extra]]
            key = \"b\"
            type = \"float\"
            value = -inf
        ";

        let m = Manifest::parse_str(s).unwrap();
        let i = m.intent_by_id("x").unwrap();

        assert_eq!(
            i.extras.get("a"),
            Some(&intent::Extra::FloatList(vec![16777216.0, -3.0e38, 0.25])),
        );
        assert_eq!(i.extras.get("b"), Some(&intent::Extra::Float(f32::NEG_INFINITY)));
    }

    // Verify intent ID validation
    //
    // IDs must be valid identifiers and unique.
    #[test]
    fn manifest_parse_intent_id() {
        let s = "
            version = 1
            [[intent]]
            id = \"\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::IntentId(_))));

        let s = "
            version = 1
            [[intent]]
            id = \"a b\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::IntentId(_))));

        let s = "
            version = 1
            [[intent]]
            id = \"a\"
            [[intent]]
            id = \"a\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::DuplicateId(_))));
    }

    // Verify component and flag validation
    //
    // Malformed components are refused. Unsigned 32-bit flags are accepted,
    // anything larger is refused.
    #[test]
    fn manifest_parse_component_flags() {
        let s = "
            version = 1
            [[intent]]
            id = \"a\"
            component = \"com.example\"
        ";
        assert!(matches!(
            Manifest::parse_str(s),
            Err(Error::Component(_, intent::ComponentError::Separator)),
        ));

        let s = "
            version = 1
            [[intent]]
            id = \"a\"
            flags = 0xffffffff
        ";
        let m = Manifest::parse_str(s).unwrap();
        assert_eq!(m.intent_by_id("a").unwrap().flags, -1);

        let s = "
            version = 1
            [[intent]]
            id = \"a\"
            flags = 0x100000000
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Flags(_, 0x1_0000_0000))));
    }
}
