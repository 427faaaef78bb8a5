//! Intent Encoding
//!
//! This module contains the in-memory representation of an Android intent,
//! as well as its encoder into command-line arguments of the Android activity
//! manager (`am`). The activity manager parses these arguments back into an
//! intent, so the encoding must stay compatible with its argument parser.
//!
//! The encoding is a flat list of tokens:
//!
//! ```text
//! [-a <action>] [-n <package>/<class>] [-d <data>] (-c <category>)*
//! [-t <mime>] (<flag> <key> <value>)* -f <flags>
//! ```
//!
//! Extras are encoded as triplets of a type-flag (e.g., `--ei` for 32-bit
//! integers), the key, and the textual value. Lists and arrays are encoded as
//! a single comma-separated value, with literal commas escaped as `\,`.
//! Extras that cannot be represented are skipped.

/// Grant read access to the URI in the intent data.
pub const FLAG_GRANT_READ_URI_PERMISSION: i32 = 0x0000_0001;
/// Grant write access to the URI in the intent data.
pub const FLAG_GRANT_WRITE_URI_PERMISSION: i32 = 0x0000_0002;
/// Include packages that were never launched when resolving broadcasts.
pub const FLAG_INCLUDE_STOPPED_PACKAGES: i32 = 0x0000_0020;
/// Clear the task of the activity before starting it.
pub const FLAG_ACTIVITY_CLEAR_TASK: i32 = 0x0000_8000;
/// Finish all activities on top of the target activity.
pub const FLAG_ACTIVITY_CLEAR_TOP: i32 = 0x0400_0000;
/// Start the activity in a new task.
pub const FLAG_ACTIVITY_NEW_TASK: i32 = 0x1000_0000;
/// Deliver the broadcast with foreground priority.
pub const FLAG_RECEIVER_FOREGROUND: i32 = 0x1000_0000;

/// Component Parser Errors
///
/// This is the exhaustive list of errors raised when parsing a flattened
/// component reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentError {
    /// No `/` separator between package and class.
    Separator,
    /// The package name is empty.
    EmptyPackage,
    /// The class name is empty.
    EmptyClass,
}

/// Component Reference
///
/// A component reference identifies a specific component of an application
/// by its package name and class name. It is flattened to
/// `<package>/<class>` for transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    package: String,
    class: String,
}

impl Component {
    /// Create a new component reference
    ///
    /// Create a component reference from its package name and fully
    /// qualified class name. No verification is performed.
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// Package name of the component.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Fully qualified class name of the component.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Flatten to `<package>/<class>`
    ///
    /// Return the transport representation of the component reference. This
    /// is the inverse of the `FromStr` implementation, though the short form
    /// is never produced.
    pub fn flatten(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

// Parse flattened component references
//
// Both `<package>/<class>` and the short form `<package>/.<suffix>` are
// accepted. The latter is expanded to `<package>.<suffix>` as class name, as
// is done by the platform.
impl std::str::FromStr for Component {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (package, class) = s.split_once('/').ok_or(ComponentError::Separator)?;

        if package.is_empty() {
            return Err(ComponentError::EmptyPackage);
        }
        if class.is_empty() || class == "." {
            return Err(ComponentError::EmptyClass);
        }

        if class.starts_with('.') {
            Ok(Self::new(package, format!("{}{}", package, class)))
        } else {
            Ok(Self::new(package, class))
        }
    }
}

/// URI Reference
///
/// An opaque URI reference. The string is neither parsed nor normalized, but
/// passed on verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    /// Create a URI reference from its raw string representation.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Raw string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for Uri {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Intent Extra Value
///
/// This is the closed set of value types that can be stored in the extras of
/// an intent and be transported via the command-line. Lists are variable
/// length containers, arrays are fixed length containers. Both are encoded
/// the same way, but use different type-flags, so the receiver gets back the
/// same container type.
///
/// `Unsupported` represents any other value kind. It carries a human-readable
/// name of the kind and is always skipped by the encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Extra {
    String(String),
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Uri(Uri),
    Component(Component),
    IntList(Vec<i32>),
    LongList(Vec<i64>),
    FloatList(Vec<f32>),
    StringList(Vec<String>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    StringArray(Vec<String>),
    Unsupported(String),
}

// Format a float the way the activity manager parses it back
//
// Finite values always carry a fractional part or exponent. Non-finite values
// use the spelling of the platform float parser.
fn format_float(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v.is_sign_negative() {
            "-Infinity".to_string()
        } else {
            "Infinity".to_string()
        }
    } else {
        format!("{:?}", v)
    }
}

// Escape a single list element
//
// Only commas are escaped, since they separate elements. Backslashes are
// passed through verbatim.
fn escape_list_element(element: &str) -> String {
    element.replace(',', "\\,")
}

// Join list elements
//
// Convert each element to text, escape it, and join all with `,`. Empty lists
// yield `None`, since their element type cannot be transported.
fn join_list<T>(elements: &[T], text: impl Fn(&T) -> String) -> Option<String> {
    if elements.is_empty() {
        return None;
    }

    Some(
        elements
            .iter()
            .map(|v| escape_list_element(&text(v)))
            .collect::<Vec<_>>()
            .join(","),
    )
}

impl Extra {
    /// Return the type-flag
    ///
    /// Return the command-line flag that announces the type of this value to
    /// the activity manager, or `None` for unsupported values.
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            Extra::String(_) => Some("--es"),
            Extra::Bool(_) => Some("--ez"),
            Extra::Int(_) => Some("--ei"),
            Extra::Long(_) => Some("--el"),
            Extra::Float(_) => Some("--ef"),
            Extra::Uri(_) => Some("--eu"),
            Extra::Component(_) => Some("--ecn"),
            Extra::IntList(_) => Some("--eial"),
            Extra::LongList(_) => Some("--elal"),
            Extra::FloatList(_) => Some("--efal"),
            Extra::StringList(_) => Some("--esal"),
            Extra::IntArray(_) => Some("--eia"),
            Extra::LongArray(_) => Some("--ela"),
            Extra::FloatArray(_) => Some("--efa"),
            Extra::StringArray(_) => Some("--esa"),
            Extra::Unsupported(_) => None,
        }
    }

    /// Return the encoded value
    ///
    /// Return the textual form of the value as passed on the command-line.
    /// Lists and arrays are joined with `,` and their elements have commas
    /// escaped. Unsupported values and empty lists yield `None`.
    pub fn value(&self) -> Option<String> {
        match self {
            Extra::String(v) => Some(v.clone()),
            Extra::Bool(v) => Some(v.to_string()),
            Extra::Int(v) => Some(v.to_string()),
            Extra::Long(v) => Some(v.to_string()),
            Extra::Float(v) => Some(format_float(*v)),
            Extra::Uri(v) => Some(v.as_str().to_string()),
            Extra::Component(v) => Some(v.flatten()),
            Extra::IntList(v) | Extra::IntArray(v) => join_list(v, |v| v.to_string()),
            Extra::LongList(v) | Extra::LongArray(v) => join_list(v, |v| v.to_string()),
            Extra::FloatList(v) | Extra::FloatArray(v) => join_list(v, |v| format_float(*v)),
            Extra::StringList(v) | Extra::StringArray(v) => join_list(v, |v| v.clone()),
            Extra::Unsupported(_) => None,
        }
    }

    /// Check whether the encoder can represent this value
    ///
    /// This is `false` for unsupported values and for empty lists and arrays.
    pub fn is_encodable(&self) -> bool {
        self.flag().is_some() && self.value().is_some()
    }

    /// Human-readable name of the value kind.
    pub fn kind(&self) -> &str {
        match self {
            Extra::String(_) => "string",
            Extra::Bool(_) => "bool",
            Extra::Int(_) => "int",
            Extra::Long(_) => "long",
            Extra::Float(_) => "float",
            Extra::Uri(_) => "uri",
            Extra::Component(_) => "component",
            Extra::IntList(_) => "int-list",
            Extra::LongList(_) => "long-list",
            Extra::FloatList(_) => "float-list",
            Extra::StringList(_) => "string-list",
            Extra::IntArray(_) => "int-array",
            Extra::LongArray(_) => "long-array",
            Extra::FloatArray(_) => "float-array",
            Extra::StringArray(_) => "string-array",
            Extra::Unsupported(v) => v.as_str(),
        }
    }
}

impl From<String> for Extra {
    fn from(v: String) -> Self {
        Extra::String(v)
    }
}

impl From<&str> for Extra {
    fn from(v: &str) -> Self {
        Extra::String(v.to_string())
    }
}

impl From<bool> for Extra {
    fn from(v: bool) -> Self {
        Extra::Bool(v)
    }
}

impl From<i32> for Extra {
    fn from(v: i32) -> Self {
        Extra::Int(v)
    }
}

impl From<i64> for Extra {
    fn from(v: i64) -> Self {
        Extra::Long(v)
    }
}

impl From<f32> for Extra {
    fn from(v: f32) -> Self {
        Extra::Float(v)
    }
}

impl From<Uri> for Extra {
    fn from(v: Uri) -> Self {
        Extra::Uri(v)
    }
}

impl From<Component> for Extra {
    fn from(v: Component) -> Self {
        Extra::Component(v)
    }
}

impl From<Vec<i32>> for Extra {
    fn from(v: Vec<i32>) -> Self {
        Extra::IntList(v)
    }
}

impl From<Vec<i64>> for Extra {
    fn from(v: Vec<i64>) -> Self {
        Extra::LongList(v)
    }
}

impl From<Vec<f32>> for Extra {
    fn from(v: Vec<f32>) -> Self {
        Extra::FloatList(v)
    }
}

impl From<Vec<String>> for Extra {
    fn from(v: Vec<String>) -> Self {
        Extra::StringList(v)
    }
}

/// Ordered Extras
///
/// A key-value map of intent extras that retains insertion order. The encoder
/// emits extras in this order, so the produced command-line is reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extras {
    entries: Vec<(String, Extra)>,
}

impl Extras {
    /// Create an empty set of extras.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an extra
    ///
    /// If the key is already present, its value is replaced in place and the
    /// previous value is returned. Otherwise, the entry is appended.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Extra>) -> Option<Extra> {
        let key = key.into();
        let value = value.into();

        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(std::mem::replace(&mut entry.1, value))
        } else {
            self.entries.push((key, value));
            None
        }
    }

    /// Look up the value of a key.
    pub fn get(&self, key: &str) -> Option<&Extra> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove a key and return its value, retaining the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Extra> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterate all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Extra)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Intent
///
/// In-memory representation of an intent: routing information plus a set of
/// typed extras. All routing fields are optional, `flags` defaults to `0`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Intent {
    /// Action to perform, e.g., `android.intent.action.VIEW`.
    pub action: Option<String>,
    /// Explicit target component.
    pub component: Option<Component>,
    /// Data the action operates on.
    pub data: Option<Uri>,
    /// MIME type of the data.
    pub mime_type: Option<String>,
    /// Categories, in the order they were added.
    pub categories: Vec<String>,
    /// Typed extras.
    pub extras: Extras,
    /// Intent flags, as the platform's signed 32-bit bitmask.
    pub flags: i32,
}

impl Intent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_data(mut self, data: impl Into<Uri>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Append a category. Duplicates are kept.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Insert or replace an extra, see `Extras::put()`.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Extra>) -> Self {
        self.extras.put(key, value);
        self
    }

    /// Add flags to the existing flags via bitwise OR.
    pub fn add_flags(mut self, flags: i32) -> Self {
        self.flags |= flags;
        self
    }

    /// Append command-line arguments
    ///
    /// Encode the intent as command-line arguments for the activity manager
    /// and append them to `args`. This allows placing the intent after a
    /// command prefix like `am start`.
    ///
    /// Sections are always emitted in the same order: action, component,
    /// data, categories, type, extras, and flags. Absent routing fields are
    /// omitted, flags are always emitted last. Extras are emitted in their
    /// insertion order, but skipped if they cannot be represented (see
    /// `Extra::is_encodable()`).
    pub fn append_command(&self, args: &mut Vec<String>) {
        if let Some(action) = &self.action {
            args.push("-a".to_string());
            args.push(action.clone());
        }

        if let Some(component) = &self.component {
            args.push("-n".to_string());
            args.push(component.flatten());
        }

        if let Some(data) = &self.data {
            args.push("-d".to_string());
            args.push(data.as_str().to_string());
        }

        for category in self.categories.iter() {
            args.push("-c".to_string());
            args.push(category.clone());
        }

        if let Some(mime_type) = &self.mime_type {
            args.push("-t".to_string());
            args.push(mime_type.clone());
        }

        for (key, extra) in self.extras.iter() {
            if let (Some(flag), Some(value)) = (extra.flag(), extra.value()) {
                args.push(flag.to_string());
                args.push(key.to_string());
                args.push(value);
            }
        }

        args.push("-f".to_string());
        args.push(self.flags.to_string());
    }

    /// Encode as command-line arguments
    ///
    /// Same as `append_command()` but returns a new argument vector.
    pub fn to_command(&self) -> Vec<String> {
        let mut args = Vec::new();
        self.append_command(&mut args);
        args
    }
}
