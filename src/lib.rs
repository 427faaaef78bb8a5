//! Osiris Intent Encoding
//!
//! The osiris intent module describes Android intents in rust and encodes
//! them as command-line arguments of the Android activity manager (`am`).
//! This allows tools running on a development host, or privileged tools
//! running on the device itself, to deliver intents without going through
//! the Java application framework.
//!
//! Model
//! -----
//!
//! An intent consists of routing information (action, explicit component,
//! data URI, MIME type, categories, and flags) plus a set of typed extras.
//! The activity manager accepts all of these as command-line arguments and
//! reconstructs an equivalent intent from them. The [`intent`] module
//! contains the in-memory representation and its encoder. The encoder is a
//! pure function: encoding the same intent always yields the same arguments.
//!
//! Not every value can be transported via the command-line. Values the
//! activity manager cannot parse back, as well as empty lists (their element
//! type is lost), are skipped by the encoder.
//!
//! Manifest
//! --------
//!
//! Intents can be declared by name in the Osiris Intent Manifest, a
//! TOML-formatted file usually called `osiris-intent.toml`. The
//! `osiris-intent` command-line tool parses the manifest and uses it for all
//! operations. See the [`manifest`] module for the format.
//!
//! Operations
//! ----------
//!
//!  * [Encode](op::encode): Print the activity manager arguments of an
//!    intent, as lines, JSON, or a shell command-line.
//!  * [Launch](op::launch): Deliver an intent via `am`, locally or via
//!    `adb shell`.

pub mod intent;
pub mod manifest;

/// Intent Operations
///
/// The `op` module is a collection of all operations that can be performed via
/// the command-line interface. Each operation is implemented in a submodule
/// and can be used independently.
pub mod op {
    pub mod encode;
    pub mod launch;
}
