//! Launch Intents
//!
//! The `launch` operation hands an intent to the activity manager of a
//! device. The intent is encoded as command-line arguments and passed to
//! `am`, either by running it directly (when running on the device itself),
//! or via `adb shell` on a connected device.

use tracing;

/// Launch Errors
///
/// This is the exhaustive list of possible errors raised by the launch
/// operation. See each error for details.
#[derive(Debug)]
pub enum Error {
    /// No intent with the specified ID is declared in the manifest.
    UnknownIntent(String),
    /// Command execution could not commence.
    Exec(String, std::io::Error),
    /// The activity manager failed with the given exit code, or was killed
    /// by a signal if no code is available.
    Failed(Option<i32>),
}

/// Activity Manager Verb
///
/// The activity manager command used to deliver the intent. It implements
/// `FromStr` to allow creation from string representation. Use `as_str()`
/// to get the command name back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// Start an activity.
    Start,
    /// Start a service.
    StartService,
    /// Send a broadcast.
    Broadcast,
}

impl Verb {
    /// Get string representation
    ///
    /// Return the activity manager command name. This is guaranteed to be
    /// parsable by the `FromStr` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Start => "start",
            Verb::StartService => "startservice",
            Verb::Broadcast => "broadcast",
        }
    }
}

// Parse verbs from strings
//
// Note that this uses case-insensitive matching. `start-service` is accepted
// as alias of `startservice`.
impl std::str::FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("start") {
            Ok(Self::Start)
        } else if s.eq_ignore_ascii_case("startservice")
            || s.eq_ignore_ascii_case("start-service")
        {
            Ok(Self::StartService)
        } else if s.eq_ignore_ascii_case("broadcast") {
            Ok(Self::Broadcast)
        } else {
            Err(())
        }
    }
}

/// Execution Target
///
/// Where the activity manager is run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Run `am` directly.
    Local,
    /// Run `am` via `adb shell`, optionally on the device with the given
    /// serial.
    Adb {
        serial: Option<String>,
    },
}

/// Launch Options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub verb: Verb,
    /// User to deliver the intent as. The activity manager default is used
    /// if unset.
    pub user: Option<u32>,
    pub target: Target,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verb: Verb::Start,
            user: None,
            target: Target::Local,
        }
    }
}

/// Assemble activity manager arguments
///
/// Return the arguments to `am`: the verb, the optional user selection, and
/// the encoded intent.
pub fn am_arguments(
    intent: &crate::intent::Intent,
    options: &Options,
) -> Vec<String> {
    let mut args = vec![options.verb.as_str().to_string()];

    if let Some(user) = options.user {
        args.push("--user".to_string());
        args.push(user.to_string());
    }

    intent.append_command(&mut args);
    args
}

/// Assemble the command-line
///
/// Return the program and its arguments. For `adb`, the remote shell joins
/// its arguments and parses them again, so the entire `am` invocation is
/// passed as a single shell-quoted argument.
pub fn command_line(
    intent: &crate::intent::Intent,
    options: &Options,
) -> (String, Vec<String>) {
    let am = am_arguments(intent, options);

    match options.target {
        Target::Local => ("am".to_string(), am),
        Target::Adb { ref serial } => {
            let mut args = Vec::new();

            if let Some(serial) = serial {
                args.push("-s".to_string());
                args.push(serial.clone());
            }

            let mut remote = vec!["am".to_string()];
            remote.extend(am);

            args.push("shell".to_string());
            args.push(crate::op::encode::render(&remote, crate::op::encode::Format::Shell));

            ("adb".to_string(), args)
        },
    }
}

// Create a process command from a program and its arguments, with standard
// I/O inherited from the caller.
fn build_command(bin: &str, args: &[String]) -> std::process::Command {
    let mut cmd = std::process::Command::new(bin);

    cmd.args(args);
    cmd.stdin(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::inherit());
    cmd.stdout(std::process::Stdio::inherit());

    cmd
}

/// Create the launch command
///
/// Create the process command for the intent, with standard I/O inherited
/// from the caller.
pub fn command(
    intent: &crate::intent::Intent,
    options: &Options,
) -> std::process::Command {
    let (bin, args) = command_line(intent, options);
    build_command(&bin, &args)
}

// Run a command and wait for it
//
// Spawn failures are reported with the program name. A non-successful exit
// is reported with its exit code, if any.
fn run(mut cmd: std::process::Command) -> Result<(), Error> {
    let status = cmd.status().map_err(
        |v| Error::Exec(cmd.get_program().to_string_lossy().into_owned(), v)
    )?;

    if !status.success() {
        return Err(Error::Failed(status.code()));
    }

    Ok(())
}

// Look up an intent and report extras the encoder will skip.
fn lookup(
    manifest: &crate::manifest::Manifest,
    id: &str,
) -> Result<crate::intent::Intent, Error> {
    let intent = manifest.intent_by_id(id)
        .ok_or_else(|| Error::UnknownIntent(id.to_string()))?;

    crate::op::encode::report_skipped(id, &intent);

    Ok(intent)
}

/// Prepare a launch without running it
///
/// Look up the intent with the given ID and return the full command-line
/// that `launch()` would execute, with the program as first element.
pub fn dry_run(
    manifest: &crate::manifest::Manifest,
    id: &str,
    options: &Options,
) -> Result<Vec<String>, Error> {
    let intent = lookup(manifest, id)?;
    let (bin, mut args) = command_line(&intent, options);

    args.insert(0, bin);
    Ok(args)
}

/// Launch an intent from the manifest
///
/// Look up the intent with the given ID and deliver it via the activity
/// manager. This waits for the activity manager to exit.
pub fn launch(
    manifest: &crate::manifest::Manifest,
    id: &str,
    options: &Options,
) -> Result<(), Error> {
    let intent = lookup(manifest, id)?;
    let (bin, args) = command_line(&intent, options);

    tracing::info!(intent = id, program = %bin, verb = options.verb.as_str(), "launching intent");

    run(build_command(&bin, &args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    // Verify verb parsing
    //
    // Verbs parse case-insensitively and round-trip through `as_str()`.
    #[test]
    fn verb_parse() {
        for v in [Verb::Start, Verb::StartService, Verb::Broadcast] {
            assert_eq!(v.as_str().parse::<Verb>(), Ok(v));
        }
        assert_eq!("Start-Service".parse::<Verb>(), Ok(Verb::StartService));
        assert!("stop".parse::<Verb>().is_err());
    }

    // Verify activity manager arguments
    //
    // The verb and user precede the encoded intent.
    #[test]
    fn am_args() {
        let intent = Intent::new().with_action("A");
        let mut options = Options::default();

        assert_eq!(am_arguments(&intent, &options), vec!["start", "-a", "A", "-f", "0"]);

        options.verb = Verb::Broadcast;
        options.user = Some(10);
        assert_eq!(
            am_arguments(&intent, &options),
            vec!["broadcast", "--user", "10", "-a", "A", "-f", "0"],
        );
    }

    // Verify local and adb command-lines
    //
    // Locally, arguments are passed verbatim. Via adb, the remote command is
    // a single shell-quoted argument.
    #[test]
    fn command_lines() {
        let intent = Intent::new().with_extra("msg", "hello world");
        let mut options = Options::default();

        let (bin, args) = command_line(&intent, &options);
        assert_eq!(bin, "am");
        assert_eq!(args, vec!["start", "--es", "msg", "hello world", "-f", "0"]);

        options.target = Target::Adb { serial: Some("emulator-5554".to_string()) };
        let (bin, args) = command_line(&intent, &options);
        assert_eq!(bin, "adb");
        assert_eq!(
            args,
            vec![
                "-s", "emulator-5554", "shell",
                "am start --es msg 'hello world' -f 0",
            ],
        );

        let cmd = command(&intent, &options);
        assert_eq!(cmd.get_program(), "adb");
        assert_eq!(cmd.get_args().count(), 4);
    }

    // Verify unknown intents
    //
    // Launching an unknown ID fails before anything is executed.
    #[test]
    fn launch_unknown() {
        let m = crate::manifest::Manifest::parse_str("version = 1").unwrap();

        assert!(matches!(
            launch(&m, "x", &Options::default()),
            Err(Error::UnknownIntent(ref v)) if v == "x"
        ));
    }

    // Verify dry runs
    //
    // The full command-line is returned with the program first. Unknown IDs
    // are refused.
    #[test]
    fn launch_dry_run() {
        let s = "
            version = 1
            [[intent]]
            id = \"x\"
            action = \"A\"
            [[intent.extra]]
            key = \"empty\"
            type = \"string-list\"
            value = []
        ";
        let m = crate::manifest::Manifest::parse_str(s).unwrap();
        let options = Options {
            verb: Verb::Broadcast,
            user: None,
            target: Target::Adb { serial: None },
        };

        assert_eq!(
            dry_run(&m, "x", &options).unwrap(),
            vec!["adb", "shell", "am broadcast -a A -f 0"],
        );
        assert!(matches!(
            dry_run(&m, "y", &options),
            Err(Error::UnknownIntent(ref v)) if v == "y"
        ));
    }

    // Verify execution errors
    //
    // A missing program fails to execute, a failing program reports its
    // exit code, a succeeding program passes.
    #[cfg(unix)]
    #[test]
    fn run_status() {
        let missing = "osiris-intent-missing-program";

        assert!(matches!(
            run(build_command(missing, &[])),
            Err(Error::Exec(ref v, _)) if v == missing
        ));
        assert!(matches!(run(build_command("false", &[])), Err(Error::Failed(Some(1)))));
        assert!(run(build_command("true", &[])).is_ok());
    }
}
