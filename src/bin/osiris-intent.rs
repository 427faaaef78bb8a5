//! Osiris Intent Tooling
//!
//! This is the entry-point of `osiris-intent`, a command-line tool to encode
//! and deliver Android intents. Its main input is the `osiris-intent.toml`
//! manifest, which declares named intents. This tool reads the manifest and
//! encodes the selected intent as arguments of the Android activity manager,
//! or directly runs the activity manager with them.
//!
//! This CLI is mainly a dispatcher of all the operations available in
//! `osiris_intent::op::*`. It is a simple clap-based CLI that forwards the
//! arguments to `osiris_intent` and visualizes the results. Diagnostics are
//! logged to STDERR via `tracing`, filtered by `RUST_LOG`.

use clap;
use osiris_intent;
use tracing_subscriber;

struct Cli {
    cmd: clap::Command,
}

fn arg_format(
    s: &str,
) -> Result<osiris_intent::op::encode::Format, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid output format",
            )
        }
    )
}

fn arg_verb(
    s: &str,
) -> Result<osiris_intent::op::launch::Verb, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid activity manager verb",
            )
        }
    )
}

fn arg_intent() -> clap::Arg {
    clap::Arg::new("intent")
        .long("intent")
        .value_name("ID")
        .help("ID of the intent in the manifest")
        .required(true)
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("osiris-intent")
            .propagate_version(true)
            .subcommand_required(true)
            .about("Osiris Intent Tooling")
            .long_about("Encode and deliver Android intents via the activity manager")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("manifest")
                .long("manifest")
                .value_name("PATH")
                .help("Path to the intent manifest relative to the working directory")
                .default_value("./osiris-intent.toml")
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.subcommand(
            clap::Command::new("list")
                .about("List all intents declared in the manifest")
        );

        cmd = cmd.subcommand(
            clap::Command::new("encode")
                .about("Print the activity manager arguments of an intent")
                .arg(arg_intent())
                .arg(
                    clap::Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format (lines, json, shell)")
                        .default_value("lines")
                        .value_parser(arg_format)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("launch")
                .about("Deliver an intent via the activity manager")
                .arg(arg_intent())
                .arg(
                    clap::Arg::new("verb")
                        .long("verb")
                        .value_name("VERB")
                        .help("Activity manager command (start, start-service, broadcast)")
                        .default_value("start")
                        .value_parser(arg_verb)
                )
                .arg(
                    clap::Arg::new("user")
                        .long("user")
                        .value_name("ID")
                        .help("User to deliver the intent as")
                        .value_parser(clap::value_parser!(u32))
                )
                .arg(
                    clap::Arg::new("adb")
                        .long("adb")
                        .value_name("BOOL")
                        .help("Whether to run the activity manager via `adb shell`")
                        .default_value("false")
                        .value_parser(clap::builder::ValueParser::bool())
                )
                .arg(
                    clap::Arg::new("serial")
                        .long("serial")
                        .value_name("SERIAL")
                        .help("Serial of the device to use with `adb`")
                )
                .arg(
                    clap::Arg::new("dry-run")
                        .long("dry-run")
                        .value_name("BOOL")
                        .help("Whether to print the command-line instead of running it")
                        .default_value("false")
                        .value_parser(clap::builder::ValueParser::bool())
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn manifest(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<osiris_intent::manifest::Manifest, u8> {
        let manifest_path: &std::ffi::OsString = m.get_one("manifest")
            .expect("Cannot acquire manifest path");

        match osiris_intent::manifest::Manifest::parse_path(
            std::path::Path::new(manifest_path)
        ) {
            Err(osiris_intent::manifest::Error::Read(path, error)) => {
                eprintln!("Cannot read intent manifest {:?}: {}", path, error);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::Syntax(error)) => {
                eprintln!("Cannot parse intent manifest {:?}: {}", manifest_path, error);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::Version(version)) => {
                eprintln!("Cannot parse intent manifest {:?}: Unsupported version {}", manifest_path, version);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::IntentId(id)) => {
                eprintln!("Cannot parse intent manifest {:?}: Invalid intent ID '{}'", manifest_path, id);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::DuplicateId(id)) => {
                eprintln!("Cannot parse intent manifest {:?}: Duplicate intent ID '{}'", manifest_path, id);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::Component(id, error)) => {
                eprintln!("Cannot parse intent manifest {:?}: Invalid component of intent '{}' ({:?})", manifest_path, id, error);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::Flags(id, flags)) => {
                eprintln!("Cannot parse intent manifest {:?}: Flags {:#x} of intent '{}' exceed 32 bits", manifest_path, flags, id);
                Err(1)
            },
            Err(osiris_intent::manifest::Error::ExtraValue(id, key)) => {
                eprintln!("Cannot parse intent manifest {:?}: Extra '{}' of intent '{}' does not match its type", manifest_path, key, id);
                Err(1)
            },
            Ok(v) => {
                Ok(v)
            },
        }
    }

    fn op_list(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;

        for id in manifest.intent_ids() {
            println!("{}", id);
        }

        Ok(())
    }

    fn op_encode(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let id: &String = m_op.get_one("intent").expect("Intent-flag lacks a value");
        let format = *m_op.get_one("format").expect("Format-flag lacks a value");

        match osiris_intent::op::encode::encode(&manifest, id) {
            Err(osiris_intent::op::encode::Error::UnknownIntent(id)) => {
                eprintln!("Cannot encode intent: No intent '{}' in manifest", id);
                Err(1)
            },
            Ok(args) => {
                println!("{}", osiris_intent::op::encode::render(&args, format));
                Ok(())
            },
        }
    }

    fn op_launch(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;
        let id: &String = m_op.get_one("intent").expect("Intent-flag lacks a value");
        let adb: bool = *m_op.get_one("adb").expect("Adb-flag lacks a value");
        let dry_run: bool = *m_op.get_one("dry-run").expect("Dry-run-flag lacks a value");
        let serial: Option<&String> = m_op.get_one("serial");

        if serial.is_some() && !adb {
            eprintln!("Cannot launch intent: Device serial requires `--adb true`");
            return Err(2);
        }

        let options = osiris_intent::op::launch::Options {
            verb: *m_op.get_one("verb").expect("Verb-flag lacks a value"),
            user: m_op.get_one("user").copied(),
            target: if adb {
                osiris_intent::op::launch::Target::Adb {
                    serial: serial.cloned(),
                }
            } else {
                osiris_intent::op::launch::Target::Local
            },
        };

        if dry_run {
            return match osiris_intent::op::launch::dry_run(&manifest, id, &options) {
                Err(osiris_intent::op::launch::Error::UnknownIntent(id)) => {
                    eprintln!("Cannot launch intent: No intent '{}' in manifest", id);
                    Err(1)
                },
                Err(_) => std::unreachable!(),
                Ok(args) => {
                    println!(
                        "{}",
                        osiris_intent::op::encode::render(&args, osiris_intent::op::encode::Format::Shell),
                    );
                    Ok(())
                },
            };
        }

        match osiris_intent::op::launch::launch(&manifest, id, &options) {
            Err(osiris_intent::op::launch::Error::UnknownIntent(id)) => {
                eprintln!("Cannot launch intent: No intent '{}' in manifest", id);
                Err(1)
            },
            Err(osiris_intent::op::launch::Error::Exec(bin, error)) => {
                eprintln!("Cannot launch intent: Failed to execute '{}' ({})", bin, error);
                Err(1)
            },
            Err(osiris_intent::op::launch::Error::Failed(Some(code))) => {
                eprintln!("Cannot launch intent: Activity manager failed with exit code {}", code);
                Err(1)
            },
            Err(osiris_intent::op::launch::Error::Failed(None)) => {
                eprintln!("Cannot launch intent: Activity manager was terminated by a signal");
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => {
                        e.print().expect("Cannot write to STDERR");
                        Ok(())
                    },
                    _ => {
                        e.print().expect("Cannot write to STDERR");
                        Err(2)
                    }
                }
            }
        }

        match m.subcommand() {
            Some(("list", _)) => self.op_list(&m),
            Some(("encode", m_op)) => self.op_encode(&m, &m_op),
            Some(("launch", m_op)) => self.op_launch(&m, &m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}
