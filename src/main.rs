//! `totp`: print a TOTP token getting the shared key from pass(1).

use std::{
    ffi::OsString,
    io::{self, BufRead, IsTerminal, Write},
    process::ExitCode,
};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use totp_pass::{
    clipboard::{Clipboard, SystemClipboard},
    config::Config,
    service::TokenService,
    store::{EntryStore, PassStore},
    OtpError, DIGITS_DEFAULT,
};

#[derive(Parser, Debug)]
#[command(
    name = "totp",
    version,
    about = "Print a TOTP token getting the shared key from pass(1)."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// (default action) show the current TOTP token for a registered entry
    Show(ShowArgs),
    /// add a new TOTP entry to the database
    Add(AddArgs),
    /// remove a TOTP entry from the database
    Rm(RmArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// offset the clock by the given number of seconds
    #[arg(
        short = 's',
        value_name = "SECONDS",
        default_value_t = 0.0,
        allow_negative_numbers = true
    )]
    offset_seconds: f64,
    /// Do not copy the token, only show it.
    #[arg(short, long)]
    nocopy: bool,
    /// the identifier by which the key can be found under the '2fa' folder
    identifier: String,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// an optional otpauth uri to read the entry data from
    #[arg(short, long)]
    uri: Option<String>,
    /// the identifier under the '2fa' folder where the key should be saved
    identifier: String,
}

#[derive(Args, Debug)]
struct RmArgs {
    /// the identifier of the entry to remove from the '2fa' folder
    identifier: String,
}

const SUBCOMMANDS: &[&str] = &["show", "add", "rm", "help"];
const HELP_FLAGS: &[&str] = &["-h", "--help", "-V", "--version"];
const ALIASES: &[(&str, &str)] = &[("-a", "add")];

/// Rewrites the first argument when it is an alias, and inserts `show` when
/// no subcommand or help flag was given.
fn with_default_subcommand(mut args: Vec<OsString>) -> Vec<OsString> {
    if let Some(first) = args.get_mut(1) {
        let alias = ALIASES.iter().find(|(alias, _)| first.as_os_str() == *alias);
        if let Some((_, name)) = alias {
            *first = OsString::from(name);
        }
    }

    let explicit = args.iter().skip(1).any(|arg| {
        arg.to_str()
            .is_some_and(|a| SUBCOMMANDS.contains(&a) || HELP_FLAGS.contains(&a))
    });
    if !explicit && args.len() > 1 {
        args.insert(1, OsString::from("show"));
    }

    args
}

fn parse_digits(input: &str) -> Result<u32, OtpError> {
    if input.is_empty() {
        return Ok(DIGITS_DEFAULT);
    }

    let digits = input
        .parse::<u32>()
        .map_err(|e| OtpError::IntegerParseError(e, "token length".into()))?;
    if digits == 0 {
        return Err(OtpError::InvalidDigits(digits));
    }

    Ok(digits)
}

/// Asks for the token length until a valid one (or nothing) is entered.
fn prompt_digits(input: &mut impl BufRead, output: &mut impl Write) -> Result<u32> {
    loop {
        write!(output, "Token length [{DIGITS_DEFAULT}]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("no token length entered");
        }

        match parse_digits(line.trim()) {
            Ok(digits) => return Ok(digits),
            Err(e) => writeln!(output, "{e}")?,
        }
    }
}

/// Reads one line without its terminator, `None` at end of input.
fn read_secret(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Reads the shared key without echo, `None` when the terminal hits EOF.
fn read_hidden_secret() -> io::Result<Option<String>> {
    match rpassword::prompt_password("Shared key: ") {
        Ok(secret) => Ok(Some(secret)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Feeds shared keys from `read` to `submit` until one is accepted.
/// Rejected keys are reported on `errors`.
fn prompt_secret(
    mut read: impl FnMut() -> io::Result<Option<String>>,
    mut submit: impl FnMut(&str) -> Result<(), OtpError>,
    errors: &mut impl Write,
) -> Result<()> {
    loop {
        let Some(secret) = read()? else {
            bail!("no shared key entered");
        };

        match submit(&secret) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_validation() => writeln!(errors, "{e}")?,
            Err(e) => return Err(e.into()),
        }
    }
}

fn add_interactive<S: EntryStore, C: Clipboard>(
    service: &TokenService<S, C>,
    identifier: &str,
) -> Result<()> {
    let digits = prompt_digits(&mut io::stdin().lock(), &mut io::stdout())?;
    let submit = |secret: &str| service.add_interactive(identifier, digits, secret);

    if io::stdin().is_terminal() {
        prompt_secret(read_hidden_secret, submit, &mut io::stderr())
    } else {
        let mut stdin = io::stdin().lock();
        let read = || -> io::Result<Option<String>> {
            print!("Shared key: ");
            io::stdout().flush()?;
            read_secret(&mut stdin)
        };

        prompt_secret(read, submit, &mut io::stderr())
    }
}

fn run<S: EntryStore, C: Clipboard>(command: Command, service: &TokenService<S, C>) -> Result<()> {
    match command {
        Command::Show(args) => {
            let token = service.show(&args.identifier, args.offset_seconds, !args.nocopy)?;
            println!("{token}");
            info!("valid for another {} seconds", token.remaining_seconds);
        }
        Command::Add(AddArgs {
            uri: Some(uri),
            identifier,
        }) => {
            service.add_from_uri(&identifier, &uri)?;
        }
        Command::Add(AddArgs {
            uri: None,
            identifier,
        }) => add_interactive(service, &identifier)?,
        Command::Rm(args) => service.remove(&args.identifier)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse_from(with_default_subcommand(std::env::args_os().collect()));

    let config = Config::from_env();
    let service = TokenService::new(
        PassStore::new(config.pass_program.as_str()),
        SystemClipboard::new(&config),
    );

    match run(cli.command, &service) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
