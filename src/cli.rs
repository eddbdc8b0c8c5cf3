use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use getopts::{Matches, Options};

use crate::fetch::UPSTREAM;
use crate::sink::PacingPolicy;

#[derive(Debug, PartialEq)]
pub enum Output {
    Calendar {
        calendar_id_path: PathBuf,
        key_path: PathBuf,
    },
    Json,
    Ics(PathBuf),
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub year: i32,
    pub month: u32,
    pub base_url: String,
    pub pacing: PacingPolicy,
    pub output: Output,
}

/// Result of reading the command line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Run(Args),
    Help(String),
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "u",
        "url",
        &format!("Base URL of the monthly schedule pages [Default: {UPSTREAM}]"),
        "URL",
    );
    opts.optopt(
        "i",
        "interval",
        "Pause between calendar inserts [Default: 1.25]",
        "SECONDS",
    );
    opts.optopt(
        "r",
        "retries",
        "Retries after a transient insert failure [Default: 3]",
        "COUNT",
    );
    opts.optopt(
        "b",
        "backoff",
        "Delay before the first retry, doubled for each further one [Default: 2]",
        "SECONDS",
    );
    opts.optflag("j", "json", "Print the parsed events as JSON instead of sending them");
    opts.optopt(
        "o",
        "ics",
        "Write the parsed events to an iCalendar file instead of sending them",
        "PATH",
    );
    opts
}

fn usage(opts: &Options) -> String {
    let brief = format!(
        "Usage: {} [options] YEAR MONTH [CALENDAR_ID_FILE KEY_FILE]",
        env!("CARGO_PKG_NAME")
    );
    opts.usage(&brief)
}

fn seconds(matches: &Matches, name: &str, default: Duration) -> Result<Duration, String> {
    let invalid = |err: &dyn std::fmt::Display| {
        format!("Provided value for option '{name}' is invalid: {err}")
    };

    match matches.opt_get::<f64>(name) {
        Ok(None) => Ok(default),
        Ok(Some(secs)) => Duration::try_from_secs_f64(secs).map_err(|err| invalid(&err)),
        Err(err) => Err(invalid(&err)),
    }
}

/// Reads the arguments (without the program name). Errors are the message to
/// print before exiting.
pub fn try_parse(args: Vec<String>) -> Result<Command, String> {
    let opts = opts();

    let matches = opts.parse(args).map_err(|err| err.to_string())?;

    if matches.opt_present("help") {
        return Ok(Command::Help(usage(&opts)));
    }

    let defaults = PacingPolicy::default();

    let pacing = PacingPolicy {
        interval: seconds(&matches, "interval", defaults.interval)?,
        max_retries: matches
            .opt_get_default("retries", defaults.max_retries)
            .map_err(|err| format!("Provided value for option 'retries' is invalid: {err}"))?,
        initial_backoff: seconds(&matches, "backoff", defaults.initial_backoff)?,
    };

    let base_url = matches.opt_str("url").unwrap_or_else(|| UPSTREAM.to_string());

    let (year, month, rest) = match matches.free.as_slice() {
        [year, month, rest @ ..] => (year, month, rest),
        _ => return Err(usage(&opts)),
    };

    let year = year
        .parse::<i32>()
        .map_err(|err| format!("Provided value for YEAR is invalid: {err}"))?;
    let month = month
        .parse::<u32>()
        .map_err(|err| format!("Provided value for MONTH is invalid: {err}"))?;

    let output = if matches.opt_present("json") {
        Output::Json
    } else if let Some(path) = matches.opt_str("ics") {
        Output::Ics(path.into())
    } else {
        match rest {
            [calendar_id_path, key_path] => Output::Calendar {
                calendar_id_path: calendar_id_path.into(),
                key_path: key_path.into(),
            },
            _ => return Err(usage(&opts)),
        }
    };

    Ok(Command::Run(Args {
        year,
        month,
        base_url,
        pacing,
        output,
    }))
}

pub fn parse(args: Vec<String>) -> Args {
    match try_parse(args) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help(usage)) => {
            println!("{usage}");
            process::exit(0);
        }
        Err(message) => {
            eprintln!("{message}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<Args, String> {
        match try_parse(args.iter().map(|arg| arg.to_string()).collect())? {
            Command::Run(args) => Ok(args),
            Command::Help(_) => Err("unexpected help".into()),
        }
    }

    #[test]
    fn four_positionals_send_to_the_calendar() {
        let args = run(&["2024", "4", "calendar_id.txt", "key.json"]).unwrap();

        assert_eq!(
            args,
            Args {
                year: 2024,
                month: 4,
                base_url: UPSTREAM.to_string(),
                pacing: PacingPolicy::default(),
                output: Output::Calendar {
                    calendar_id_path: "calendar_id.txt".into(),
                    key_path: "key.json".into(),
                },
            }
        );
    }

    #[test]
    fn credentials_are_required_for_sending() {
        assert!(run(&["2024", "4"]).is_err());
        assert!(run(&["2024", "4", "calendar_id.txt"]).is_err());
    }

    #[test]
    fn local_outputs_need_no_credentials() {
        assert_eq!(run(&["--json", "2024", "4"]).unwrap().output, Output::Json);
        assert_eq!(
            run(&["-o", "april.ics", "2024", "4"]).unwrap().output,
            Output::Ics("april.ics".into())
        );
    }

    #[test]
    fn pacing_knobs_are_read() {
        let args = run(&[
            "--interval", "0.5", "--retries", "5", "--backoff", "1", "--url",
            "http://localhost:8080", "2025", "1", "id", "key",
        ])
        .unwrap();

        assert_eq!(
            args.pacing,
            PacingPolicy {
                interval: Duration::from_millis(500),
                max_retries: 5,
                initial_backoff: Duration::from_secs(1),
            }
        );
        assert_eq!(args.base_url, "http://localhost:8080");
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(run(&["April", "4", "id", "key"]).unwrap_err().contains("YEAR"));
        assert!(run(&["2024", "-4", "id", "key"]).is_err());
        assert!(run(&["-i", "-1", "2024", "4", "id", "key"])
            .unwrap_err()
            .contains("interval"));
        assert!(run(&["-r", "many", "2024", "4", "id", "key"])
            .unwrap_err()
            .contains("retries"));
    }

    #[test]
    fn help_is_its_own_command() {
        assert!(matches!(
            try_parse(vec!["--help".into()]),
            Ok(Command::Help(usage)) if usage.contains("YEAR MONTH")
        ));
    }
}
