use std::env;
use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{error, info};

use naist_calendar::cli::{self, Args, Output};
use naist_calendar::fetch::fetch_schedule;
use naist_calendar::google::{Credentials, GoogleCalendar};
use naist_calendar::report::Summary;
use naist_calendar::sink::{CalendarSink, TokioPacer};
use naist_schedule::parse_schedule;

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "naist_calendar=info,naist_schedule=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

async fn run(args: Args) -> Result<Summary> {
    let client = reqwest::Client::new();
    let html = fetch_schedule(&client, &args.base_url, args.year, args.month).await?;

    let schedule = parse_schedule(&html, args.year, args.month)?;
    info!(
        "Parsed {} events for {}-{:02}",
        schedule.events.len(),
        args.year,
        args.month
    );

    let sync = match args.output {
        Output::Json => {
            println!("{}", serde_json::to_string_pretty(&schedule.events)?);
            None
        }
        Output::Ics(path) => {
            fs::write(&path, schedule.to_ics().to_string())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
            None
        }
        Output::Calendar {
            calendar_id_path,
            key_path,
        } => {
            let Credentials { calendar_id, key } =
                Credentials::load(&calendar_id_path, &key_path).await?;
            let api = GoogleCalendar::connect(key).await?;
            let sink = CalendarSink::new(api, TokioPacer, calendar_id, args.pacing);
            Some(sink.send(&schedule.events).await?)
        }
    };

    Ok(Summary::new(&schedule, sync))
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let args = cli::parse(env::args().skip(1).collect());

    match run(args).await {
        Ok(summary) => {
            summary.log();
            if summary.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
