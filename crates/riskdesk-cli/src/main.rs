//! riskdesk - risk assessment manager CLI
//!
//! Talks to the hosted backend configured in a TOML file, or to a seeded
//! in-memory workspace with `--demo`.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use riskdesk_backend::{Backend, RestBackend};
use riskdesk_core::{DeskConfig, LogConfig, RiskDesk};
use riskdesk_model::{AssessmentId, CsvOptions, LineEnding, ProjectId, UserId};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod demo;

use commands::SessionCommands;

fn ra_arg() -> Arg {
    Arg::new("ra")
        .long("ra")
        .value_parser(value_parser!(AssessmentId))
        .help("Risk assessment id (defaults to the demo assessment with --demo)")
}

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .required(true)
        .value_parser(value_parser!(UserId))
        .help("Team member id")
}

fn cli() -> Command {
    Command::new("riskdesk")
        .version(riskdesk_core::VERSION)
        .about("Construction-site risk assessments: scoring, sign-off and export")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .global(true)
                .help("Access token of the signed-in user"),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Use a seeded in-memory workspace instead of the backend"),
        )
        .subcommand(
            Command::new("score")
                .about("Score a likelihood and impact pair")
                .arg(
                    Arg::new("likelihood")
                        .long("likelihood")
                        .short('l')
                        .required(true)
                        .value_parser(value_parser!(u8).range(1..=5))
                        .help("Likelihood rating, 1-5"),
                )
                .arg(
                    Arg::new("impact")
                        .long("impact")
                        .short('i')
                        .required(true)
                        .value_parser(value_parser!(u8).range(1..=5))
                        .help("Impact rating, 1-5"),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Show the risk level of a score")
                .arg(
                    Arg::new("score")
                        .required(true)
                        .value_parser(value_parser!(u8).range(1..=25))
                        .help("Risk score, 1-25"),
                ),
        )
        .subcommand(
            Command::new("profile")
                .about("Complete your profile")
                .arg(Arg::new("first-name").long("first-name").required(true))
                .arg(Arg::new("last-name").long("last-name").required(true))
                .arg(Arg::new("job-title").long("job-title")),
        )
        .subcommand(Command::new("projects").about("List the team's projects"))
        .subcommand(
            Command::new("project")
                .about("Show a project with its assessments and dynamic risks")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(ProjectId)),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show an assessment's entries and sign-off")
                .arg(ra_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("Export an assessment's entries as CSV")
                .arg(ra_arg())
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory to write the CSV file into (prints to stdout otherwise)"),
                )
                .arg(
                    Arg::new("crlf")
                        .long("crlf")
                        .action(ArgAction::SetTrue)
                        .help("Separate rows with CRLF"),
                ),
        )
        .subcommand(
            Command::new("require")
                .about("Mark a team member as a required signatory (admin)")
                .arg(ra_arg())
                .arg(user_arg())
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .action(ArgAction::SetTrue)
                        .help("Remove the requirement instead"),
                ),
        )
        .subcommand(
            Command::new("sign")
                .about("Sign an assessment you are required to sign")
                .arg(ra_arg()),
        )
        .subcommand(Command::new("members").about("List team members"))
        .subcommand(
            Command::new("invite")
                .about("Invite someone to the team (admin)")
                .arg(Arg::new("email").required(true))
                .arg(
                    Arg::new("admin")
                        .long("admin")
                        .action(ArgAction::SetTrue)
                        .help("Invite as a team admin"),
                ),
        )
        .subcommand(
            Command::new("role")
                .about("Change a member's role (admin)")
                .arg(user_arg())
                .arg(
                    Arg::new("role")
                        .long("role")
                        .required(true)
                        .value_parser(["user", "team_admin"]),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<DeskConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => DeskConfig::load(path)
            .with_context(|| format!("could not load {}", path.display())),
        None => Ok(DeskConfig::new().with_env_overrides(|key| std::env::var(key).ok())),
    }
}

fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&log.filter)
        .with_context(|| format!("invalid log filter '{}'", log.filter))?;
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn export_options(config: &DeskConfig, matches: &ArgMatches) -> CsvOptions {
    match matches.subcommand() {
        Some(("export", args)) if args.get_flag("crlf") => {
            config.export.with_line_ending(LineEnding::CrLf)
        }
        _ => config.export,
    }
}

async fn run_session<B: Backend>(
    desk: &RiskDesk<B>,
    token: &str,
    default_ra: Option<AssessmentId>,
    name: &str,
    args: &ArgMatches,
) -> Result<()> {
    SessionCommands::open(desk, token, default_ra)
        .await?
        .dispatch(name, args)
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_tracing(&config.log)?;

    let Some((name, args)) = matches.subcommand() else {
        return Ok(());
    };
    match name {
        "score" => return commands::run_score(args),
        "classify" => return commands::run_classify(args),
        _ => {}
    }

    let export = export_options(&config, &matches);
    let token = matches.get_one::<String>("token");
    if matches.get_flag("demo") {
        let demo = demo::seed().await?;
        let token = token.map_or(demo::DEMO_TOKEN, String::as_str);
        debug!(ra = %demo.assessment, "running against demo data");
        let desk = RiskDesk::new(demo.backend).with_export_options(export);
        run_session(&desk, token, Some(demo.assessment), name, args).await
    } else {
        let token = token.context("--token is required unless --demo is given")?;
        let backend = RestBackend::new(&config.backend.clone().with_access_token(token.as_str()))
            .context("could not build the backend client")?;
        let desk = RiskDesk::new(backend).with_export_options(export);
        run_session(&desk, token, None, name, args).await
    }
}
