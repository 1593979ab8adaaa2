use std::env;
use std::process::ExitCode;

use clap::{arg, command, crate_name, value_parser, ArgMatches, Command};
use cli::upload::UploadParams;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "mupload=info,client=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(
                    arg!(-u --uri <URI>)
                        .required(false)
                        .help("Backend base URI. Falls back to MUPLOAD_URI"),
                )
                .arg(
                    arg!(-b --bucket <BUCKET>)
                        .required(false)
                        .help("Bucket to upload into. Defaults to MUPLOAD_DEFAULT_BUCKET or 'default'"),
                )
                .arg(
                    arg!(-t --token <TOKEN>)
                        .required(false)
                        .help("Bearer token. Falls back to MUPLOAD_TOKEN"),
                )
                .arg(
                    arg!(-c --concurrency <NUMBER>)
                        .required(false)
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of files sent at the same time"),
                )
                .arg(
                    arg!(<FILES> ...)
                        .required(true)
                        .help("Paths of files to upload"),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if cli.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
    } else if cli.subcommand_matches(cli::BUGREPORT_SUBCOMMAND).is_some() {
        cli::bugreport::run();
    } else if let Some(upload_matches) = cli.subcommand_matches(cli::UPLOAD_SUBCOMMAND) {
        let Some(params) = upload_params(upload_matches) else {
            return ExitCode::FAILURE;
        };
        if !cli::upload::run(params).await {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn upload_params(matches: &ArgMatches) -> Option<UploadParams> {
    let uri = matches
        .get_one::<String>("uri")
        .cloned()
        .or_else(|| env::var(cli::URI_ENV).ok());
    let Some(uri) = uri else {
        tracing::error!("backend URI is required, pass --uri or set {}", cli::URI_ENV);
        return None;
    };
    let token = matches
        .get_one::<String>("token")
        .cloned()
        .or_else(|| env::var(cli::TOKEN_ENV).ok())
        .filter(|t| !t.is_empty());
    let files = matches
        .get_many::<String>("FILES")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    Some(UploadParams {
        uri,
        bucket: matches.get_one::<String>("bucket").cloned(),
        token,
        concurrency: matches.get_one::<usize>("concurrency").copied(),
        files,
    })
}
