use clap::{Arg, ArgAction, Command};
use shellmate::client::ServiceClient;
use shellmate::config::Config;
use shellmate::execution_context::Query;
use shellmate::executor::SystemShellRunner;
use shellmate::logging;
use shellmate::orchestrator::{Orchestrator, prompt_for_shell};
use shellmate::stager::{HeadlessStager, LineStager, TerminalStager};
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init("warn");

    let matches = Command::new("shellmate")
        .about("Convert natural language to shell commands using AI")
        .after_help(
            "Examples:\n  \
             shellmate \"list all python files older than 5 days\"\n  \
             shellmate find large files in home directory\n  \
             shellmate --seamless show disk usage\n\n\
             Environment Variables:\n  \
             SHELLMATE_API_ENDPOINT  - Command service endpoint URL\n  \
             SHELLMATE_API_KEY       - API key for authentication (optional)\n  \
             SHELLMATE_SHOW_PROMPT   - Show query and confirmation prompt (default: true)",
        )
        .arg(Arg::new("query")
            .help("Natural language query to convert to a shell command")
            .num_args(1..))
        .arg(Arg::new("seamless")
            .long("seamless")
            .short('s')
            .help("Output command to stdout for shell function integration")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .get_matches();

    if matches.get_flag("config") {
        return match Config::show_config_info() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    let words: Vec<&str> = matches
        .get_many::<String>("query")
        .unwrap_or_default()
        .map(String::as_str)
        .collect();

    let Some(query) = Query::parse(&words.join(" ")) else {
        eprintln!("No query provided. Use 'shellmate --help' for usage information.");
        return ExitCode::FAILURE;
    };
    let seamless = matches.get_flag("seamless");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let prompt = prompt_for_shell(std::env::var("SHELL").ok().as_deref());
    let endpoint = match config.require_endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match ServiceClient::new(endpoint, config.api_key.as_deref()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let stager: Box<dyn LineStager> = if seamless {
        Box::new(HeadlessStager)
    } else {
        match TerminalStager::new() {
            Ok(stager) => Box::new(stager),
            Err(e) => {
                warn!("Line editor unavailable: {}", e);
                Box::new(HeadlessStager)
            }
        }
    };

    info!("Processing query: {}", query.as_str());

    let mut orchestrator = Orchestrator::new(
        Box::new(client),
        stager,
        Box::new(SystemShellRunner),
        config.show_prompt,
        prompt,
    );

    if orchestrator.run(query.as_str(), seamless).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
