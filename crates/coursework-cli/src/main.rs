mod cli;
mod commands;

use std::sync::Arc;

use cli::{CliError, CliOptions, Collection};
use commands::{CommandError, StderrNotifier, run_command};
use coursework::{
    AssignmentAccess, HttpRecordClient, Notifier, RecordClient, RecordClientConfig,
    StudySessionAccess, load_dotenv,
};
use tracing::{debug, error};

const DEFAULT_LOG_FILTER: &str = "coursework=info,coursework_cli=info";

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let config = match RecordClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read record backend config: {err}");
            std::process::exit(1);
        }
    };
    debug!(
        api_url = %config.api_url,
        collection = options.collection.as_str(),
        "record backend configured"
    );

    let client: Arc<dyn RecordClient> = match HttpRecordClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!("failed to build record client: {err}");
            std::process::exit(1);
        }
    };
    let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier);

    let result = match options.collection {
        Collection::Assignments => {
            run_command(&AssignmentAccess::new(client, notifier), options.command).await
        }
        Collection::Sessions => {
            run_command(&StudySessionAccess::new(client, notifier), options.command).await
        }
    };

    match result {
        Ok(Some(output)) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: failed to render result: {err}");
                std::process::exit(1);
            }
        },
        Ok(None) => std::process::exit(1),
        Err(err @ CommandError::InvalidPayload { .. }) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: coursework-cli <assignments|sessions> <command>\n\
         \n\
         Commands:\n\
         - list               Print every record of the collection\n\
         - get ID             Print one record\n\
         - create JSON        Create a record from a JSON object of backend fields\n\
         - update ID JSON     Update only the fields present in the JSON object\n\
         - delete ID          Delete one record\n\
         \n\
         Environment:\n\
         - APPER_PROJECT_ID   Project identifier (falls back to VITE_APPER_PROJECT_ID)\n\
         - APPER_PUBLIC_KEY   Public API key (falls back to VITE_APPER_PUBLIC_KEY)\n\
         - APPER_API_URL      Backend base URL (optional)\n\
         - APPER_TIMEOUT_MS   Per-request timeout in milliseconds (optional)\n\
         \n\
         Exit codes: 0 on success, 1 when the operation produced no result, 2 on usage errors."
    );
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::EnvFilter;

    use super::DEFAULT_LOG_FILTER;

    #[test]
    fn default_log_filter_keeps_library_failures_visible() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        let directives = DEFAULT_LOG_FILTER.split(',').collect::<Vec<_>>();
        assert_eq!(directives, vec!["coursework=info", "coursework_cli=info"]);
    }
}
