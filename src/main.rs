//! sqlreport - ask the employee database a question, get a CSV report and a summary.

mod cli;
mod logging;

use std::sync::Arc;

use cli::Cli;
use sqlreport::config::Config;
use sqlreport::db::DatabaseClient;
use sqlreport::error::{Result, SqlReportError};
use sqlreport::llm::{create_client, RequestTranslator};
use sqlreport::orchestrator::{Orchestrator, RequestOutcome, RequestState};
use sqlreport::query::QueryExecutor;
use sqlreport::report::ReportWriter;
use sqlreport::store::EmployeeStore;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is fine; keys may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    match &cli.log_file {
        Some(path) => logging::init_file_logging(path, cli.verbose),
        None => logging::init_stderr_logging(cli.verbose),
    }

    let code = match run(&cli).await {
        Ok((outcome, display_rows)) => {
            print_outcome(&outcome, display_rows);
            outcome.exit_code()
        }
        Err(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{}: {}", e.category(), e.detail());
            1
        }
    };
    std::process::exit(code);
}

/// Builds the pipeline from configuration and handles the request.
///
/// Errors here are bootstrap failures; request failures are carried in the
/// outcome. Also returns how many rows the console may show.
async fn run(cli: &Cli) -> Result<(RequestOutcome, usize)> {
    let config = load_config(cli)?;

    let store = EmployeeStore::open(&config.database.path, &config.database).await?;
    if let Some(count) = cli.seed {
        store.generate_fixtures(count).await?;
    }

    let llm = create_client(&config.llm)?;
    let translator = RequestTranslator::new(llm, store.schema().await?)
        .with_config(&config.llm, &config.report)
        .with_protected_database(&config.database.path);

    let db: Arc<dyn DatabaseClient> = Arc::new(store.client().clone());
    let executor = QueryExecutor::new(Arc::clone(&db)).with_mutation_allowed(cli.allow_writes);
    let orchestrator = Orchestrator::new(translator, executor, ReportWriter::new());

    let outcome = orchestrator
        .handle_with_output(&cli.request, cli.output.as_deref())
        .await;

    db.close().await?;
    Ok((outcome, config.report.display_rows))
}

/// Resolves configuration with precedence: flags, environment, file, defaults.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_to(&mut config);

    if config.report.summary_row_limit == 0 {
        return Err(SqlReportError::config(
            "report.summary_row_limit must be at least 1",
        ));
    }
    Ok(config)
}

fn print_outcome(outcome: &RequestOutcome, display_rows: usize) {
    match &outcome.state {
        RequestState::Summarized => {
            if let Some(summary) = &outcome.summary {
                println!("{summary}");
            }
        }
        RequestState::Failed(reason) => {
            eprintln!("{}: {}", reason.error.category(), reason.error.detail());
        }
        _ => {
            if let Some(e) = &outcome.summary_error {
                eprintln!("Summary unavailable ({}); showing raw results.", e.detail());
            }
            if let Some(path) = &outcome.report_path {
                println!("Report written to {}", path.display());
            }
            if let Some(result) = &outcome.result {
                println!("{}", result.to_plain_table(display_rows));
            }
        }
    }
}
