mod cli;
mod play;

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use quiz_core::model::{TestId, TestSummary};
use services::{AppServices, CatalogOrigin, CatalogSnapshot, ManualConnectivity, QuizConfig};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout belongs to the quiz.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = QuizConfig::from_env().context("reading QUIZ_* environment")?;
    cli.apply(&mut config)?;
    cli::prepare_sqlite_dir(&config.database_url)
        .with_context(|| format!("preparing database directory for {}", config.database_url))?;

    let connectivity = Arc::new(ManualConnectivity::new(!cli.offline));
    let services = AppServices::new_sqlite(config, connectivity).await?;

    if cli.command != Command::AcceptTerms && !services.consent().is_granted().await? {
        bail!("terms of use not accepted yet; run `quiz accept-terms` first");
    }

    match cli.command {
        Command::Catalog => {
            let snapshot = services.catalog().fetch_catalog().await;
            print_catalog(&snapshot);
        }
        Command::Random => {
            let snapshot = services.catalog().fetch_catalog().await;
            let Some(summary) = services.catalog().random_test(&snapshot.tests) else {
                report_issues(&snapshot);
                bail!("no tests available");
            };
            play::run(&services, &summary).await?;
        }
        Command::Play { test_id } => {
            let test_id: TestId = test_id.parse()?;
            let snapshot = services.catalog().fetch_catalog().await;
            let summary = find_test(&snapshot, &test_id)?;
            play::run(&services, summary).await?;
        }
        Command::Results { last } => {
            let last = last.unwrap_or(services.config().results_limit);
            let records = services.results().recent(last).await?;
            if records.is_empty() {
                println!("No results yet.");
            }
            for record in records {
                println!(
                    "{}  {:<16} {:>3}/{:<3} {}",
                    record.created_on.format("%Y-%m-%d %H:%M"),
                    record.nick,
                    record.score,
                    record.total,
                    record.label
                );
            }
        }
        Command::AcceptTerms => {
            services.consent().grant().await?;
            println!("Terms accepted.");
        }
    }

    Ok(())
}

fn print_catalog(snapshot: &CatalogSnapshot) {
    match snapshot.origin {
        CatalogOrigin::Remote => {}
        CatalogOrigin::Cache => println!("(offline copy)"),
        CatalogOrigin::Unavailable => {
            report_issues(snapshot);
            println!("No tests available.");
            return;
        }
    }
    for test in &snapshot.tests {
        println!(
            "{:<28} {} [{}] {} questions",
            test.id().as_str(),
            test.name(),
            test.level(),
            test.number_of_tasks()
        );
        if !test.description().is_empty() {
            println!("{:<28} {}", "", test.description());
        }
    }
}

fn report_issues(snapshot: &CatalogSnapshot) {
    for issue in &snapshot.issues {
        tracing::warn!(error = %issue, "catalog issue");
    }
}

fn find_test<'a>(snapshot: &'a CatalogSnapshot, id: &TestId) -> anyhow::Result<&'a TestSummary> {
    if let Some(summary) = snapshot.tests.iter().find(|t| t.id() == id) {
        return Ok(summary);
    }
    report_issues(snapshot);
    bail!("unknown test {id}")
}
