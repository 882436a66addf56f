use anyhow::Result;
use clap::Parser;
use colored::*;

use testing_tools::output::print_test_summary;
use testing_tools::scenarios;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "SSE Integration Testing Tool")]
struct Cli {
    /// Base URL of the stream server (e.g., http://localhost:8080)
    #[arg(long)]
    base_url: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Open a stream and wait for a single event
    ConnectionTest,
    /// intervalMs=250&start=10&limit=5 yields 10..=14 then closes
    Bounded,
    /// Reconnecting with Last-Event-ID continues without gaps
    Resume,
    /// A malformed intervalMs falls back to the server default
    Fallback,
    /// Run every scenario
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let base_url = cli.base_url.trim_end_matches('/');

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());
    println!("{} Target: {}", "→".blue(), base_url);

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            results.push(scenarios::test_connection(base_url).await?);
        }
        ScenarioChoice::Bounded => {
            results.push(scenarios::test_bounded_stream(base_url).await?);
        }
        ScenarioChoice::Resume => {
            results.push(scenarios::test_resume(base_url).await?);
        }
        ScenarioChoice::Fallback => {
            results.push(scenarios::test_interval_fallback(base_url).await?);
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_connection(base_url).await?);
            results.push(scenarios::test_bounded_stream(base_url).await?);
            results.push(scenarios::test_resume(base_url).await?);
            results.push(scenarios::test_interval_fallback(base_url).await?);
        }
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
