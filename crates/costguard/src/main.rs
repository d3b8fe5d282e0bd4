// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! costguard - track and bound the monetary cost of LLM API calls.
//!
//! This is the binary entry point. It loads and validates configuration,
//! then dispatches to the subcommand handlers.

use std::path::Path;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use costguard_config::{CostGuardConfig, GuardrailsConfig};
use costguard_core::{CostGuardError, TokenUsage, UsageEvent};
use costguard_engine::{calculate_cost, simulate_cost_impact, SimulationResult, SimulationVerdict};
use costguard_storage::UsageLedger;
use tracing_subscriber::EnvFilter;

// WARN verdicts are non-failing by design: only FAIL may produce a
// non-zero status, and only when --enforced is set.
const EXIT_CODE_PASS: i32 = 0;
const EXIT_CODE_FAIL: i32 = 1;

/// costguard - track and bound the monetary cost of LLM API calls.
#[derive(Parser, Debug)]
#[command(name = "costguard", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the usage ledger database.
    Init,
    /// Price a completed LLM call and append it to the ledger.
    Record {
        /// Feature identifier for tracking.
        #[arg(long, short = 'f')]
        feature: String,
        /// Model identifier (must be in the pricing table).
        #[arg(long, short = 'm')]
        model: String,
        /// Prompt token count.
        #[arg(long)]
        prompt_tokens: u32,
        /// Completion token count.
        #[arg(long)]
        completion_tokens: u32,
        /// Retries applied by the caller.
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Provider-assigned request identifier (generated when omitted).
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Show aggregate usage totals.
    Stats {
        /// Filter to a specific feature.
        #[arg(long, short = 'f')]
        feature: Option<String>,
        /// Filter to a specific model.
        #[arg(long, short = 'm')]
        model: Option<String>,
        /// Days of history to include.
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Check configuration and ledger status.
    Status,
    /// Simulate cost impact of current usage patterns (read-only).
    Simulate {
        /// Filter simulation to a specific feature.
        #[arg(long, short = 'f')]
        feature: Option<String>,
        /// Override the maximum allowed cost per request.
        #[arg(long, short = 'm')]
        max_cost: Option<f64>,
        /// Override the budget limit.
        #[arg(long, short = 'b')]
        budget: Option<f64>,
        /// Exit with an error code if the simulation fails.
        #[arg(long, short = 'e')]
        enforced: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match costguard_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            costguard_config::render_errors(&errors);
            std::process::exit(EXIT_CODE_FAIL);
        }
    };

    let exit_code = match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            EXIT_CODE_FAIL
        }
    };
    std::process::exit(exit_code);
}

async fn run(
    command: Option<Commands>,
    config: &CostGuardConfig,
) -> Result<i32, CostGuardError> {
    match command {
        None => {
            println!("costguard: use --help for available commands");
            Ok(EXIT_CODE_PASS)
        }
        Some(Commands::Init) => init(config).await,
        Some(Commands::Record {
            feature,
            model,
            prompt_tokens,
            completion_tokens,
            retries,
            request_id,
        }) => {
            record(
                config,
                &feature,
                &model,
                TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                },
                retries,
                request_id,
            )
            .await
        }
        Some(Commands::Stats {
            feature,
            model,
            days,
        }) => stats(config, feature.as_deref(), model.as_deref(), days).await,
        Some(Commands::Status) => status(config),
        Some(Commands::Simulate {
            feature,
            max_cost,
            budget,
            enforced,
        }) => simulate(config, feature.as_deref(), max_cost, budget, enforced).await,
    }
}

async fn init(config: &CostGuardConfig) -> Result<i32, CostGuardError> {
    let db_path = &config.storage.database_path;
    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CostGuardError::Storage {
            source: Box::new(e),
        })?;
    }

    let ledger = UsageLedger::open(db_path).await?;
    ledger.initialize().await?;
    println!("{} usage ledger initialized at {db_path}", "✓".green());
    Ok(EXIT_CODE_PASS)
}

async fn record(
    config: &CostGuardConfig,
    feature: &str,
    model: &str,
    usage: TokenUsage,
    retries: u32,
    request_id: Option<String>,
) -> Result<i32, CostGuardError> {
    let estimated_cost = calculate_cost(model, &usage)?;
    let request_id =
        request_id.or_else(|| Some(uuid::Uuid::new_v4().to_string()));
    let event = UsageEvent::new(
        Utc::now(),
        feature,
        model,
        usage,
        estimated_cost,
        retries,
        request_id,
    )?;

    let ledger = UsageLedger::open(&config.storage.database_path).await?;
    match ledger.append(&event).await {
        Ok(()) => {
            println!(
                "{} recorded {feature}/{model}: {} tokens, ${estimated_cost:.2}",
                "✓".green(),
                event.total_tokens
            );
            Ok(EXIT_CODE_PASS)
        }
        Err(CostGuardError::LedgerMissing(_)) => {
            eprintln!(
                "{} usage ledger not initialized; run `costguard init` first",
                "✗".red()
            );
            Ok(EXIT_CODE_FAIL)
        }
        Err(e) => Err(e),
    }
}

async fn stats(
    config: &CostGuardConfig,
    feature: Option<&str>,
    model: Option<&str>,
    days: u32,
) -> Result<i32, CostGuardError> {
    let ledger = UsageLedger::open(&config.storage.database_path).await?;
    let stats = match ledger.usage_stats(feature, model, days).await {
        Ok(stats) => stats,
        Err(CostGuardError::LedgerMissing(_)) => {
            print_no_data_guidance();
            return Ok(EXIT_CODE_PASS);
        }
        Err(e) => return Err(e),
    };

    println!("{}", format!("Usage over the last {days} days").bold());
    println!("  requests:     {}", stats.total_requests);
    println!("  total cost:   ${:.2}", stats.total_cost);
    println!("  avg cost:     ${:.4}", stats.avg_cost);
    println!("  total tokens: {}", stats.total_tokens);
    Ok(EXIT_CODE_PASS)
}

fn status(config: &CostGuardConfig) -> Result<i32, CostGuardError> {
    let db_path = &config.storage.database_path;
    if Path::new(db_path).exists() {
        println!("{} usage ledger present at {db_path}", "✓".green());
    } else {
        println!(
            "{} no usage ledger at {db_path}; run `costguard init`",
            "!".yellow()
        );
    }
    match config.guardrails.max_cost_per_request {
        Some(max_cost) => println!("  max cost per request: ${max_cost:.2}"),
        None => println!("  max cost per request: unlimited"),
    }
    match config.guardrails.budget_limit {
        Some(budget) => println!("  budget limit: ${budget:.2}"),
        None => println!("  budget limit: unlimited"),
    }
    Ok(EXIT_CODE_PASS)
}

async fn simulate(
    config: &CostGuardConfig,
    feature: Option<&str>,
    max_cost: Option<f64>,
    budget: Option<f64>,
    enforced: bool,
) -> Result<i32, CostGuardError> {
    // CLI flags override the config-file guardrails.
    let mut guardrails: GuardrailsConfig = config.guardrails.clone();
    if max_cost.is_some() {
        guardrails.max_cost_per_request = max_cost;
    }
    if budget.is_some() {
        guardrails.budget_limit = budget;
    }

    let ledger = UsageLedger::open(&config.storage.database_path).await?;
    let result = simulate_cost_impact(feature, &guardrails, &ledger).await?;

    if result.per_feature_results.is_empty() && result.estimated_monthly_impact == 0.0 {
        print_no_data_guidance();
        return Ok(EXIT_CODE_PASS);
    }

    display_simulation_result(&result);

    if enforced && result.overall_verdict == SimulationVerdict::Fail {
        Ok(EXIT_CODE_FAIL)
    } else {
        // Both PASS and WARN exit with 0.
        Ok(EXIT_CODE_PASS)
    }
}

fn print_no_data_guidance() {
    println!("\n{}", "No historical AI usage data found".yellow().bold());
    println!("\nTo get started with costguard:");
    println!("1. Run `costguard init` to initialize the usage ledger");
    println!("2. Record API calls with `costguard record`");
    println!("3. Run this command again to see the simulation results\n");
}

fn display_simulation_result(result: &SimulationResult) {
    println!("\n{}", "AI Cost Simulation Result".bold());
    println!("{}", "-".repeat(40));

    for group in &result.per_feature_results {
        println!("\n{} {}/{}", "Feature:".bold(), group.feature, group.model);
        println!(
            "Estimated monthly cost: ${:.2}",
            group.estimated_monthly_cost
        );

        for anomaly in &group.anomalies {
            println!(
                "{} rule {} ({}): {}",
                "Anomaly:".yellow(),
                anomaly.rule,
                anomaly.severity,
                anomaly.message
            );
        }

        for (action, message) in &group.violations {
            println!("{} {} ({message})", "Verdict:".bold(), action);
        }
    }

    let verdict = match result.overall_verdict {
        SimulationVerdict::Pass => "PASS".green().bold(),
        SimulationVerdict::Warn => "WARN".yellow().bold(),
        SimulationVerdict::Fail => "FAIL".red().bold(),
    };
    println!("\n{} {verdict}", "Overall:".bold());
    println!(
        "Total estimated monthly impact: ${:.2}\n",
        result.estimated_monthly_impact
    );
}
