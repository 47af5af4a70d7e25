//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Run the autonomous loop until interrupted, or for N ticks
//! - evaluate: Vet a single action with the policy engine
//! - phases: Show the daily schedule
//! - behaviors: List the built-in behaviors
//! - doctor: Validate configuration and summarize effective settings

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use sdk::types::{Action, ActionCategory, DecisionContext};

use crate::autonomy::{default_behaviors, AutonomousLoop, LoopDependencies, PhaseSchedule};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::ethics::{EthicalEvaluation, EthicsEngine};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Run the autonomous loop
///
/// With `ticks`, runs that many ticks back to back and prints the final
/// state. Otherwise starts the loop and runs until Ctrl-C, then stops it
/// gracefully.
pub async fn handle_run(config: &Config, ticks: Option<u64>, format: OutputFormat) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let deps = LoopDependencies::from_config(config, clock)
        .context("Failed to initialize the policy engine")?;
    let agent_loop = Arc::new(AutonomousLoop::new(config, deps));

    match ticks {
        Some(count) => {
            for _ in 0..count {
                agent_loop.tick().await?;
            }
        }
        None => {
            if !config.autonomy.enabled {
                println!("Autonomy is disabled in configuration. Nothing to run.");
                return Ok(());
            }

            agent_loop.start().await?;
            if let OutputFormat::Text = format {
                println!(
                    "Mindloop agent '{}' running (tick every {}ms). Press Ctrl-C to stop.",
                    config.core.agent_name, config.autonomy.tick_interval_ms
                );
            }

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutdown signal received");

            if let Err(e) = agent_loop.stop().await {
                tracing::warn!("Shutdown incomplete: {}", e);
            }
        }
    }

    let state = agent_loop.snapshot();
    match format {
        OutputFormat::Text => {
            println!();
            println!("Agent:        {}", state.agent_id);
            println!(
                "Phase:        {}",
                state.current_phase.as_deref().unwrap_or("none")
            );
            println!("Ticks:        {}", state.metrics.ticks);
            println!("Decisions:    {}", state.metrics.decisions_made);
            println!("Goals:        {}", state.goals);
            println!(
                "Actions:      {} executed, {} denied, {} rejected",
                state.metrics.actions_executed,
                state.metrics.actions_denied,
                state.metrics.actions_rejected
            );
            println!("Success rate: {:.2}", state.metrics.success_rate());
            println!(
                "Ethics:       {} evaluations, {} blocked",
                state.ethics.total_evaluations, state.ethics.blocked
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

/// Evaluate one action against the policy engine and print the verdict
pub fn handle_evaluate(
    config: &Config,
    verb: &str,
    category: &str,
    executor: Option<String>,
    params: Option<String>,
    format: OutputFormat,
) -> Result<EthicalEvaluation> {
    let category: ActionCategory = serde_json::from_value(json!(category))
        .with_context(|| format!("Unknown action category: {}", category))?;

    let mut action = Action::new(category, verb);
    if let Some(executor) = executor {
        action = action.with_executor(executor);
    }
    if let Some(raw) = params {
        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&raw).context("--params must be a JSON object")?;
        for (key, value) in parsed {
            action = action.with_param(key, value);
        }
    }

    let engine = EthicsEngine::new(&config.ethics, Arc::new(SystemClock))?;
    let ctx = DecisionContext::new(config.autonomy.planning_horizon_ms);
    let evaluation = engine.evaluate(&config.agent_profile(), &action, &ctx)?;

    match format {
        OutputFormat::Text => {
            if evaluation.allowed {
                println!("✓ '{}' allowed (confidence {:.2})", verb, evaluation.confidence);
            } else {
                println!("✗ '{}' blocked (confidence {:.2})", verb, evaluation.confidence);
            }

            if !evaluation.violations.is_empty() {
                println!();
                println!("Violations:");
                for v in &evaluation.violations {
                    println!(
                        "  [{:?}] {} ({}): {}",
                        v.severity, v.constraint_id, v.principle_id, v.description
                    );
                }
            }
            if !evaluation.required_approvals.is_empty() {
                println!();
                println!("Required approvals: {:?}", evaluation.required_approvals);
            }
            if !evaluation.recommendations.is_empty() {
                println!();
                println!("Recommendations:");
                for r in &evaluation.recommendations {
                    println!("  - {}", r);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "action": action,
                "evaluation": evaluation,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(evaluation)
}

/// Show the daily phase schedule
pub fn handle_phases(format: OutputFormat) -> Result<()> {
    let schedule = PhaseSchedule::default_day();
    let phases: Vec<_> = schedule.phases().collect();

    match format {
        OutputFormat::Text => {
            println!("Daily schedule ({} phases):", phases.len());
            println!();
            for phase in &phases {
                println!(
                    "  {:02}:00-{:02}:00  {:<20} priority {:.1}{}",
                    phase.start_hour,
                    phase.end_hour,
                    phase.name,
                    phase.priority,
                    if phase.can_interrupt {
                        ""
                    } else {
                        "  (no interruptions)"
                    }
                );
                println!("               {}", phase.activities.join(", "));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&phases)?);
        }
    }

    Ok(())
}

/// List the built-in behaviors
pub fn handle_behaviors(format: OutputFormat) -> Result<()> {
    let mut registry = crate::autonomy::BehaviorRegistry::new();
    for behavior in default_behaviors() {
        registry.register(behavior);
    }
    let behaviors = registry.list();

    match format {
        OutputFormat::Text => {
            for b in &behaviors {
                println!(
                    "  {:<24} priority {:.1}  cooldown {}s  trigger {}",
                    b.id,
                    b.priority,
                    b.cooldown_ms / 1000,
                    serde_json::to_string(&b.trigger)?
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&behaviors)?);
        }
    }

    Ok(())
}

/// Validate configuration and summarize it
///
/// The configuration has already been loaded and validated by the time
/// this runs; the checks here report on what it contains.
pub fn handle_doctor(config: &Config, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut checks: Vec<(&str, String)> = Vec::new();
    let mut issues = Vec::new();

    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    if path.exists() {
        checks.push(("Config file", path.display().to_string()));
    } else {
        checks.push(("Config file", "Not found, using defaults".to_string()));
    }
    checks.push(("Configuration", "Valid".to_string()));

    if config.autonomy.enabled {
        checks.push(("Autonomy", "Enabled".to_string()));
    } else {
        checks.push(("Autonomy", "Disabled".to_string()));
        issues.push("Autonomy is disabled; 'mindloop run' will not start the loop".to_string());
    }

    match EthicsEngine::new(&config.ethics, Arc::new(SystemClock)) {
        Ok(engine) => {
            if engine.is_enabled() {
                checks.push((
                    "Ethics engine",
                    format!(
                        "{} principles, {} constraints, {:?}",
                        engine.principles().len(),
                        engine.constraints().len(),
                        engine.intervention_level()
                    ),
                ));
            } else {
                checks.push(("Ethics engine", "Disabled".to_string()));
                issues.push("Ethics engine is disabled; every action will be allowed".to_string());
            }
        }
        Err(e) => {
            checks.push(("Ethics engine", "Failed".to_string()));
            issues.push(format!("Cannot build ethics engine: {}", e));
        }
    }

    if !config.autonomy.ethical_constraints {
        issues.push("Actions bypass the policy gate (ethical_constraints = false)".to_string());
    }

    let drivers = config.curiosity.drivers.iter().filter(|d| d.enabled).count();
    checks.push(("Curiosity drivers", format!("{} enabled", drivers)));
    if drivers == 0 && config.autonomy.goal_generation_enabled {
        issues.push("No curiosity drivers enabled; emergent goals will never be generated".to_string());
    }

    match format {
        OutputFormat::Text => {
            println!("Mindloop Doctor");
            println!();
            for (name, status) in &checks {
                println!("  {:<20} {}", name, status);
            }
            println!();
            if issues.is_empty() {
                println!("✓ No issues found");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
