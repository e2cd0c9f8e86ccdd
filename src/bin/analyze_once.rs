//! Run a single analysis from the command line and print the decision as JSON.
//!
//! Usage: `analyze_once <location> <condition[,condition...]> [light|moderate|intense]`
//!
//! Pass `""` as the location to use the configured default.

use anyhow::Context;
use dotenvy::dotenv;
use std::env;

use aq_verdict_api::config::Config;
use aq_verdict_api::models::{ActivityLevel, Condition, HealthProfile};
use aq_verdict_api::orchestrator::DecisionOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        anyhow::bail!(
            "usage: analyze_once <location> <condition[,condition...]> [light|moderate|intense]"
        );
    }

    let conditions = args[1]
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            serde_json::from_value::<Condition>(serde_json::Value::String(c.to_string()))
                .with_context(|| format!("unknown condition '{}'", c))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let activity = match args.get(2) {
        Some(level) => {
            serde_json::from_value::<ActivityLevel>(serde_json::Value::String(level.to_lowercase()))
                .with_context(|| format!("unknown activity level '{}'", level))?
        }
        None => ActivityLevel::default(),
    };

    let profile = HealthProfile::new(conditions, None, activity)?;

    let config = Config::from_env()?;
    let orchestrator = DecisionOrchestrator::from_config(&config)?;

    tracing::info!("Analyzing '{}'", args[0]);
    let decision = orchestrator.analyze(&args[0], &profile).await;

    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}
