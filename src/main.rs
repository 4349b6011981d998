use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use stable_router::config::AppConfig;
use stable_router::router::PaymentRouter;
use stable_router::venues::{Account, SnapshotVenue, Token};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal router error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let demo = &config.demo;

    let venue = Arc::new(
        SnapshotVenue::load(&demo.snapshot_path)
            .with_context(|| format!("load snapshot {}", demo.snapshot_path.display()))?,
    );
    let router = PaymentRouter::new(venue.clone(), venue.clone(), &config.router);

    let from = Token::new(demo.from.as_str());
    let to = Token::new(demo.to.as_str());
    let amount = demo.amount as u128;

    info!(
        from = %from,
        to = %to,
        amount = amount,
        max_hops = config.router.max_hops,
        "quoting payment route"
    );

    let Some(route) = router
        .quote(&from, &to, amount, None)
        .await
        .context("find best route")?
    else {
        println!(
            "{}",
            json!({ "route": null, "reason": "no route within hop limit" })
        );
        return Ok(());
    };
    println!("{}", serde_json::to_string_pretty(&route)?);

    if !demo.execute {
        return Ok(());
    }

    let sender = Account::new(
        demo.sender
            .as_deref()
            .ok_or_else(|| anyhow!("sender is required to execute"))?,
    );
    let recipient = Account::new(
        demo.recipient
            .as_deref()
            .ok_or_else(|| anyhow!("recipient is required to execute"))?,
    );

    match router.executor().execute_route(&route, &sender, &recipient).await {
        Ok(transactions) => {
            println!("{}", json!({ "status": "completed", "transactions": transactions }));
        }
        Err(failure) => {
            println!(
                "{}",
                json!({
                    "status": "failed",
                    "hop": failure.hop,
                    "stage": failure.stage,
                    "committed": failure.committed,
                    "error": failure.cause.to_string(),
                })
            );
            return Err(anyhow!(failure).context("execute route"));
        }
    }

    let stats = router.stats();
    info!(
        total_executions = stats.total_executions,
        completed = stats.completed_executions,
        failed = stats.failed_executions,
        "execution statistics"
    );
    Ok(())
}

fn init_tracing() -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
