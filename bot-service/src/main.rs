mod telegram;
mod webhook;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use shared::{CatalogConfig, WorkflowConfig};
use teloxide::prelude::*;
use webhook::AppState;
use workflow_service::{Dispatcher as WorkflowDispatcher, StepEngine, WorkflowStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let metrics_port: u16 = env::var("METRICS_PORT")
        .unwrap_or_else(|_| "9091".to_string())
        .parse()?;

    shared::init_tracing("bot-service")?;
    shared::init_metrics(metrics_port)?;

    tracing::info!("Starting Bot Service...");

    let workflow_config = WorkflowConfig::from_env()?;
    let catalog = CatalogConfig::from_env()?;

    let http_port: u16 = env::var("HTTP_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;
    let bot_token = env::var("TELOXIDE_TOKEN").ok().filter(|t| !t.trim().is_empty());
    let enable_telegram_polling = env::var("ENABLE_TELEGRAM_POLLING")
        .unwrap_or_else(|_| "true".to_string())
        .to_lowercase() == "true";

    tracing::info!("Configuration:");
    tracing::info!("  HTTP Port: {}", http_port);
    tracing::info!("  Telegram Polling Enabled: {}", enable_telegram_polling);
    tracing::info!(
        "  Duplicate Request Interval: {}ms",
        workflow_config.duplicate_request_interval_ms
    );
    tracing::info!("  Confirmation Step: {}", workflow_config.require_confirmation);
    tracing::info!(
        "  Catalog: {} persons, {} categories, {} payment methods",
        catalog.persons.len(),
        catalog.expense_categories.len(),
        catalog.payment_configs.len()
    );

    let store = Arc::new(WorkflowStore::new(workflow_config.duplicate_request_interval_ms));
    let engine = Arc::new(StepEngine::new(Arc::new(catalog), &workflow_config));
    let workflow = Arc::new(WorkflowDispatcher::new(store, engine));

    let http_handle = tokio::spawn(run_http_server(workflow.clone(), http_port));

    match bot_token {
        Some(token) if enable_telegram_polling => {
            let bot_handle = tokio::spawn(run_telegram_bot(Bot::new(token), workflow));

            tracing::info!("Bot Service is running");
            tracing::info!("  - Telegram bot: Active (POLLING)");
            tracing::info!("  - HTTP server: http://0.0.0.0:{}", http_port);

            tokio::select! {
                result = bot_handle => {
                    if let Err(e) = result {
                        tracing::error!("Telegram bot task failed: {}", e);
                    }
                }
                result = http_handle => {
                    if let Err(e) = result {
                        tracing::error!("HTTP server task failed: {}", e);
                    }
                }
            }
        }
        _ => {
            tracing::info!("Bot Service is running");
            tracing::info!("  - Telegram bot: Disabled");
            tracing::info!("  - HTTP server: http://0.0.0.0:{}", http_port);

            if let Err(e) = http_handle.await {
                tracing::error!("HTTP server task failed: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_telegram_bot(bot: Bot, workflow: Arc<WorkflowDispatcher>) {
    tracing::info!("Starting Telegram bot...");

    loop {
        match bot.get_me().await {
            Ok(me) => {
                tracing::info!("Bot username: @{}", me.username());
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to get bot info (will retry): {}", e);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(
            |bot: Bot, msg: Message, workflow: Arc<WorkflowDispatcher>| async move {
                telegram::handlers::handle_message(bot, msg, workflow)
                    .await
                    .map_err(|e| {
                        tracing::error!("Message handler error: {}", e);
                        e
                    })
            },
        ))
        .branch(Update::filter_callback_query().endpoint(
            |bot: Bot, q: CallbackQuery, workflow: Arc<WorkflowDispatcher>| async move {
                telegram::handlers::handle_callback_query(bot, q, workflow)
                    .await
                    .map_err(|e| {
                        tracing::error!("Callback query handler error: {}", e);
                        e
                    })
            },
        ));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![workflow])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn run_http_server(workflow: Arc<WorkflowDispatcher>, port: u16) {
    tracing::info!("Starting HTTP server on port {}...", port);

    let app = webhook::router(AppState { workflow });

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => {
            tracing::info!("HTTP server listening on port {}", port);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind HTTP server: {}", e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
