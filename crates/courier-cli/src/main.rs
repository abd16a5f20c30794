//! courier demo driver.
//!
//! Wires a DispatchService to a scripted automation API, sends a batch
//! through the UI-side client and prints every ADD_LOG it receives.
//!
//! Usage: `courier-cli [batch.json]` where the batch is
//! `{"contacts": [...], "text": "...", "attachment"?: {...}, "buttons"?: [...], "delay_ms"?: n}`.
//! Attachment `source` is a local file path.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use courier_core::Config;
use courier_core::app::{DispatchClient, ServiceBuilder};
use courier_core::domain::{LogLevel, MessageContent, SendRequest};
use courier_core::impls::{InMemoryKvStore, ScriptedAutomation};
use courier_core::ports::{ApiError, AttachmentFetcher};
use courier_core::rpc::RpcBus;

#[derive(Debug, Deserialize)]
struct Batch {
    contacts: Vec<String>,
    #[serde(flatten)]
    message: MessageContent,
    #[serde(default)]
    delay_ms: Option<u64>,
}

/// Reads attachment bytes from the local filesystem.
struct LocalFileFetcher;

#[async_trait]
impl AttachmentFetcher for LocalFileFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>, ApiError> {
        tokio::fs::read(source)
            .await
            .map_err(|e| ApiError::Other(format!("read {source}: {e}")))
    }
}

fn demo_batch() -> Batch {
    Batch {
        // the second number is stored without the mobile digit; the third does not exist
        contacts: vec![
            "5511988887777".to_string(),
            "551177776666".to_string(),
            "5511900000000".to_string(),
        ],
        message: MessageContent::text("Hello from courier"),
        delay_ms: Some(500),
    }
}

fn scripted_api(batch: &Batch, demo: bool) -> ScriptedAutomation {
    let api = ScriptedAutomation::new()
        .with_ack_delay(Duration::from_millis(300))
        .failing_not_ready(2);
    if demo {
        api.with_contact("5511988887777").with_contact("5511977776666")
    } else {
        batch
            .contacts
            .iter()
            .fold(api, |api, contact| api.with_contact(contact.clone()))
    }
}

async fn load_batch(path: Option<String>) -> Result<(Batch, bool)> {
    let Some(path) = path else {
        return Ok((demo_batch(), true));
    };
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading batch file {path}"))?;
    let batch: Batch =
        serde_json::from_str(&raw).with_context(|| format!("parsing batch file {path}"))?;
    Ok((batch, false))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let config = Config::from_env();
    info!(
        rpc_timeout_ms = config.rpc_timeout.as_millis() as u64,
        ready_timeout_ms = config.ready_timeout.as_millis() as u64,
        max_retries = config.retry.max_retries,
        mobile_country_code = %config.mobile_country_code,
        "config_loaded"
    );

    let (batch, demo) = load_batch(std::env::args().nth(1)).await?;
    let bus = RpcBus::new(config.bus_capacity);

    let service = ServiceBuilder::new(config.clone())
        .bus(bus.clone())
        .automation(Arc::new(scripted_api(&batch, demo)))
        .kv_store(Arc::new(InMemoryKvStore::new()))
        .fetcher(Arc::new(LocalFileFetcher))
        .build()
        .await
        .context("building dispatch service")?;

    let client = DispatchClient::connect(&bus, config.rpc_timeout);
    client
        .on_log(|event| {
            let tag = match event.level {
                LogLevel::Error => "ERROR",
                LogLevel::Warning => "WARN",
                LogLevel::Success => "OK",
            };
            let clip = if event.attachment { " [attachment]" } else { "" };
            println!("[{tag}] {}{clip}: {}", event.contact, event.message);
        })
        .await?;

    // the automation API finishes booting on its own schedule
    let gate = service.gate().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        gate.signal_ready();
    });

    let mut queued = 0u64;
    for contact in &batch.contacts {
        let mut request = SendRequest::new(contact.clone(), batch.message.clone());
        request.delay_ms = batch.delay_ms;
        match client.send_message(request).await {
            Ok(true) => {
                queued += 1;
                info!(%contact, "queued");
            }
            Ok(false) => warn!(%contact, "not queued"),
            Err(e) => warn!(%contact, error = %e, "send request failed"),
        }
    }

    let drained = async {
        loop {
            match client.status().await {
                Ok(status) if status.succeeded + status.failed >= queued => return Ok(status),
                Ok(_) => tokio::time::sleep(Duration::from_millis(250)).await,
                Err(e) => return Err(e),
            }
        }
    };

    tokio::select! {
        status = drained => {
            let status = status.context("polling queue status")?;
            info!(succeeded = status.succeeded, failed = status.failed, "batch finished");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping queue");
            client.stop().await?;
        }
    }

    client.shutdown().await;
    service.shutdown().await;
    Ok(())
}
