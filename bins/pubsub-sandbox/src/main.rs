use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use pubsub_api::{CancellationToken, CodecError, Payload, PublishOptions, ReceiveOptions};
use pubsub_emulator::Emulator;
use pubsub_engine::{Message, PubSub, PubSubConfig};
use pubsub_reactor::LogReactor;

#[derive(Parser)]
#[command(name = "pubsub-sandbox", about = "Publish and receive against an in-process broker emulator")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "pubsub.toml", env = "PUBSUB_SANDBOX_CONFIG")]
    config: String,

    /// Topic to publish `--message` values to.
    #[arg(long)]
    topic: Option<String>,

    /// Message to publish; repeat for several.
    #[arg(long = "message")]
    messages: Vec<String>,

    /// Parse messages as JSON records (required for schema topics).
    #[arg(long)]
    json: bool,

    /// Subscription to receive from until Ctrl+C or `--count`.
    #[arg(long)]
    subscription: Option<String>,

    /// Stop receiving after this many messages.
    #[arg(long)]
    count: Option<usize>,
}

fn payload(text: &str, json: bool) -> Result<Payload, serde_json::Error> {
    if json {
        serde_json::from_str(text).map(Payload::Record)
    } else {
        Ok(Payload::from(text))
    }
}

fn log_message(message: &Message) {
    let mut record = Payload::record_target();
    match message.decode(&mut record) {
        Ok(()) => tracing::info!(id = %message.id(), payload = ?record, "received"),
        Err(CodecError::NoSchema) => tracing::info!(
            id = %message.id(),
            data = %String::from_utf8_lossy(message.data()),
            "received"
        ),
        Err(e) => tracing::warn!(id = %message.id(), error = %e, "received undecodable message"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config, "loading configuration");
    let config = match PubSubConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let emulator = Emulator::new(&config.project.id);
    emulator.add_reactor(Arc::new(LogReactor));

    tracing::info!(
        topics = config.topics.len(),
        subscriptions = config.subscriptions.len(),
        "bootstrapping pubsub"
    );
    let pubsub = match PubSub::bootstrap(config, &emulator, Arc::new(emulator.clone())).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to bootstrap pubsub");
            std::process::exit(1);
        }
    };

    if let Err(e) = pubsub.prepare().await {
        tracing::error!(error = %e, "failed to prepare resources");
        std::process::exit(1);
    }

    for (probe, result) in pubsub.check_health().await {
        if result.success {
            tracing::info!(probe = %probe, message = %result.message, "healthy");
        } else {
            tracing::warn!(probe = %probe, message = %result.message, "unhealthy");
        }
    }

    if let Some(topic) = &cli.topic {
        for text in &cli.messages {
            let data = match payload(text, cli.json) {
                Ok(d) => d,
                Err(e) => {
                    tracing::error!(error = %e, message = %text, "invalid JSON message");
                    std::process::exit(1);
                }
            };
            let published = match pubsub.publisher().publish(topic, &data, &PublishOptions::new()).await {
                Ok(result) => result.get().await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match published {
                Ok(id) => tracing::info!(topic = %topic, id = %id, "published"),
                Err(e) => tracing::error!(topic = %topic, error = %e, "publish failed"),
            }
        }
    }

    if let Some(subscription) = &cli.subscription {
        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutting down...");
                    cancel.cancel();
                }
            });
        }

        tracing::info!(subscription = %subscription, "receiving, press Ctrl+C to stop");
        let received = Arc::new(AtomicUsize::new(0));
        let limit = cli.count;
        let stop = cancel.clone();
        let result = pubsub
            .subscriber()
            .subscribe(cancel, subscription, &ReceiveOptions::new(), move |message| {
                let received = Arc::clone(&received);
                let stop = stop.clone();
                async move {
                    log_message(&message);
                    message.ack();
                    let n = received.fetch_add(1, Ordering::Relaxed) + 1;
                    if limit.is_some_and(|limit| n >= limit) {
                        stop.cancel();
                    }
                }
            })
            .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "receive failed");
        }
    }

    pubsub.shutdown().await;
}
