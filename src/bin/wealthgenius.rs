//! CLI for the WealthGenius video studio.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wealthgenius::{
    ApiKey, CredentialGate, CredentialStore, EnvKeySelector, GeneratedVideo, GenerationRequest,
    JobPoller, KeySelector, PromptKeySelector, VeoBackend, VeoModel, VideoBackend,
};

#[derive(Parser)]
#[command(name = "wealthgenius")]
#[command(about = "Generate financial-education videos with Veo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gemini API key (prompted for when missing)
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Never prompt; fail if no key is available
    #[arg(long, global = true)]
    no_prompt: bool,

    /// Veo model
    #[arg(long, global = true, value_enum, default_value = "fast")]
    model: ModelArg,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a video explaining a topic
    Video(VideoArgs),

    /// Check that the API key can reach the Veo model
    CheckKey,
}

#[derive(Args)]
struct VideoArgs {
    /// Topic for the advisor to explain
    topic: String,

    /// Output file path
    #[arg(short, long, default_value = "wealthgenius.mp4")]
    output: PathBuf,

    /// Send the topic as the prompt instead of the advisor template
    #[arg(long)]
    raw_prompt: bool,

    /// Resolution (e.g., 1080p, 720p)
    #[arg(long, default_value = "1080p")]
    resolution: String,

    /// Aspect ratio (e.g., 16:9)
    #[arg(long, default_value = "16:9")]
    aspect_ratio: String,

    /// Seconds between status polls
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Minutes to wait for the job (0 waits forever)
    #[arg(long, default_value_t = 30)]
    max_wait: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Fast,
    Full,
}

impl From<ModelArg> for VeoModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Fast => VeoModel::Veo31FastPreview,
            ModelArg::Full => VeoModel::Veo31Preview,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = CredentialStore::new();
    if let Some(key) = cli.api_key.clone().and_then(ApiKey::new) {
        store.set(key);
    }
    let selector: Arc<dyn KeySelector> = if cli.no_prompt {
        Arc::new(EnvKeySelector::new(store.clone()))
    } else {
        Arc::new(PromptKeySelector::new(store.clone()))
    };
    let gate = CredentialGate::new(selector);

    let backend = VeoBackend::builder()
        .credentials(store.clone())
        .model(cli.model.into())
        .build()?;

    match cli.command {
        Commands::Video(args) => generate_video(args, backend, gate, store, cli.json).await,
        Commands::CheckKey => check_key(backend, gate, cli.json).await,
    }
}

async fn generate_video(
    args: VideoArgs,
    backend: VeoBackend,
    gate: CredentialGate,
    store: CredentialStore,
    json_output: bool,
) -> anyhow::Result<()> {
    let request = if args.raw_prompt {
        GenerationRequest::new(&args.topic)
    } else {
        GenerationRequest::advisor(&args.topic)
    }
    .with_resolution(&args.resolution)
    .with_aspect_ratio(&args.aspect_ratio);

    let builder = JobPoller::builder(Arc::new(backend), gate, store.clone())
        .poll_interval(Duration::from_secs(args.poll_interval));
    let poller = match wait_budget(args.max_wait) {
        Some(max_wait) => builder.max_wait(max_wait),
        None => builder.unbounded(),
    }
    .build();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let progress = |msg: &str| eprintln!("[wealthgenius] {msg}");

    // A rejected key reopens selection inside the poller; give the new key
    // one more attempt. Without a new key a retry would be rejected again.
    let before = store.get();
    let video = match poller.generate_with_cancel(&request, &progress, &cancel).await {
        Err(err) if err.credential_rejected() && key_changed(before.as_ref(), &store) => {
            eprintln!("[wealthgenius] {err}; retrying with the newly selected key");
            poller
                .generate_with_cancel(&request, &progress, &cancel)
                .await?
        }
        other => other?,
    };

    video.save(&args.output)?;
    report_video(&video, &args.output, json_output)
}

/// Converts `--max-wait` minutes into the poller's budget; 0 means unbounded.
fn wait_budget(minutes: u64) -> Option<Duration> {
    (minutes > 0).then(|| Duration::from_secs(minutes.saturating_mul(60)))
}

fn key_changed(before: Option<&ApiKey>, store: &CredentialStore) -> bool {
    store.get().as_ref() != before
}

fn report_video(
    video: &GeneratedVideo,
    output: &std::path::Path,
    json_output: bool,
) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "type": "video",
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": video.size(),
            "mime_type": video.mime_type,
            "model": video.metadata.model,
            "job": video.metadata.job,
            "polls": video.metadata.polls,
            "duration_ms": video.metadata.duration_ms,
            "resolution": video.metadata.resolution,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated video: {} ({} bytes)",
            output.display(),
            video.size()
        );
        if let Some(duration) = video.metadata.duration_ms {
            println!("Generation time: {}ms", duration);
        }
    }
    Ok(())
}

async fn check_key(
    backend: VeoBackend,
    gate: CredentialGate,
    json_output: bool,
) -> anyhow::Result<()> {
    gate.ensure_credential().await?;

    let outcome = backend.check_key().await;
    if let Err(err) = &outcome {
        if err.is_credential_rejected() {
            if let Err(reselect) = gate.force_reselect().await {
                tracing::warn!("key reselection failed: {reselect}");
            }
        }
    }

    if json_output {
        let result = serde_json::json!({
            "model": backend.model(),
            "valid": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match &outcome {
            Ok(()) => println!("API key OK for {}", backend.model()),
            Err(err) => println!("API key check failed: {err}"),
        }
    }

    outcome?;
    Ok(())
}
