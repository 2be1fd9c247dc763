//! Basic video generation example.
//!
//! Run with: `cargo run --example generate_video`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use std::sync::Arc;
use wealthgenius::{CredentialGate, EnvKeySelector, GenerationRequest, JobPoller, VeoBackend};

#[tokio::main]
async fn main() -> wealthgenius::Result<()> {
    let backend = VeoBackend::builder().build()?;
    let store = backend.credentials().clone();
    let gate = CredentialGate::new(Arc::new(EnvKeySelector::new(store.clone())));
    let poller = JobPoller::builder(Arc::new(backend), gate, store).build();

    let request = GenerationRequest::advisor("explain IUL tax benefits");

    println!("Generating video (this may take a few minutes)...");
    let video = poller
        .generate(&request, &|msg: &str| println!("  {msg}"))
        .await?;

    video.save("output.mp4")?;
    println!(
        "Generated video: {} bytes after {} polls",
        video.size(),
        video.metadata.polls
    );

    Ok(())
}
