use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::EmbedError;

/// Path of the cached model, downloading it first if needed.
pub fn ensure_model(config: &ModelConfig) -> Result<PathBuf> {
    let model_path = config.model_path();
    if model_path.exists() {
        return Ok(model_path);
    }

    if !config.auto_download {
        return Err(EmbedError::ModelUnavailable { path: model_path }.into());
    }

    std::fs::create_dir_all(&config.models_dir)
        .with_context(|| format!("Failed to create models directory {:?}", config.models_dir))?;

    tracing::info!(model = %config.name, url = %config.url, "Downloading CLIP model...");
    let timeout = Duration::from_secs(config.download_timeout_secs.max(1));
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .build();
    let response = agent
        .get(&config.url)
        .call()
        .map_err(|e| anyhow!("Failed to download model: {}", e))?;

    // Stream into a side file so an interrupted download is never picked up
    let partial = model_path.with_extension("onnx.part");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {:?}", partial))?;
    std::io::copy(&mut response.into_reader(), &mut file)
        .context("Failed to write model file")?;
    drop(file);
    std::fs::rename(&partial, &model_path)?;

    tracing::info!(model = %config.name, path = ?model_path, "CLIP model downloaded");
    Ok(model_path)
}
