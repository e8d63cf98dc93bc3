//! CLIP visual encoder

use anyhow::Result;
use ndarray::Array4;

/// Turns a preprocessed `[1, 3, 224, 224]` tensor into a raw feature vector.
pub trait ImageEncoder {
    fn encode(&mut self, pixels: Array4<f32>) -> Result<Vec<f32>>;
}

/// Deferred encoder construction.
///
/// Loading may download weights and create a runtime session, so it runs
/// inside the guarded processing path rather than at startup.
pub trait EncoderLoader {
    fn load(&self) -> Result<Box<dyn ImageEncoder>>;
}

#[cfg(feature = "onnx")]
mod onnx {
    use anyhow::{anyhow, Result};
    use ndarray::Array4;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use std::path::Path;

    use super::{EncoderLoader, ImageEncoder};
    use crate::clip::{ensure_model, INPUT_SIZE};
    use crate::config::ModelConfig;
    use crate::error::EmbedError;

    const INPUT_NAME: &str = "pixel_values";
    const OUTPUT_NAME: &str = "image_embeds";

    /// ViT-B/32 visual tower running on ONNX Runtime
    pub struct OnnxClipEncoder {
        session: Session,
    }

    impl OnnxClipEncoder {
        pub fn from_file(model_path: &Path, intra_threads: usize) -> Result<Self> {
            tracing::info!(path = ?model_path, "Loading CLIP visual encoder");

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(intra_threads.max(1))?
                .commit_from_file(model_path)
                .map_err(|e| anyhow!("Failed to load CLIP model {:?}: {}", model_path, e))?;

            Ok(Self { session })
        }
    }

    impl ImageEncoder for OnnxClipEncoder {
        fn encode(&mut self, pixels: Array4<f32>) -> Result<Vec<f32>> {
            let size = INPUT_SIZE as usize;
            let (data, _offset) = pixels.into_raw_vec_and_offset();

            let input_tensor =
                Tensor::from_array(([1usize, 3, size, size], data.into_boxed_slice()))?;

            let outputs = self.session.run(ort::inputs![INPUT_NAME => input_tensor])?;

            // Projected embeddings when the export names them, else whatever comes first
            let embedding_output = outputs
                .iter()
                .find(|(name, _)| *name == OUTPUT_NAME)
                .or_else(|| outputs.iter().next())
                .ok_or(EmbedError::NoOutput)?;

            let (_shape, embedding_data) = embedding_output.1.try_extract_tensor::<f32>()?;
            tracing::debug!(len = embedding_data.len(), "CLIP visual encoder output");

            Ok(embedding_data.to_vec())
        }
    }

    /// Loads the configured checkpoint, downloading it on first use.
    pub struct OnnxClipLoader {
        config: ModelConfig,
    }

    impl OnnxClipLoader {
        pub fn new(config: ModelConfig) -> Self {
            Self { config }
        }
    }

    impl EncoderLoader for OnnxClipLoader {
        fn load(&self) -> Result<Box<dyn ImageEncoder>> {
            let model_path = ensure_model(&self.config)?;
            let encoder = OnnxClipEncoder::from_file(&model_path, self.config.intra_threads)?;
            Ok(Box::new(encoder))
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::{OnnxClipEncoder, OnnxClipLoader};
