//! Image path in, result document out.

use anyhow::{anyhow, Result};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::clip::{l2_normalize, load_image, preprocess_image, ClipEmbedding, EncoderLoader};
use crate::config::Config;
use crate::output::ImageDescription;
use crate::runtime::{self, Availability};

/// Whether inference can run in this process.
pub enum Backend {
    Unavailable { reason: String },
    Available(Box<dyn EncoderLoader>),
}

impl Backend {
    /// Look for ONNX Runtime and wire up the CLIP loader when found.
    pub fn from_config(config: &Config) -> Self {
        match runtime::detect(&config.runtime) {
            Availability::Available { library } => {
                runtime::activate(&library);
                Self::onnx(config)
            }
            Availability::Missing { reason } => {
                tracing::warn!(
                    "ONNX Runtime not available ({}). Install onnxruntime or set ORT_DYLIB_PATH \
                     to enable CLIP embeddings",
                    reason
                );
                Backend::Unavailable { reason }
            }
        }
    }

    #[cfg(feature = "onnx")]
    fn onnx(config: &Config) -> Self {
        Backend::Available(Box::new(crate::clip::OnnxClipLoader::new(
            config.model.clone(),
        )))
    }

    #[cfg(not(feature = "onnx"))]
    fn onnx(_config: &Config) -> Self {
        Backend::Unavailable {
            reason: "built without the `onnx` feature".to_string(),
        }
    }
}

pub struct ImageProcessor {
    backend: Backend,
}

impl ImageProcessor {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Backend::from_config(config))
    }

    /// Describe one image. Never fails: problems become an error-shaped
    /// document with a zero embedding.
    pub fn process(&self, path: &Path) -> ImageDescription {
        let loader = match &self.backend {
            Backend::Unavailable { reason } => {
                tracing::debug!(path = ?path, reason = %reason, "Returning placeholder");
                return ImageDescription::placeholder(path);
            }
            Backend::Available(loader) => loader.as_ref(),
        };

        match self.embed_guarded(loader, path) {
            Ok(embedding) => ImageDescription::described(path, embedding),
            Err(e) => {
                tracing::error!(path = ?path, "Failed to process image: {:#}", e);
                ImageDescription::failed(&format!("{:#}", e))
            }
        }
    }

    fn embed_guarded(&self, loader: &dyn EncoderLoader, path: &Path) -> Result<ClipEmbedding> {
        // The runtime binding panics on some load failures; those still get a document
        match panic::catch_unwind(AssertUnwindSafe(|| self.embed(loader, path))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "inference panicked".to_string());
                Err(anyhow!(message))
            }
        }
    }

    fn embed(&self, loader: &dyn EncoderLoader, path: &Path) -> Result<ClipEmbedding> {
        // Decode first so a bad path never triggers a model download
        let img = load_image(path)?;
        let pixels = preprocess_image(&img);

        let mut encoder = loader.load()?;
        let raw = encoder.encode(pixels)?;

        Ok(l2_normalize(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ImageEncoder;
    use ndarray::Array4;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Mean of each channel, tiled to `dim`, so output depends on the pixels.
    struct ChannelMeanEncoder {
        dim: usize,
    }

    impl ImageEncoder for ChannelMeanEncoder {
        fn encode(&mut self, pixels: Array4<f32>) -> Result<Vec<f32>> {
            assert_eq!(pixels.shape(), &[1, 3, 224, 224]);
            let means: Vec<f32> = (0..3)
                .map(|c| pixels.slice(ndarray::s![0, c, .., ..]).mean().unwrap_or(0.0))
                .collect();
            Ok((0..self.dim).map(|i| means[i % 3] + i as f32 * 0.01).collect())
        }
    }

    struct FakeLoader {
        dim: usize,
        loads: Rc<Cell<usize>>,
    }

    impl EncoderLoader for FakeLoader {
        fn load(&self) -> Result<Box<dyn ImageEncoder>> {
            self.loads.set(self.loads.get() + 1);
            Ok(Box::new(ChannelMeanEncoder { dim: self.dim }))
        }
    }

    struct PanickingLoader;

    impl EncoderLoader for PanickingLoader {
        fn load(&self) -> Result<Box<dyn ImageEncoder>> {
            panic!("failed to load onnxruntime");
        }
    }

    fn processor_with(dim: usize) -> (ImageProcessor, Rc<Cell<usize>>) {
        let loads = Rc::new(Cell::new(0));
        let loader = FakeLoader {
            dim,
            loads: loads.clone(),
        };
        (
            ImageProcessor::new(Backend::Available(Box::new(loader))),
            loads,
        )
    }

    fn write_png(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("gradient.png");
        let img = image::RgbImage::from_fn(320, 240, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_unavailable_backend_returns_placeholder_without_reading() {
        let processor = ImageProcessor::new(Backend::Unavailable {
            reason: "test".to_string(),
        });
        let doc = processor.process(Path::new("/does/not/exist.jpg"));

        assert_eq!(doc.caption, "Image: /does/not/exist.jpg");
        assert_eq!(doc.embedding, vec![0.0; 512]);
    }

    #[test]
    fn test_valid_image_gives_unit_embedding() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path());
        let (processor, loads) = processor_with(512);

        let doc = processor.process(&path);

        assert_eq!(doc.caption, format!("Image from {}", path.display()));
        assert_eq!(doc.embedding.len(), 512);
        let norm: f32 = doc.embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {}", norm);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_missing_file_gives_error_document() {
        let dir = tempdir().unwrap();
        let (processor, loads) = processor_with(512);

        let doc = processor.process(&dir.path().join("missing.jpg"));

        assert!(doc.caption.starts_with("Error processing image:"));
        assert!(doc.caption.contains("missing.jpg"));
        assert_eq!(doc.embedding, vec![0.0; 512]);
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn test_undecodable_file_gives_error_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let (processor, _) = processor_with(512);

        let doc = processor.process(&path);
        assert!(doc.caption.starts_with("Error processing image:"));
        assert_eq!(doc.embedding, vec![0.0; 512]);
    }

    #[test]
    fn test_wrong_dimension_gives_error_document() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path());
        let (processor, _) = processor_with(768);

        let doc = processor.process(&path);
        assert_eq!(
            doc.caption,
            "Error processing image: Embedding has 768 dimensions, expected 512"
        );
        assert_eq!(doc.embedding.len(), 512);
    }

    #[test]
    fn test_panicking_runtime_gives_error_document() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path());
        let processor = ImageProcessor::new(Backend::Available(Box::new(PanickingLoader)));

        let doc = processor.process(&path);
        assert_eq!(
            doc.caption,
            "Error processing image: failed to load onnxruntime"
        );
        assert_eq!(doc.embedding, vec![0.0; 512]);
    }
}
