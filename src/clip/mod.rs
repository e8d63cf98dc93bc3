//! CLIP (Contrastive Language-Image Pre-training) image embeddings
//!
//! - Preprocessing to the ViT-B/32 input layout
//! - Visual encoder behind the `ImageEncoder` seam (ONNX Runtime when built
//!   with the `onnx` feature)
//! - Model file cache and download
//! - L2 normalization of the raw feature vector

mod download;
mod embedding;
mod model;
mod preprocess;

pub use download::ensure_model;
pub use embedding::{l2_normalize, zero_embedding, ClipEmbedding, EMBEDDING_DIM};
pub use model::{EncoderLoader, ImageEncoder};
#[cfg(feature = "onnx")]
pub use model::{OnnxClipEncoder, OnnxClipLoader};
pub use preprocess::{load_image, preprocess_image, INPUT_SIZE};
