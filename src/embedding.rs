//! Embedding provider integration.
//!
//! The model itself is opaque: anything implementing [`EmbeddingModel`] can be
//! plugged in through a [`ModelLoader`]. [`EmbeddingProvider`] loads it lazily
//! with bounded retries, memoizes it, and guards every call with the input and
//! output checks the retrieval engine relies on.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::Number;
use crate::retry::RetryPolicy;
use crate::vector_ops::normalize_vector;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("input text must be a non-empty string")]
    EmptyInput,
    #[error("model returned an empty embedding")]
    EmptyEmbedding,
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),
    #[error("embedding model error: {0}")]
    Provider(String),
}

/// Text → fixed-dimension vector.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<Number>, EmbeddingError>;
}

/// Produces a model. Loading may fail transiently and must be safe to retry.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError>;
}

pub struct EmbeddingProvider {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn EmbeddingModel>>,
    retry: RetryPolicy,
    max_input_chars: usize,
}

impl EmbeddingProvider {
    pub fn new(loader: Arc<dyn ModelLoader>, retry: RetryPolicy) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            retry,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Dimension of the loaded model, if it has been loaded.
    pub fn dimensions(&self) -> Option<usize> {
        self.model.get().map(|model| model.dimensions())
    }

    /// Loads the model now instead of on first use.
    pub async fn warm_up(&self) -> Result<(), EmbeddingError> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&Arc<dyn EmbeddingModel>, EmbeddingError> {
        let loader = Arc::clone(&self.loader);
        let retry = self.retry;
        self.model
            .get_or_try_init(|| async move {
                let model = retry
                    .run("load embedding model", move || {
                        let loader = Arc::clone(&loader);
                        async move { loader.load().await }
                    })
                    .await?;
                info!(model = model.name(), dimensions = model.dimensions(), "embedding model loaded");
                Ok::<_, EmbeddingError>(model)
            })
            .await
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<Number>, EmbeddingError> {
        let clean: String = text.trim().chars().take(self.max_input_chars).collect();
        if clean.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let model = self.model().await?;
        let embedding = model.embed(&clean).await?;
        if embedding.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }
        if embedding.len() != model.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: model.dimensions(),
                actual: embedding.len(),
            });
        }

        debug!(chars = clean.chars().count(), "embedded text");
        Ok(embedding)
    }
}

/// Deterministic feature-hashing model: every lowercase alphanumeric token is
/// hashed with SHA-256 into a signed bucket, then the vector is L2-normalized.
pub struct HashingModel {
    dimensions: usize,
}

impl HashingModel {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str) -> (usize, Number) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

#[async_trait]
impl EmbeddingModel for HashingModel {
    fn name(&self) -> &str {
        "sha256-feature-hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<Number>, EmbeddingError> {
        if self.dimensions == 0 {
            return Err(EmbeddingError::Provider("hashing model has zero dimensions".into()));
        }
        let mut vector = vec![0.0; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (index, sign) = self.bucket(&token.to_lowercase());
            vector[index] += sign;
        }
        normalize_vector(&mut vector);
        Ok(vector)
    }
}

pub struct HashingLoader {
    dimensions: usize,
}

impl HashingLoader {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl ModelLoader for HashingLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
        if self.dimensions == 0 {
            return Err(EmbeddingError::ModelLoad("dimensions must be greater than zero".into()));
        }
        Ok(Arc::new(HashingModel::new(self.dimensions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_ops::compute_cosine_similarity_simd;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails `failures` times before handing out a hashing model.
    struct FlakyLoader {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelLoader for FlakyLoader {
        async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(EmbeddingError::ModelLoad(format!("network down ({call})")));
            }
            Ok(Arc::new(HashingModel::new(16)))
        }
    }

    /// Records what it was asked to embed and returns a canned vector.
    struct RecordingModel {
        seen: Mutex<Vec<String>>,
        output: Vec<Number>,
        dimensions: usize,
    }

    #[async_trait]
    impl EmbeddingModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed(&self, text: &str) -> Result<Vec<Number>, EmbeddingError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.output.clone())
        }
    }

    struct FixedLoader(Arc<RecordingModel>);

    #[async_trait]
    impl ModelLoader for FixedLoader {
        async fn load(&self) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
            Ok(self.0.clone() as Arc<dyn EmbeddingModel>)
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn recording(output: Vec<Number>, dimensions: usize) -> (Arc<RecordingModel>, EmbeddingProvider) {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
            output,
            dimensions,
        });
        let provider = EmbeddingProvider::new(Arc::new(FixedLoader(model.clone())), fast_retry());
        (model, provider)
    }

    #[tokio::test]
    async fn load_is_retried_then_memoized() {
        let loader = Arc::new(FlakyLoader {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let provider = EmbeddingProvider::new(loader.clone(), fast_retry());
        assert!(!provider.is_loaded());

        provider.embed("capacitor").await.unwrap();
        provider.embed("contactor").await.unwrap();

        assert!(provider.is_loaded());
        assert_eq!(provider.dimensions(), Some(16));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn load_failure_surfaces_after_three_attempts() {
        let loader = Arc::new(FlakyLoader {
            failures: 10,
            calls: AtomicUsize::new(0),
        });
        let provider = EmbeddingProvider::new(loader.clone(), fast_retry());

        let err = provider.warm_up().await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ModelLoad(_)));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 3);
        assert!(!provider.is_loaded());
    }

    #[tokio::test]
    async fn input_is_trimmed_and_truncated() {
        let (model, provider) = recording(vec![1.0, 0.0], 2);
        let provider = provider.with_max_input_chars(1000);
        let long = format!("  {}  ", "é".repeat(1500));

        provider.embed(&long).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].chars().count(), 1000);
        assert!(seen[0].chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (model, provider) = recording(vec![1.0], 1);
        assert!(matches!(provider.embed("").await, Err(EmbeddingError::EmptyInput)));
        assert!(matches!(provider.embed("   ").await, Err(EmbeddingError::EmptyInput)));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_or_misshapen_output_is_rejected() {
        let (_, provider) = recording(Vec::new(), 4);
        assert!(matches!(
            provider.embed("drier").await,
            Err(EmbeddingError::EmptyEmbedding)
        ));

        let (_, provider) = recording(vec![1.0, 2.0], 4);
        assert!(matches!(
            provider.embed("drier").await,
            Err(EmbeddingError::DimensionMismatch { expected: 4, actual: 2 })
        ));
    }

    #[tokio::test]
    async fn hashing_model_is_deterministic_and_normalized() {
        let model = HashingModel::new(64);
        let a = model.embed("Run Cap 45/5 MFD").await.unwrap();
        let b = model.embed("run cap 45/5 mfd").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let other = model.embed("pvc drain pipe").await.unwrap();
        let same = compute_cosine_similarity_simd(&a, &b).unwrap();
        let different = compute_cosine_similarity_simd(&a, &other).unwrap();
        assert!(same > different);
    }

    #[tokio::test]
    async fn hashing_loader_rejects_zero_dimensions() {
        assert!(HashingLoader::new(0).load().await.is_err());
        let model = HashingLoader::new(8).load().await.unwrap();
        assert_eq!(model.dimensions(), 8);
    }
}
