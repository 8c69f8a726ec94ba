//! Narrow interfaces to the external collaborators the workflow drives.
//!
//! - `cloudinary`: asset uploader.
//! - `gemini`: content generator.
//! - `supabase`: credential store and persistence layer.
pub mod cloudinary;
pub mod gemini;
pub mod supabase;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::{
    GenerationConfig, HistoryRecord, Identity, InlineImage, PendingImage, SocialKitResult,
    UploadedAsset,
};

/// Per-user storage for the AI API key.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, identity: &Identity) -> AppResult<Option<String>>;
    async fn set(&self, identity: &Identity, credential: &str) -> AppResult<()>;
}

#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, image: &PendingImage) -> AppResult<UploadedAsset>;
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        image: &InlineImage,
        config: &GenerationConfig,
    ) -> AppResult<SocialKitResult>;
}

/// Durable record of images and their generated kits, scoped per user.
#[async_trait]
pub trait PersistenceLayer: Send + Sync {
    async fn record_generation(
        &self,
        identity: &Identity,
        asset: &UploadedAsset,
        config: &GenerationConfig,
        result: &SocialKitResult,
    ) -> AppResult<()>;

    /// Most recent first.
    async fn list_history(&self, identity: &Identity) -> AppResult<Vec<HistoryRecord>>;

    async fn delete_record(&self, identity: &Identity, id: &str) -> AppResult<()>;
}
