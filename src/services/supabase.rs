//! Supabase PostgREST client backing the credential store and history.
//!
//! Tables touched:
//! - `profiles`: `gemini_api_key`, `updated_at` keyed by user id.
//! - `images`: one row per upload (`cloudinary_url`, `cloudinary_public_id`).
//! - `generations`: `inputs` (the config) and `results` (the social kit), linked to an image.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::model::{GenerationConfig, HistoryRecord, Identity, SocialKitResult, UploadedAsset};
use crate::services::{CredentialStore, PersistenceLayer};

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct ProfileRow {
    gemini_api_key: Option<String>,
}

#[derive(Deserialize)]
struct ImageRow {
    id: Value,
    #[serde(default)]
    cloudinary_url: String,
    #[serde(default)]
    cloudinary_public_id: String,
}

#[derive(Deserialize)]
struct GenerationRow {
    id: Value,
    created_at: DateTime<Utc>,
    #[serde(default)]
    inputs: Value,
    results: Value,
    image: Option<ImageRow>,
}

impl SupabaseClient {
    pub fn new(base_url: String, anon_key: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Supabase client: {}", e)))?;
        Ok(SupabaseClient {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            anon_key,
        })
    }

    fn authorized(&self, builder: RequestBuilder, identity: &Identity) -> RequestBuilder {
        let bearer = identity.access_token.as_deref().unwrap_or(&self.anon_key);
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, String> {
        let response = builder.send().await.map_err(|e| format!("{}: {}", what, e))?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let detail = postgrest_message(&body).unwrap_or(body);
            tracing::error!("Supabase {} failed. Status: {}, Body: {}", what, status, detail);
            Err(format!("{} failed ({}): {}", what, status.as_u16(), detail))
        }
    }
}

#[async_trait]
impl CredentialStore for SupabaseClient {
    async fn get(&self, identity: &Identity) -> AppResult<Option<String>> {
        let url = format!("{}/profiles", self.rest_url);
        let req = self.authorized(self.client.get(&url), identity).query(&[
            ("id", format!("eq.{}", identity.user_id)),
            ("select", "gemini_api_key".to_string()),
        ]);
        let rows: Vec<ProfileRow> = self
            .send(req, "load API key")
            .await
            .map_err(AppError::Credential)?
            .json()
            .await
            .map_err(|e| AppError::Credential(format!("unreadable profile: {}", e)))?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.gemini_api_key)
            .filter(|k| !k.trim().is_empty()))
    }

    async fn set(&self, identity: &Identity, credential: &str) -> AppResult<()> {
        let url = format!("{}/profiles", self.rest_url);
        let req = self
            .authorized(self.client.patch(&url), identity)
            .query(&[("id", format!("eq.{}", identity.user_id))])
            .json(&json!({
                "gemini_api_key": credential,
                "updated_at": Utc::now().to_rfc3339(),
            }));
        self.send(req, "save API key").await.map_err(AppError::Credential)?;
        tracing::info!(user_id = %identity.user_id, "Stored API key");
        Ok(())
    }
}

#[async_trait]
impl PersistenceLayer for SupabaseClient {
    async fn record_generation(
        &self,
        identity: &Identity,
        asset: &UploadedAsset,
        config: &GenerationConfig,
        result: &SocialKitResult,
    ) -> AppResult<()> {
        let images_url = format!("{}/images", self.rest_url);
        let req = self
            .authorized(self.client.post(&images_url), identity)
            .header("Prefer", "return=representation")
            .json(&json!({
                "user_id": identity.user_id,
                "cloudinary_url": asset.url,
                "cloudinary_public_id": asset.public_id,
            }));
        let rows: Vec<ImageRow> = self
            .send(req, "save image record")
            .await
            .map_err(AppError::Persistence)?
            .json()
            .await
            .map_err(|e| AppError::Persistence(format!("unreadable image record: {}", e)))?;
        let image_id = rows
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| AppError::Persistence("image insert returned no row".to_string()))?;

        // An image row written above is kept even if this insert fails.
        let generations_url = format!("{}/generations", self.rest_url);
        let req = self
            .authorized(self.client.post(&generations_url), identity)
            .json(&json!({
                "user_id": identity.user_id,
                "image_id": image_id,
                "inputs": config,
                "results": result,
            }));
        self.send(req, "save generation record").await.map_err(AppError::Persistence)?;
        tracing::info!(user_id = %identity.user_id, public_id = %asset.public_id, "Recorded generation");
        Ok(())
    }

    async fn list_history(&self, identity: &Identity) -> AppResult<Vec<HistoryRecord>> {
        let url = format!("{}/generations", self.rest_url);
        let req = self.authorized(self.client.get(&url), identity).query(&[
            ("select", "*,image:images(*)".to_string()),
            ("user_id", format!("eq.{}", identity.user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let rows: Vec<GenerationRow> = self
            .send(req, "load history")
            .await
            .map_err(AppError::Persistence)?
            .json()
            .await
            .map_err(|e| AppError::Persistence(format!("unreadable history: {}", e)))?;
        Ok(rows.into_iter().map(GenerationRow::into_record).collect())
    }

    async fn delete_record(&self, identity: &Identity, id: &str) -> AppResult<()> {
        let url = format!("{}/generations", self.rest_url);
        let req = self
            .authorized(self.client.delete(&url), identity)
            .query(&[("id", format!("eq.{}", id))]);
        self.send(req, "delete generation").await.map_err(AppError::Persistence)?;
        Ok(())
    }
}

impl GenerationRow {
    fn into_record(self) -> HistoryRecord {
        let (image_url, image_public_id) = self
            .image
            .map(|i| (i.cloudinary_url, i.cloudinary_public_id))
            .unwrap_or_default();
        HistoryRecord {
            id: id_to_string(&self.id),
            created_at: self.created_at,
            image_url,
            image_public_id,
            config: self.inputs,
            result: SocialKitResult(self.results),
        }
    }
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn postgrest_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("message")?.as_str().map(String::from)
}
