//! Thin client for Cloudinary unsigned uploads.
//!
//! - `upload` posts the raw image as multipart to `/v1_1/<cloud>/image/upload`
//!   and returns the durable `secure_url` plus `public_id`.
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::model::{PendingImage, UploadedAsset};
use crate::services::AssetUploader;

#[derive(Clone)]
pub struct CloudinaryUploader {
    client: Client,
    base_url: String,
    cloud_name: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

impl CloudinaryUploader {
    pub fn new(base_url: String, cloud_name: String, upload_preset: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build upload client: {}", e)))?;
        Ok(CloudinaryUploader {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name,
            upload_preset,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.base_url, self.cloud_name)
    }
}

#[async_trait]
impl AssetUploader for CloudinaryUploader {
    async fn upload(&self, image: &PendingImage) -> AppResult<UploadedAsset> {
        let url = self.endpoint();
        tracing::info!("Uploading {} bytes to Cloudinary at URL: {}", image.bytes().len(), url);

        let file_name = image.file_name().unwrap_or("upload").to_string();
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(file_name)
            .mime_str(image.media_type())
            .map_err(|e| AppError::Upload(format!("invalid media type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: UploadResponse = response
                .json()
                .await
                .map_err(|e| AppError::Upload(format!("unreadable upload response: {}", e)))?;
            let url = body
                .secure_url
                .or(body.url)
                .ok_or_else(|| AppError::Upload("upload response carried no URL".to_string()))?;
            tracing::info!(public_id = %body.public_id, "Image uploaded");
            Ok(UploadedAsset { url, public_id: body.public_id })
        } else {
            let error_body = response.text().await.unwrap_or_default();
            let detail = cloudinary_error_message(&error_body).unwrap_or(error_body);
            tracing::error!("Cloudinary upload failed. Status: {}, Body: {}", status, detail);
            if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 420 {
                Err(AppError::Upload(format!("upload quota exceeded: {}", detail)))
            } else {
                Err(AppError::Upload(format!("status {}: {}", status.as_u16(), detail)))
            }
        }
    }
}

fn cloudinary_error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.pointer("/error/message")?.as_str().map(String::from)
}
