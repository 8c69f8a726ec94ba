//! Generation workflow: upload → encode → generate → persist.
//!
//! The orchestrator owns the state machine and the user-editable inputs
//! (pending image, config, session). Collaborators are reached only through
//! the traits in `crate::services`.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult, Redirect};
use crate::model::{
    ConfigPatch, GenerationConfig, HistoryRecord, Identity, PendingImage, Session, SocialKitResult,
};
use crate::orchestrator::state::{GenerateOutcome, WorkflowSnapshot, WorkflowState};
use crate::services::{AssetUploader, ContentGenerator, CredentialStore, PersistenceLayer};

pub struct Orchestrator {
    credentials: Arc<dyn CredentialStore>,
    uploader: Arc<dyn AssetUploader>,
    generator: Arc<dyn ContentGenerator>,
    persistence: Arc<dyn PersistenceLayer>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: WorkflowState,
    config: GenerationConfig,
    pending: Option<PendingImage>,
    preview: Option<String>,
    session: Session,
    // Bumped on every start, clear, selection and history load.
    // A pipeline only publishes if the epoch it started with is still current.
    epoch: u64,
}

/// Inputs captured by value when a generation starts.
struct Job {
    epoch: u64,
    image: PendingImage,
    config: GenerationConfig,
    identity: Identity,
    api_key: String,
}

impl Orchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        uploader: Arc<dyn AssetUploader>,
        generator: Arc<dyn ContentGenerator>,
        persistence: Arc<dyn PersistenceLayer>,
    ) -> Self {
        Orchestrator {
            credentials,
            uploader,
            generator,
            persistence,
            inner: Mutex::new(Inner::default()),
        }
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.lock();
        WorkflowSnapshot {
            status: inner.state.status(),
            result: inner.state.result().cloned(),
            error: inner.state.error().map(String::from),
            image_preview: inner.preview.clone(),
            has_pending_image: inner.pending.is_some(),
            config: inner.config.clone(),
            signed_in: inner.session.identity.is_some(),
            has_credential: inner.session.api_key().is_some(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    pub fn config(&self) -> GenerationConfig {
        self.lock().config.clone()
    }

    /// Replace the pending image and return to `Idle`.
    pub fn select_image(&self, image: PendingImage) {
        let mut inner = self.lock();
        tracing::info!(media_type = %image.media_type(), bytes = image.bytes().len(), "Image selected");
        inner.preview = Some(image.preview().to_string());
        inner.pending = Some(image);
        inner.state = WorkflowState::Idle;
        inner.epoch += 1;
    }

    /// Drop the image and any result. Calling it again changes nothing.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.pending = None;
        inner.preview = None;
        inner.state = WorkflowState::Idle;
        inner.epoch += 1;
    }

    pub fn set_config(&self, patch: ConfigPatch) -> AppResult<GenerationConfig> {
        let mut inner = self.lock();
        inner.config.apply(patch)?;
        Ok(inner.config.clone())
    }

    pub fn toggle_platform(&self, name: &str) -> AppResult<GenerationConfig> {
        let mut inner = self.lock();
        inner.config.toggle_platform(name)?;
        Ok(inner.config.clone())
    }

    /// Show a stored kit. Replayed entries carry no image bytes, so they can
    /// be viewed but not re-generated.
    pub fn load_from_history(&self, result: SocialKitResult, image_url: String) {
        let mut inner = self.lock();
        inner.pending = None;
        inner.preview = Some(image_url);
        inner.state = WorkflowState::Complete(result);
        inner.epoch += 1;
    }

    /// Run one generation to a terminal state.
    ///
    /// Refuses to start without an image, while another run is in flight, or
    /// when the session lacks a user or key. Each pipeline step runs once, in
    /// order; the first failure ends the run.
    ///
    /// The pipeline runs on its own task. Dropping the returned future does
    /// not cancel it, and the run still reaches `Complete` or `Error`.
    pub async fn generate(self: &Arc<Self>) -> GenerateOutcome {
        let job = match self.begin() {
            Ok(job) => job,
            Err(outcome) => return outcome,
        };
        tracing::info!(user_id = %job.identity.user_id, epoch = job.epoch, "Generation started");

        let epoch = job.epoch;
        let this = Arc::clone(self);
        let run = tokio::spawn(async move {
            let outcome = this.run_pipeline(&job).await;
            this.publish(job.epoch, outcome)
        });
        match run.await {
            Ok(outcome) => outcome,
            Err(e) => self.publish(epoch, Err(AppError::Task(e.to_string()))),
        }
    }

    fn publish(&self, epoch: u64, outcome: AppResult<SocialKitResult>) -> GenerateOutcome {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::info!(epoch, "Discarding result of superseded generation");
            return GenerateOutcome::Superseded;
        }
        match outcome {
            Ok(result) => {
                tracing::info!(epoch, "Generation complete");
                inner.state = WorkflowState::Complete(result.clone());
                GenerateOutcome::Completed { result }
            }
            Err(e) => {
                tracing::error!("Generation failed: {:?}", e);
                let message = e.user_message();
                inner.state = WorkflowState::Error(message.clone());
                GenerateOutcome::Failed { message, redirect: e.redirect() }
            }
        }
    }

    fn begin(&self) -> Result<Job, GenerateOutcome> {
        let mut inner = self.lock();
        let Some(image) = inner.pending.clone() else {
            return Err(GenerateOutcome::NoImage);
        };
        if matches!(inner.state, WorkflowState::Generating) {
            tracing::debug!("Generation already in flight; ignoring");
            return Err(GenerateOutcome::AlreadyGenerating);
        }
        let Some(identity) = inner.session.identity.clone() else {
            tracing::info!("Generation requires sign-in");
            return Err(GenerateOutcome::Redirected { redirect: Redirect::Authenticate });
        };
        let Some(api_key) = inner.session.api_key().map(String::from) else {
            tracing::info!("Generation requires an API key");
            return Err(GenerateOutcome::Redirected { redirect: Redirect::ConfigureCredential });
        };
        inner.epoch += 1;
        inner.state = WorkflowState::Generating;
        Ok(Job {
            epoch: inner.epoch,
            image,
            config: inner.config.clone(),
            identity,
            api_key,
        })
    }

    async fn run_pipeline(&self, job: &Job) -> AppResult<SocialKitResult> {
        let asset = self.uploader.upload(&job.image).await?;
        tracing::debug!(url = %asset.url, "Upload finished");

        let inline = job.image.encode();
        let result = self.generator.generate(&job.api_key, &inline, &job.config).await?;

        self.persistence
            .record_generation(&job.identity, &asset, &job.config, &result)
            .await?;
        Ok(result)
    }

    /// Adopt a signed-in user. The key loads in the background; generation
    /// is not blocked on it.
    pub fn acquire_session(self: &Arc<Self>, identity: Identity) -> JoinHandle<()> {
        {
            let mut inner = self.lock();
            let same_user = inner.session.user_id() == Some(identity.user_id.as_str());
            if !same_user {
                inner.session.api_key = None;
            }
            inner.session.identity = Some(identity.clone());
        }
        tracing::info!(user_id = %identity.user_id, "Session acquired");
        let this = Arc::clone(self);
        tokio::spawn(async move { this.load_credential(identity).await })
    }

    async fn load_credential(&self, identity: Identity) {
        match self.credentials.get(&identity).await {
            Ok(Some(key)) => {
                let mut inner = self.lock();
                if inner.session.user_id() == Some(identity.user_id.as_str()) {
                    inner.session.api_key = Some(key);
                    tracing::info!(user_id = %identity.user_id, "API key loaded");
                } else {
                    tracing::debug!(user_id = %identity.user_id, "Session changed before API key arrived");
                }
            }
            Ok(None) => tracing::info!(user_id = %identity.user_id, "No API key stored"),
            Err(e) => tracing::warn!("Failed to load API key: {}", e),
        }
    }

    /// Forget the user and key. An in-flight run keeps the key it captured.
    pub fn sign_out(&self) {
        let mut inner = self.lock();
        inner.session = Session::default();
        tracing::info!("Signed out");
    }

    pub async fn save_credential(&self, key: &str) -> AppResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::Credential("API key must not be empty".to_string()));
        }
        let identity = self.identity()?;
        self.credentials.set(&identity, key).await?;

        let mut inner = self.lock();
        if inner.session.user_id() == Some(identity.user_id.as_str()) {
            inner.session.api_key = Some(key.to_string());
        }
        Ok(())
    }

    pub async fn history(&self) -> AppResult<Vec<HistoryRecord>> {
        let identity = self.identity()?;
        self.persistence.list_history(&identity).await
    }

    pub async fn delete_history_entry(&self, id: &str) -> AppResult<()> {
        let identity = self.identity()?;
        self.persistence.delete_record(&identity, id).await
    }

    fn identity(&self) -> AppResult<Identity> {
        self.lock()
            .session
            .identity
            .clone()
            .ok_or(AppError::Precondition(Redirect::Authenticate))
    }
}
