//! In-memory job orchestrator (§4.11): a single actor owning every `Job`, which sequences a
//! job's pipeline stages on its own `tokio::spawn` task and fans progress out over the shared
//! `ProgressChannel`. The §4.14 REDESIGN collapses the teacher's separate worker binary and
//! Redis-Streams queue into this in-process task-per-job model, since the core is explicitly
//! single-process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use clipcast_capability::{FaceDetectorClient, TranscriberClient};
use clipcast_media::regen::EditedCaption;
use clipcast_models::{
    CaptionEdit, ClipRecord, Identity, Job, JobId, JobRequest, JobState, ProgressEvent,
    RegenStatus, SubtitleDocument, SubtitleFormat,
};
use clipcast_queue::ProgressChannel;
use clipcast_registry::ClipRegistry;
use clipcast_worker::pipeline;
use clipcast_worker::WorkerConfig;

use crate::error::ApiError;
use crate::metrics;

/// Per-job state the orchestrator needs beyond what's mirrored into the registry: the
/// subtitle document produced by the last burn, read back for regeneration and for
/// `refresh_video`'s caption projection, plus the pristine master every burn reads from.
#[derive(Debug, Clone, Default)]
struct JobExtras {
    subtitle_document: Option<SubtitleDocument>,
    pristine_master_path: Option<String>,
}

struct Inner {
    jobs: HashMap<JobId, Job>,
    extras: HashMap<JobId, JobExtras>,
}

/// Owns every job's in-memory state (§5: "a single logical actor protecting the job map").
pub struct Orchestrator {
    inner: Mutex<Inner>,
    config: WorkerConfig,
    progress: Arc<ProgressChannel>,
    registry: Arc<ClipRegistry>,
    transcriber: TranscriberClient,
    face_detector: FaceDetectorClient,
}

impl Orchestrator {
    pub fn new(
        config: WorkerConfig,
        progress: Arc<ProgressChannel>,
        registry: Arc<ClipRegistry>,
        transcriber: TranscriberClient,
        face_detector: FaceDetectorClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                extras: HashMap::new(),
            }),
            config,
            progress,
            registry,
            transcriber,
            face_detector,
        })
    }

    /// `create_job` (§6): validates the source URL, registers the job, and spawns its
    /// pipeline task. Returns the new job's id; the caller decides anonymity from `owner`.
    pub async fn create_job(
        self: &Arc<Self>,
        owner: Identity,
        source_url: String,
        duration_secs: f64,
        start_offset: Option<f64>,
        end_offset: Option<f64>,
    ) -> Result<JobId, ApiError> {
        if !clipcast_models::is_youtube_domain(&source_url) {
            return Err(ApiError::bad_request(
                "source_url must be a youtube.com or youtu.be URL",
            ));
        }
        if duration_secs <= 0.0 {
            return Err(ApiError::bad_request("duration_secs must be positive"));
        }

        let owner_label = match &owner {
            Identity::User { user_id } => user_id.clone(),
            Identity::Session { session_id } => session_id.clone(),
        };

        let request = JobRequest {
            source_url: source_url.clone(),
            duration_secs,
            start_offset,
            end_offset,
        };
        let job = Job::new(owner.clone(), request);
        let job_id = job.id.clone();

        {
            let mut inner = self.inner.lock().await;
            inner.jobs.insert(job_id.clone(), job);
            inner.extras.insert(job_id.clone(), JobExtras::default());
        }

        self.registry
            .save(&ClipRecord::new(job_id.to_string(), owner, source_url))
            .await?;
        self.progress.init_job_status(&job_id, &owner_label).await.ok();
        metrics::record_job_created();

        let this = Arc::clone(self);
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            this.run_pipeline(spawned_id).await;
        });

        Ok(job_id)
    }

    /// `query_job` (§6): returns a snapshot if `caller` is authorized for this job.
    pub async fn query_job(&self, caller: &Identity, job_id: &JobId) -> Result<Job, ApiError> {
        let inner = self.inner.lock().await;
        let job = inner
            .jobs
            .get(job_id)
            .ok_or_else(|| ApiError::not_found("job not found"))?;
        if !caller.authorizes(&job.owner) {
            return Err(ApiError::unauthorized("caller does not own this job"));
        }
        Ok(job.clone())
    }

    /// `update_captions` (§6): rejects with `busy` if a regeneration is already running for
    /// this job (§5: at most one regeneration worker per job_id).
    pub async fn update_captions(
        self: &Arc<Self>,
        caller: &Identity,
        job_id: &JobId,
        edits: Vec<CaptionEdit>,
    ) -> Result<JobId, ApiError> {
        let (original, pristine_master_path, clip_duration) = {
            let mut inner = self.inner.lock().await;
            let job = inner
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| ApiError::not_found("job not found"))?;
            if !caller.authorizes(&job.owner) {
                return Err(ApiError::unauthorized("caller does not own this job"));
            }
            if job.state != JobState::Completed {
                return Err(ApiError::bad_request("job has not completed yet"));
            }
            if job.regen_status == RegenStatus::Regenerating {
                return Err(ApiError::busy(
                    "a regeneration is already running for this job",
                ));
            }
            job.regen_status = RegenStatus::Regenerating;

            let extras = inner.extras.get(job_id).cloned().unwrap_or_default();
            let pristine = extras.pristine_master_path.clone().ok_or_else(|| {
                ApiError::internal("job has no pristine master recorded")
            })?;
            (extras.subtitle_document, pristine, job.request.duration_secs)
        };

        let edited: Vec<EditedCaption> = edits
            .into_iter()
            .map(|e| {
                let start = parse_edit_timestamp(e.start_time.as_deref());
                let end = parse_edit_timestamp(e.end_time.as_deref());
                EditedCaption {
                    speaker_label: e.speaker_label,
                    text: e.text,
                    start,
                    end,
                }
            })
            .collect();

        let this = Arc::clone(self);
        let regen_job_id = job_id.clone();
        tokio::spawn(async move {
            this.run_regeneration(regen_job_id, edited, original, clip_duration, pristine_master_path)
                .await;
        });

        Ok(job_id.clone())
    }

    /// `refresh_video` (§6): returns a cache-busted final URL and the current caption
    /// projection.
    #[allow(clippy::type_complexity)]
    pub async fn refresh_video(
        &self,
        caller: &Identity,
        job_id: &JobId,
    ) -> Result<(String, Vec<(usize, String, String, f64, f64)>), ApiError> {
        let inner = self.inner.lock().await;
        let job = inner
            .jobs
            .get(job_id)
            .ok_or_else(|| ApiError::not_found("job not found"))?;
        if !caller.authorizes(&job.owner) {
            return Err(ApiError::unauthorized("caller does not own this job"));
        }
        let final_path = job
            .artifacts
            .final_path
            .clone()
            .ok_or_else(|| ApiError::bad_request("job has no final artifact yet"))?;

        let captions = inner
            .extras
            .get(job_id)
            .and_then(|e| e.subtitle_document.as_ref())
            .map(|d| d.to_caption_list())
            .unwrap_or_default();

        let cache_buster = chrono::Utc::now().timestamp_millis();
        Ok((format!("{final_path}?v={cache_buster}"), captions))
    }

    /// Promotion (§4.11, §4.12): rewrite every in-memory job owned by `session_id` to
    /// `user_id`, and mirror the rewrite into the durable registry.
    pub async fn promote_session(&self, session_id: &str, user_id: &str) -> Result<(), ApiError> {
        let owned_ids: Vec<JobId> = {
            let mut inner = self.inner.lock().await;
            let ids: Vec<JobId> = inner
                .jobs
                .values()
                .filter(|j| matches!(&j.owner, Identity::Session { session_id: s } if s == session_id))
                .map(|j| j.id.clone())
                .collect();
            for job_id in &ids {
                if let Some(job) = inner.jobs.get_mut(job_id) {
                    job.promote(session_id, user_id);
                }
            }
            ids
        };

        for job_id in owned_ids {
            self.registry.promote(&job_id.to_string(), user_id).await?;
        }

        Ok(())
    }

    /// Mark a job failed from outside its own pipeline task (stale-job recovery, §4.14).
    pub async fn fail_job(&self, job_id: &JobId, message: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(job_id) {
            job.fail(message);
        }
    }

    /// Non-terminal job ids, for the stale-job sweeper (§4.14).
    pub async fn active_job_ids(&self) -> Vec<JobId> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .values()
            .filter(|j| !j.state.is_terminal())
            .map(|j| j.id.clone())
            .collect()
    }

    async fn transition(&self, job_id: &JobId, state: JobState, progress: u8, message: &str) {
        {
            let mut inner = self.inner.lock().await;
            if let Some(job) = inner.jobs.get_mut(job_id) {
                job.transition(state, message);
                job.set_progress(progress, message);
            }
        }
        self.progress.update_job_progress(job_id, progress).await.ok();
        self.progress
            .publish_with_history(
                job_id,
                &ProgressEvent::progress(job_id.to_string(), state, progress, message),
            )
            .await
            .ok();
    }

    async fn run_pipeline(self: Arc<Self>, job_id: JobId) {
        if let Err(e) = self.run_pipeline_inner(&job_id).await {
            warn!(job_id = %job_id, error = %e, "job failed");
            self.fail_job(&job_id, &e.to_string()).await;
            self.progress.fail_job_status(&job_id, &e.to_string()).await.ok();
            self.progress
                .publish_with_history(&job_id, &ProgressEvent::error(job_id.to_string(), e.to_string()))
                .await
                .ok();
            metrics::record_job_failed();
        } else {
            metrics::record_job_completed();
        }
    }

    async fn run_pipeline_inner(&self, job_id: &JobId) -> Result<(), ApiError> {
        let (source_url, duration_secs, start_offset, end_offset) = {
            let inner = self.inner.lock().await;
            let job = inner
                .jobs
                .get(job_id)
                .ok_or_else(|| ApiError::internal("job vanished from the map"))?;
            (
                job.request.source_url.clone(),
                job.request.duration_secs,
                job.request.start_offset,
                job.request.end_offset,
            )
        };

        self.transition(job_id, JobState::Downloading, 5, "fetching source video").await;
        let acquired = pipeline::acquire(&self.config, &source_url).await?;
        let video = pipeline::probe(&acquired.local_path).await?;

        self.transition(job_id, JobState::Planning, 25, "selecting clip window").await;
        let window = pipeline::select_window(&video, duration_secs, start_offset);
        let start = start_offset.unwrap_or(window.start_offset);
        let target_duration = end_offset
            .map(|end| (end - start).max(1.0))
            .unwrap_or(duration_secs);

        let crop_plan = pipeline::plan_speakers(
            &acquired.local_path,
            start,
            target_duration,
            video.width as f64,
            video.height as f64,
            &self.face_detector,
        )
        .await?;

        self.transition(job_id, JobState::Rendering, 45, "rendering caption-free master").await;
        let clips_dir = self.config.clips_dir();
        tokio::fs::create_dir_all(&clips_dir)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let master_path = clips_dir.join(format!("{job_id}_no_captions.mp4"));
        let pristine_path =
            pipeline::render_caption_free_master(&acquired.local_path, &master_path, start, target_duration, &crop_plan)
                .await?;

        self.transition(job_id, JobState::Transcribing, 65, "transcribing clip window").await;
        let (_phrases, document) =
            pipeline::transcribe_and_assemble(&self.transcriber, &pristine_path, start, target_duration).await?;

        self.transition(job_id, JobState::Burning, 85, "burning captions onto final clip").await;
        let final_path = clips_dir.join(format!("{job_id}.mp4"));
        pipeline::burn_initial_captions(&pristine_path, &document, &final_path).await?;

        let subtitle_path = clips_dir.join(format!("{job_id}_captions.{}", SubtitleFormat::Styled.extension()));
        let written = clipcast_media::write_subtitle_document(&document, SubtitleFormat::Styled);
        tokio::fs::write(&subtitle_path, written)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        {
            let mut inner = self.inner.lock().await;
            if let Some(job) = inner.jobs.get_mut(job_id) {
                job.artifacts.final_path = Some(final_path.display().to_string());
                job.artifacts.master_path = Some(pristine_path.display().to_string());
                job.artifacts.subtitle_path = Some(subtitle_path.display().to_string());
                job.artifacts.subtitle_format = Some(SubtitleFormat::Styled.extension().to_string());
                job.complete();
            }
            if let Some(extras) = inner.extras.get_mut(job_id) {
                extras.subtitle_document = Some(document);
                extras.pristine_master_path = Some(pristine_path.display().to_string());
            }
        }

        self.persist_artifacts(job_id, &final_path, &subtitle_path).await;
        self.progress.complete_job_status(job_id).await.ok();
        self.progress
            .publish_with_history(job_id, &ProgressEvent::complete(job_id.to_string()))
            .await
            .ok();

        Ok(())
    }

    async fn run_regeneration(
        self: Arc<Self>,
        job_id: JobId,
        edited: Vec<EditedCaption>,
        original: Option<SubtitleDocument>,
        clip_duration: f64,
        pristine_master_path: String,
    ) {
        self.progress
            .publish_with_history(
                &job_id,
                &ProgressEvent::regen_update(job_id.to_string(), 10, "reconciling caption timings"),
            )
            .await
            .ok();

        let clips_dir = self.config.clips_dir();
        let final_path = clips_dir.join(format!("{job_id}.mp4"));

        let result = pipeline::regenerate(edited, original.as_ref(), clip_duration, &pristine_master_path, &final_path).await;

        match result {
            Ok(document) => {
                let subtitle_path =
                    clips_dir.join(format!("{job_id}_captions.{}", SubtitleFormat::Styled.extension()));
                let written = clipcast_media::write_subtitle_document(&document, SubtitleFormat::Styled);
                if let Err(e) = tokio::fs::write(&subtitle_path, written).await {
                    warn!(job_id = %job_id, error = %e, "failed to write regenerated subtitle sidecar");
                }

                {
                    let mut inner = self.inner.lock().await;
                    if let Some(job) = inner.jobs.get_mut(&job_id) {
                        job.regen_status = RegenStatus::Idle;
                    }
                    if let Some(extras) = inner.extras.get_mut(&job_id) {
                        extras.subtitle_document = Some(document);
                    }
                }
                self.persist_artifacts(&job_id, &final_path, &subtitle_path).await;
                self.progress
                    .publish_with_history(&job_id, &ProgressEvent::regen_complete(job_id.to_string()))
                    .await
                    .ok();
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "caption regeneration failed");
                let mut inner = self.inner.lock().await;
                if let Some(job) = inner.jobs.get_mut(&job_id) {
                    job.regen_status = RegenStatus::RegenFailed;
                }
                drop(inner);
                self.progress
                    .publish_with_history(&job_id, &ProgressEvent::regen_error(job_id.to_string(), e.to_string()))
                    .await
                    .ok();
            }
        }
    }

    async fn persist_artifacts(&self, job_id: &JobId, final_path: &std::path::Path, subtitle_path: &std::path::Path) {
        match self.registry.load(&job_id.to_string()).await {
            Ok(mut record) => {
                record.final_path = Some(final_path.display().to_string());
                record.subtitle_path = Some(subtitle_path.display().to_string());
                if let Err(e) = self.registry.save(&record).await {
                    warn!(job_id = %job_id, error = %e, "failed to persist clip artifacts to the registry");
                }
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "failed to load clip registry row for artifact persistence"),
        }
    }
}

/// Parse a wire-provided caption timestamp (`H:MM:SS.CC`, §4.1). Missing or malformed input
/// is treated as "no timing supplied" rather than a hard error, so timing reconciliation can
/// fall back to its own derivation (§4.10 phase 2).
fn parse_edit_timestamp(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    match clipcast_models::timestamp::parse_timestamp(raw) {
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!(raw, error = %e, "failed to parse caption edit timestamp, treating as unset");
            None
        }
    }
}
