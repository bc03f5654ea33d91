//! Durable clip registry (§4.12): two logical Firestore collections mirroring
//! in-memory job state so a clip survives process restarts and anonymous
//! sessions can be promoted to an authenticated owner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use clipcast_models::{ClipRecord, Identity};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::FirestoreClient;
use crate::error::FirestoreError;
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

/// Collection holding promoted, user-owned clips.
const CLIPS_COLLECTION: &str = "clips";
/// Collection holding anonymous-session clips pending promotion or expiry.
const ANONYMOUS_CLIPS_COLLECTION: &str = "anonymous_clips";

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("clip not found: {0}")]
    NotFound(String),

    #[error("clip already exists in both tables: {0}")]
    DuplicateRow(String),

    #[error(transparent)]
    Firestore(#[from] FirestoreError),
}

impl RegistryError {
    pub fn kind(&self) -> clipcast_models::ErrorKind {
        match self {
            RegistryError::NotFound(_) => clipcast_models::ErrorKind::NotFound,
            RegistryError::DuplicateRow(_) => clipcast_models::ErrorKind::Internal,
            RegistryError::Firestore(FirestoreError::NotFound(_)) => clipcast_models::ErrorKind::NotFound,
            RegistryError::Firestore(_) => clipcast_models::ErrorKind::Internal,
        }
    }
}

/// Durable mirror of clip ownership and artifact paths, keyed by job id.
///
/// `job_id` is unique across both `clips` and `anonymous_clips`; a row lives
/// in exactly one of the two at any time (§4.12 invariants).
pub struct ClipRegistry {
    client: FirestoreClient,
}

impl ClipRegistry {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// The underlying Firestore client, for callers that need raw document access (health
    /// checks, admin tooling) rather than the clip-record abstraction.
    pub fn firestore(&self) -> &FirestoreClient {
        &self.client
    }

    fn collection_for(record: &ClipRecord) -> &'static str {
        match &record.owner {
            Identity::Session { .. } => ANONYMOUS_CLIPS_COLLECTION,
            Identity::User { .. } => CLIPS_COLLECTION,
        }
    }

    /// Insert or overwrite the row for this clip's job id in its owner's table.
    pub async fn save(&self, record: &ClipRecord) -> RegistryResult<()> {
        let collection = Self::collection_for(record);
        let fields = clip_record_to_fields(record);
        let doc_id = record.job_id.as_str();

        match self.client.get_document(collection, doc_id).await? {
            Some(_) => {
                self.client
                    .update_document(collection, doc_id, fields, None)
                    .await?;
            }
            None => {
                self.client.create_document(collection, doc_id, fields).await?;
            }
        }

        debug!(job_id = %record.job_id, collection, "saved clip registry row");
        Ok(())
    }

    /// Load a clip row, checking `clips` first and falling back to `anonymous_clips`.
    pub async fn load(&self, job_id: &str) -> RegistryResult<ClipRecord> {
        if let Some(doc) = self.client.get_document(CLIPS_COLLECTION, job_id).await? {
            return document_to_clip_record(&doc, job_id);
        }
        if let Some(doc) = self
            .client
            .get_document(ANONYMOUS_CLIPS_COLLECTION, job_id)
            .await?
        {
            return document_to_clip_record(&doc, job_id);
        }
        Err(RegistryError::NotFound(job_id.to_string()))
    }

    /// Move the anonymous row for `job_id` to `clips` under `user_id`.
    ///
    /// Idempotent: a row already promoted (absent from `anonymous_clips`) is skipped
    /// rather than treated as an error.
    pub async fn promote(&self, job_id: &str, user_id: &str) -> RegistryResult<()> {
        let doc = match self
            .client
            .get_document(ANONYMOUS_CLIPS_COLLECTION, job_id)
            .await?
        {
            Some(doc) => doc,
            None => {
                debug!(job_id, "promote: no anonymous row, assuming already promoted");
                return Ok(());
            }
        };

        let mut record = document_to_clip_record(&doc, job_id)?;
        record.promote(user_id);

        let fields = clip_record_to_fields(&record);
        self.client
            .create_document(CLIPS_COLLECTION, job_id, fields)
            .await
            .map_err(|e| match e {
                FirestoreError::AlreadyExists(_) => RegistryError::DuplicateRow(job_id.to_string()),
                other => RegistryError::Firestore(other),
            })?;

        self.client
            .delete_document(ANONYMOUS_CLIPS_COLLECTION, job_id)
            .await?;

        info!(job_id, user_id, "promoted anonymous clip to user ownership");
        Ok(())
    }

    /// Delete every anonymous row whose `expires_at` has passed.
    ///
    /// Safe to run concurrently from multiple sweepers: deletes are idempotent,
    /// a row raced away by a concurrent promotion simply is no longer found.
    pub async fn sweep(&self, now: DateTime<Utc>) -> RegistryResult<usize> {
        let mut deleted = 0usize;
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_documents(ANONYMOUS_CLIPS_COLLECTION, Some(100), page_token.as_deref())
                .await?;

            for doc in page.documents.unwrap_or_default() {
                let Some(name) = &doc.name else { continue };
                let Some(doc_id) = name.rsplit('/').next() else { continue };

                let expires_at = doc
                    .fields
                    .as_ref()
                    .and_then(|f| f.get("expires_at"))
                    .and_then(DateTime::<Utc>::from_firestore_value);

                if let Some(expires_at) = expires_at {
                    if expires_at < now {
                        match self
                            .client
                            .delete_document(ANONYMOUS_CLIPS_COLLECTION, doc_id)
                            .await
                        {
                            Ok(()) => deleted += 1,
                            Err(e) => warn!(doc_id, "sweep: failed to delete expired clip row: {}", e),
                        }
                    }
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(deleted, "anonymous clip sweep complete");
        Ok(deleted)
    }
}

fn clip_record_to_fields(record: &ClipRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("job_id".to_string(), record.job_id.to_firestore_value());

    let (owner_kind, owner_id) = match &record.owner {
        Identity::User { user_id } => ("user", user_id.clone()),
        Identity::Session { session_id } => ("session", session_id.clone()),
    };
    fields.insert("owner_kind".to_string(), owner_kind.to_firestore_value());
    fields.insert("owner_id".to_string(), owner_id.to_firestore_value());

    fields.insert("source_url".to_string(), record.source_url.to_firestore_value());
    fields.insert("final_path".to_string(), record.final_path.to_firestore_value());
    fields.insert("subtitle_path".to_string(), record.subtitle_path.to_firestore_value());
    fields.insert(
        "serialized_state".to_string(),
        record.serialized_state.to_firestore_value(),
    );
    fields.insert("created_at".to_string(), record.created_at.to_firestore_value());
    fields.insert("expires_at".to_string(), record.expires_at.to_firestore_value());

    fields
}

fn document_to_clip_record(doc: &Document, job_id: &str) -> RegistryResult<ClipRecord> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| RegistryError::NotFound(job_id.to_string()))?;

    let get_string = |key: &str| -> Option<String> {
        fields.get(key).and_then(String::from_firestore_value)
    };

    let owner_kind = get_string("owner_kind").unwrap_or_default();
    let owner_id = get_string("owner_id").unwrap_or_default();
    let owner = if owner_kind == "user" {
        Identity::user(owner_id)
    } else {
        Identity::session(owner_id)
    };

    let created_at = fields
        .get("created_at")
        .and_then(DateTime::<Utc>::from_firestore_value)
        .unwrap_or_else(Utc::now);
    let expires_at = fields
        .get("expires_at")
        .and_then(DateTime::<Utc>::from_firestore_value);

    Ok(ClipRecord {
        job_id: job_id.to_string(),
        owner,
        source_url: get_string("source_url").unwrap_or_default(),
        final_path: get_string("final_path"),
        subtitle_path: get_string("subtitle_path"),
        serialized_state: get_string("serialized_state").unwrap_or_default(),
        created_at,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user_record() -> ClipRecord {
        ClipRecord::new("job-1", Identity::user("user-1"), "https://youtube.com/watch?v=abc")
    }

    fn sample_session_record() -> ClipRecord {
        ClipRecord::new("job-2", Identity::session("sess-1"), "https://youtube.com/watch?v=abc")
    }

    #[test]
    fn collection_for_routes_by_owner_kind() {
        assert_eq!(ClipRegistry::collection_for(&sample_user_record()), CLIPS_COLLECTION);
        assert_eq!(
            ClipRegistry::collection_for(&sample_session_record()),
            ANONYMOUS_CLIPS_COLLECTION
        );
    }

    #[test]
    fn fields_round_trip_session_owner() {
        let record = sample_session_record();
        let fields = clip_record_to_fields(&record);
        assert_eq!(
            fields.get("owner_kind").and_then(String::from_firestore_value),
            Some("session".to_string())
        );
        assert!(fields.contains_key("expires_at"));
    }

    #[test]
    fn fields_round_trip_user_owner_has_no_expiry() {
        let record = sample_user_record();
        let fields = clip_record_to_fields(&record);
        assert_eq!(
            fields.get("owner_kind").and_then(String::from_firestore_value),
            Some("user".to_string())
        );
        assert!(matches!(fields.get("expires_at"), Some(Value::NullValue(()))));
    }
}
