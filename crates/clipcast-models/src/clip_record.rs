//! Durable mirror of a job, persisted in the clip registry (§3, §4.12).

use crate::job::Identity;
use serde::{Deserialize, Serialize};

/// A durable row mirroring one job's disposition, stored in the `clips` or
/// `anonymous_clips` logical table (§4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRecord {
    pub job_id: String,
    pub owner: Identity,
    pub source_url: String,
    pub final_path: Option<String>,
    pub subtitle_path: Option<String>,
    pub serialized_state: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Anonymous clip rows expire 24 hours after creation unless promoted (§4.12).
pub const ANONYMOUS_CLIP_TTL_HOURS: i64 = 24;

impl ClipRecord {
    pub fn new(job_id: impl Into<String>, owner: Identity, source_url: impl Into<String>) -> Self {
        let created_at = chrono::Utc::now();
        let expires_at = if owner.is_anonymous() {
            Some(created_at + chrono::Duration::hours(ANONYMOUS_CLIP_TTL_HOURS))
        } else {
            None
        };
        Self {
            job_id: job_id.into(),
            owner,
            source_url: source_url.into(),
            final_path: None,
            subtitle_path: None,
            serialized_state: String::new(),
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }

    /// Rewrite ownership to `user_id` and clear the expiry (§4.12 promotion).
    pub fn promote(&mut self, user_id: &str) {
        self.owner = Identity::user(user_id);
        self.expires_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_record_gets_expiry() {
        let record = ClipRecord::new("job-1", Identity::session("sess-1"), "https://youtu.be/x");
        assert!(record.expires_at.is_some());
        assert!(record.expires_at.unwrap() > record.created_at);
    }

    #[test]
    fn test_user_record_has_no_expiry() {
        let record = ClipRecord::new("job-1", Identity::user("u1"), "https://youtu.be/x");
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn test_promote_clears_expiry() {
        let mut record = ClipRecord::new("job-1", Identity::session("sess-1"), "https://youtu.be/x");
        record.promote("u1");
        assert!(record.expires_at.is_none());
        assert_eq!(record.owner, Identity::user("u1"));
    }
}
