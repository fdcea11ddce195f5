//! Realtime event topics.
//!
//! Writes to profiles and to the review queue publish JSON events onto
//! broadcast channels; the WebSocket layer forwards them to subscribed
//! clients. Delivery per topic is FIFO; nothing is promised across topics.

use crate::models::user::UserProfile;
use crate::models::verification::VerificationRequest;
use chrono::Utc;
use tokio::sync::broadcast;

/// Broadcast channels for each event topic.
#[derive(Debug)]
pub struct EventBus {
    /// Profile status changes. Events carry the owning user id so each
    /// client only receives its own.
    pub profile_tx: broadcast::Sender<String>,
    /// Review-queue changes (new submission, processed request).
    pub queue_tx: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new(channel_capacity: usize) -> Self {
        let (profile_tx, _) = broadcast::channel(channel_capacity);
        let (queue_tx, _) = broadcast::channel(channel_capacity);
        Self { profile_tx, queue_tx }
    }

    /// Publish the current state of a profile after a status transition.
    pub fn publish_profile_update(&self, profile: &UserProfile) {
        let event = serde_json::json!({
            "topic": "profile",
            "data": {
                "user_id": profile.id,
                "verification_status": profile.verification_status,
                "rejection_reason": profile.rejection_reason,
                "id_image_url": profile.id_image_url,
            },
            "timestamp": Utc::now().timestamp(),
        });
        let _ = self.profile_tx.send(event.to_string());
    }

    /// Publish a queue change: `kind` is `submitted` or `processed`.
    pub fn publish_queue_update(&self, kind: &str, request: &VerificationRequest) {
        let event = serde_json::json!({
            "topic": "queue",
            "data": {
                "kind": kind,
                "request_id": request.id,
                "user_id": request.user_id,
                "user_email": request.user_email,
                "status": request.status,
            },
            "timestamp": Utc::now().timestamp(),
        });
        let _ = self.queue_tx.send(event.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::VerificationStatus;
    use uuid::Uuid;

    fn sample_profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            display_name: "A".to_string(),
            password_hash: String::new(),
            photo_url: None,
            is_admin: false,
            verification_status: VerificationStatus::Pending,
            id_image_url: Some("/api/documents/x/id.png".to_string()),
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_submitted_at: Some(Utc::now()),
            verified_at: None,
            rejected_at: None,
        }
    }

    #[tokio::test]
    async fn profile_events_reach_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.profile_tx.subscribe();
        let profile = sample_profile();

        bus.publish_profile_update(&profile);

        let raw = rx.recv().await.unwrap();
        let event: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(event["topic"], "profile");
        assert_eq!(event["data"]["user_id"], profile.id.to_string());
        assert_eq!(event["data"]["verification_status"], "pending");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new(16);
        bus.publish_profile_update(&sample_profile());
    }
}
