use kitflow_core::TrackedProject;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast feed of project snapshots.
///
/// Writers publish the full aggregate after every successful persist;
/// watchers subscribe and receive one snapshot per change. Dropping a
/// receiver is the unsubscribe: the channel tracks receiver counts, so a
/// torn-down view releases its subscription automatically.
#[derive(Clone)]
pub struct ProjectEvents {
    tx: broadcast::Sender<TrackedProject>,
}

impl Default for ProjectEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publishes a snapshot to all current watchers. A feed with no
    /// watchers is not an error.
    pub fn publish(&self, project: &TrackedProject) {
        let receivers = self.tx.receiver_count();
        if receivers > 0 {
            debug!(
                project_id = %project.project_id,
                receivers,
                "Publishing project snapshot"
            );
        }
        let _ = self.tx.send(project.clone());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackedProject> {
        self.tx.subscribe()
    }

    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kitflow_core::StageKey;

    fn sample() -> TrackedProject {
        TrackedProject {
            project_id: "SK-1000".to_string(),
            user_id: "user-1".to_string(),
            user_email: "asha@example.com".to_string(),
            title: "Line Follower Bot".to_string(),
            current_stage: StageKey::ComponentsCollected,
            stages: kitflow_tracker::new_project_stages(Utc::now(), None),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_snapshots() {
        let events = ProjectEvents::new();
        let mut rx = events.subscribe();

        events.publish(&sample());

        let got = rx.recv().await.unwrap();
        assert_eq!(got.project_id, "SK-1000");
    }

    #[tokio::test]
    async fn dropping_the_receiver_releases_the_subscription() {
        let events = ProjectEvents::new();
        let rx = events.subscribe();
        assert_eq!(events.watcher_count(), 1);

        drop(rx);
        assert_eq!(events.watcher_count(), 0);

        // Publishing with no watchers is fine.
        events.publish(&sample());
    }
}
