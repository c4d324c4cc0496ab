use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures_util::stream::{self, BoxStream, StreamExt};
use uuid::Uuid;

use super::events::EventLog;
use super::model::{Event, Job};

pub struct JobEntry {
    pub job: Job,
    pub events: Arc<EventLog>,
}

/// In-memory table of every job submitted during this process's lifetime.
///
/// The table lock only guards insert, lookup and eviction; appends and reads go
/// through the per-job [`EventLog`].
#[derive(Default)]
pub struct JobTable {
    jobs: RwLock<HashMap<Uuid, Arc<JobEntry>>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job` with an empty event log and hands back the log.
    pub fn insert(&self, job: Job) -> Arc<EventLog> {
        let events = Arc::new(EventLog::new());
        let entry = Arc::new(JobEntry {
            job,
            events: Arc::clone(&events),
        });
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.job.id, entry);
        events
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<JobEntry>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Event stream for `id`; empty when the job is unknown.
    pub fn subscribe(&self, id: &Uuid) -> BoxStream<'static, Event> {
        match self.get(id) {
            Some(entry) => entry.events.subscribe(),
            None => stream::empty().boxed(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drops jobs whose terminal event is older than `retention`. Running jobs
    /// are always kept. Returns how many entries were removed.
    pub fn evict_finished(&self, retention: Duration, now: Instant) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, entry| match entry.events.finished_at() {
            Some(at) => now.saturating_duration_since(at) < retention,
            None => true,
        });
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ffmpeg::probe::MediaGeometry;
    use serde_json::json;
    use std::path::PathBuf;
    use time::OffsetDateTime;

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            source_path: PathBuf::from("/tmp/in.mp4"),
            output_path: PathBuf::from("/tmp/in_shaded_30.mp4"),
            output_name: "in_shaded_30.mp4".into(),
            geometry: MediaGeometry::FALLBACK,
            frame_rate: 30,
            shader_source: String::new(),
            shader_params: json!({}),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn unknown_job_yields_empty_stream() {
        let table = JobTable::new();
        let events: Vec<Event> = table.subscribe(&Uuid::new_v4()).collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn inserted_job_is_subscribable() {
        let table = JobTable::new();
        let job = job();
        let id = job.id;
        let log = table.insert(job);
        log.append(Event::Progress { percent: 5 }).unwrap();
        log.append(Event::Failed).unwrap();

        let events: Vec<Event> = table.subscribe(&id).collect().await;
        assert_eq!(events, vec![Event::Progress { percent: 5 }, Event::Failed]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn eviction_only_touches_old_finished_jobs() {
        let table = JobTable::new();
        let running = job();
        let finished = job();
        let running_id = running.id;
        let finished_id = finished.id;
        table.insert(running);
        table
            .insert(finished)
            .append(Event::Done { output: "/download/x.mp4".into() })
            .unwrap();

        let retention = Duration::from_secs(60);
        assert_eq!(table.evict_finished(retention, Instant::now()), 0);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(table.evict_finished(retention, later), 1);
        assert!(table.get(&finished_id).is_none());
        assert!(table.get(&running_id).is_some());
    }
}
