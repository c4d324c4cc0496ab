//! Append-only per-job event log with live, replaying subscribers.
//!
//! The background runner is the only writer of a log. Readers never block the
//! writer for longer than a `Vec` clone of one element; they are woken through a
//! `watch` channel whose value is the log length after the latest append.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::watch;

use super::model::Event;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppendError {
    #[error("event log already holds a terminal event")]
    Sealed,
}

pub struct EventLog {
    events: RwLock<Vec<Event>>,
    appended: watch::Sender<usize>,
    finished_at: OnceLock<Instant>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            events: RwLock::new(Vec::new()),
            appended,
            finished_at: OnceLock::new(),
        }
    }

    /// Appends `event`, refusing anything after a terminal event.
    pub fn append(&self, event: Event) -> Result<(), AppendError> {
        let terminal = event.is_terminal();
        let len = {
            let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
            if events.last().is_some_and(Event::is_terminal) {
                return Err(AppendError::Sealed);
            }
            events.push(event);
            events.len()
        };

        if terminal {
            let _ = self.finished_at.set(Instant::now());
        }
        self.appended.send_replace(len);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<Event> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn last(&self) -> Option<Event> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// When the terminal event was appended, if it has been.
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at.get().copied()
    }

    /// Full history from the first event, then live events, ending after the
    /// terminal one. Dropping the stream just drops this reader's cursor.
    pub fn subscribe(self: &Arc<Self>) -> BoxStream<'static, Event> {
        let cursor = Cursor {
            log: Arc::clone(self),
            appended: self.appended.subscribe(),
            next: 0,
            finished: false,
        };

        stream::unfold(cursor, |mut cursor| async move {
            let event = cursor.next_event().await?;
            Some((event, cursor))
        })
        .boxed()
    }
}

struct Cursor {
    log: Arc<EventLog>,
    appended: watch::Receiver<usize>,
    next: usize,
    finished: bool,
}

impl Cursor {
    async fn next_event(&mut self) -> Option<Event> {
        if self.finished {
            return None;
        }

        loop {
            // Mark the current length as seen before looking, so an append that
            // lands after the lookup still wakes `changed()`.
            let _seen = *self.appended.borrow_and_update();

            if let Some(event) = self.log.get(self.next) {
                self.next += 1;
                self.finished = event.is_terminal();
                return Some(event);
            }

            if self.appended.changed().await.is_err() {
                return None;
            }
        }
    }
}
