//! Session events pushed to the presentation layer.
//!
//! Every event carries the id of the session that produced it so a consumer
//! can ignore stragglers from a recipe that is no longer displayed.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::timer::TimerView;

/// Buffer up to 100 events per subscriber
pub const EVENT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEventKind {
    #[serde(rename_all = "camelCase")]
    SessionLoaded { recipe_id: i64 },
    #[serde(rename_all = "camelCase")]
    SessionDiscarded {
        recipe_id: i64,
        cancelled_timers: usize,
    },
    TimerChanged { timer: TimerView },
    #[serde(rename_all = "camelCase")]
    TimerCompleted { step_number: u32 },
    #[serde(rename_all = "camelCase")]
    ServingsChanged { requested_servings: u32 },
    CommentsRefreshed { total: usize, orphaned: usize },
    #[serde(rename_all = "camelCase")]
    RatingChanged { average: f64, own_score: Option<u8> },
}

/// Publishing half bound to a single session id.
#[derive(Clone)]
pub struct EventPublisher {
    session_id: Uuid,
    tx: broadcast::Sender<SessionEvent>,
}

impl EventPublisher {
    pub fn new(session_id: Uuid, tx: broadcast::Sender<SessionEvent>) -> Self {
        Self { session_id, tx }
    }

    pub fn publish(&self, kind: SessionEventKind) {
        // No subscribers is not an error.
        let _ = self.tx.send(SessionEvent {
            session_id: self.session_id,
            kind,
        });
    }
}
