//! In-process change feed.
//!
//! Every successful mutation is published as a [`ChangeEvent`]; the HTTP
//! layer streams them to browsers over SSE so open views can refetch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::define_text_enum;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

define_text_enum!(
    ChangeAction {
        Insert => "insert",
        Update => "update",
        Delete => "delete",
    }
);

define_text_enum!(
    /// Tables clients can subscribe to.
    ChangeTable {
        Employees => "employees",
        EmployeeAvailability => "employee_availability",
        Providers => "providers",
        Courses => "courses",
        CertificateDefinitions => "certificate_definitions",
        Trainings => "trainings",
        TrainingParticipants => "training_participants",
        EmployeeLicenses => "employee_licenses",
        PreliminaryPlans => "preliminary_plans",
        Profiles => "profiles",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub action: ChangeAction,
    pub id: i64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change; returns how many subscribers received it.
    pub fn publish(&self, table: ChangeTable, action: ChangeAction, id: impl Into<i64>) -> usize {
        let event = ChangeEvent {
            table,
            action,
            id: id.into(),
            at: Utc::now(),
        };
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all tables, or to `tables` when non-empty.
    pub fn subscribe(&self, tables: &[ChangeTable]) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
            tables: tables.iter().copied().collect(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    tables: HashSet<ChangeTable>,
}

impl ChangeSubscription {
    fn wants(&self, event: &ChangeEvent) -> bool {
        self.tables.is_empty() || self.tables.contains(&event.table)
    }

    /// Next matching event; `None` once the feed is gone. Events missed by a
    /// lagging subscriber are skipped.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Change subscriber lagged; skipped {} events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.publish(ChangeTable::Trainings, ChangeAction::Insert, 1), 0);
    }

    #[tokio::test]
    async fn test_table_filter() {
        let feed = ChangeFeed::default();
        let mut trainings = feed.subscribe(&[ChangeTable::Trainings]);
        let mut everything = feed.subscribe(&[]);

        feed.publish(ChangeTable::Employees, ChangeAction::Update, 7);
        feed.publish(ChangeTable::Trainings, ChangeAction::Delete, 3);

        let first = everything.next().await.unwrap();
        assert_eq!(first.table, ChangeTable::Employees);
        assert_eq!(first.id, 7);

        let only = trainings.next().await.unwrap();
        assert_eq!(only.table, ChangeTable::Trainings);
        assert_eq!(only.action, ChangeAction::Delete);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_missed_events() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe(&[]);
        for id in 1..=5 {
            feed.publish(ChangeTable::Courses, ChangeAction::Insert, id);
        }
        let next = subscription.next().await.unwrap();
        assert_eq!(next.id, 4);
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::default();
        let mut subscription = feed.subscribe(&[]);
        drop(feed);
        assert!(subscription.next().await.is_none());
    }

    #[test]
    fn test_event_json_shape() {
        let event = ChangeEvent {
            table: ChangeTable::TrainingParticipants,
            action: ChangeAction::Insert,
            id: 12,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "training_participants");
        assert_eq!(json["action"], "insert");
    }
}
