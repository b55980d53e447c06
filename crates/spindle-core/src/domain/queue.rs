//! Queue filter and notification channel naming.
//!
//! The channel names are part of the producer/consumer contract: any store
//! implementation must derive them exactly like [`QueueFilter::channels`] and
//! [`channels_for_enqueue`] do.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Catch-all channel, used by workers without a queue filter.
pub const ANY_QUEUE_CHANNEL: &str = "spindle_any_queue";

/// Prefix of the per-queue channel (`spindle_queue#<queue>`).
pub const QUEUE_CHANNEL_PREFIX: &str = "spindle_queue#";

pub fn queue_channel(queue: &str) -> String {
    format!("{QUEUE_CHANNEL_PREFIX}{queue}")
}

/// Channels an enqueue into `queue` has to wake.
pub fn channels_for_enqueue(queue: &str) -> [String; 2] {
    [queue_channel(queue), ANY_QUEUE_CHANNEL.to_string()]
}

/// The set of queues a worker claims from.
///
/// `Any` matches every queue. An explicit but empty set is normalized to `Any`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueFilter {
    #[default]
    Any,
    Named(BTreeSet<String>),
}

impl QueueFilter {
    pub fn any() -> Self {
        QueueFilter::Any
    }

    pub fn named<I, S>(queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queues: BTreeSet<String> = queues.into_iter().map(Into::into).collect();
        if queues.is_empty() {
            QueueFilter::Any
        } else {
            QueueFilter::Named(queues)
        }
    }

    pub fn matches(&self, queue: &str) -> bool {
        match self {
            QueueFilter::Any => true,
            QueueFilter::Named(queues) => queues.contains(queue),
        }
    }

    /// Notification channels to listen on for this filter.
    pub fn channels(&self) -> Vec<String> {
        match self {
            QueueFilter::Any => vec![ANY_QUEUE_CHANNEL.to_string()],
            QueueFilter::Named(queues) => queues.iter().map(|q| queue_channel(q)).collect(),
        }
    }
}

impl std::fmt::Display for QueueFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueFilter::Any => f.write_str("*"),
            QueueFilter::Named(queues) => {
                let names: Vec<&str> = queues.iter().map(String::as_str).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}
