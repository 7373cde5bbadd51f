//! Capture-request admission queue.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use reelcast_models::{CaptureQueueItem, PostId, QueueItemStatus};

use crate::error::{EngineError, EngineResult};

/// Result of a dequeue scan.
#[derive(Debug, Default)]
pub struct DequeueOutcome {
    /// Highest-ranked admissible item, removed from the queue.
    pub next: Option<CaptureQueueItem>,
    /// Items lazily evicted because their deadline passed.
    pub expired: Vec<CaptureQueueItem>,
}

/// Priority-and-expiry-aware queue of pending capture requests.
///
/// Holds at most one entry per post. Dequeue order is
/// `(priority desc, created_at asc)`: higher priority first, FIFO within a
/// priority band.
#[derive(Debug, Default)]
pub struct CaptureQueue {
    items: Vec<CaptureQueueItem>,
}

/// `(priority desc, created_at asc)`, item id as a stable final tie-break.
fn rank(a: &CaptureQueueItem, b: &CaptureQueueItem) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.as_str().cmp(b.id.as_str()))
}

impl CaptureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an item. Fails with `Conflict` if an item for the same post
    /// already exists.
    pub fn enqueue(&mut self, item: CaptureQueueItem) -> EngineResult<()> {
        if self.items.iter().any(|i| i.post_id == item.post_id) {
            return Err(EngineError::conflict(format!(
                "queue already holds an item for post {}",
                item.post_id
            )));
        }
        debug!(
            item_id = %item.id,
            post_id = %item.post_id,
            camera_id = %item.camera_id,
            priority = item.priority,
            "Enqueued capture request"
        );
        self.items.push(item);
        Ok(())
    }

    /// Remove and return the highest-ranked admissible item.
    ///
    /// Items past their deadline are evicted on this scan (marked
    /// [`QueueItemStatus::Expired`]) and reported instead of returned.
    /// Cameras in `busy_cameras` are skipped so a physical camera never
    /// serves two simultaneous captures.
    pub fn dequeue(&mut self, busy_cameras: &HashSet<String>, now: DateTime<Utc>) -> DequeueOutcome {
        let mut outcome = DequeueOutcome::default();

        let mut kept = Vec::with_capacity(self.items.len());
        for mut item in self.items.drain(..) {
            if item.is_expired(now) {
                item.status = QueueItemStatus::Expired;
                warn!(
                    item_id = %item.id,
                    post_id = %item.post_id,
                    "Capture request expired before execution"
                );
                outcome.expired.push(item);
            } else {
                kept.push(item);
            }
        }
        self.items = kept;

        let best = self
            .items
            .iter()
            .filter(|i| !busy_cameras.contains(&i.camera_id))
            .min_by(|a, b| rank(a, b))
            .map(|i| i.id.clone());

        if let Some(id) = best {
            let pos = self.items.iter().position(|i| i.id == id);
            outcome.next = pos.map(|p| self.items.remove(p));
        }

        outcome
    }

    /// Remove a still-queued item by owning post. Returns `None` if no item
    /// for the post is queued (capture already started, or unknown post).
    pub fn remove(&mut self, post_id: &PostId) -> Option<CaptureQueueItem> {
        let pos = self.items.iter().position(|i| &i.post_id == post_id)?;
        let mut item = self.items.remove(pos);
        item.status = QueueItemStatus::Cancelled;
        Some(item)
    }

    /// Whether the queue holds an item for the post.
    pub fn contains(&self, post_id: &PostId) -> bool {
        self.items.iter().any(|i| &i.post_id == post_id)
    }

    /// Pending items in dequeue order.
    pub fn snapshot(&self) -> Vec<CaptureQueueItem> {
        let mut items = self.items.clone();
        items.sort_by(rank);
        items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(camera: &str, priority: i32) -> CaptureQueueItem {
        CaptureQueueItem::new(PostId::new(), camera, priority)
    }

    #[test]
    fn test_dequeue_priority_order() {
        let mut queue = CaptureQueue::new();
        let now = Utc::now();
        // equal timestamps, priorities [1, 5, 3]
        for (i, priority) in [1, 5, 3].into_iter().enumerate() {
            let mut it = item(&format!("cam-{i}"), priority);
            it.created_at = now;
            queue.enqueue(it).unwrap();
        }

        let busy = HashSet::new();
        let order: Vec<i32> = (0..3)
            .map(|_| queue.dequeue(&busy, now).next.unwrap().priority)
            .collect();
        assert_eq!(order, vec![5, 3, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_fifo_within_priority_band() {
        let mut queue = CaptureQueue::new();
        let now = Utc::now();
        let mut first = item("cam-1", 2);
        first.created_at = now - Duration::seconds(10);
        let mut second = item("cam-2", 2);
        second.created_at = now;
        let first_id = first.id.clone();

        // enqueue newest first to prove arrival time decides, not insert order
        queue.enqueue(second).unwrap();
        queue.enqueue(first).unwrap();

        let busy = HashSet::new();
        assert_eq!(queue.dequeue(&busy, now).next.unwrap().id, first_id);
    }

    #[test]
    fn test_expired_items_evicted_not_returned() {
        let mut queue = CaptureQueue::new();
        let now = Utc::now();
        let expired = item("cam-1", 10).with_expiry(now - Duration::seconds(1));
        let live = item("cam-2", 0);
        let live_id = live.id.clone();
        queue.enqueue(expired).unwrap();
        queue.enqueue(live).unwrap();

        let outcome = queue.dequeue(&HashSet::new(), now);
        assert_eq!(outcome.next.unwrap().id, live_id);
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].status, QueueItemStatus::Expired);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_duplicate_post_conflicts() {
        let mut queue = CaptureQueue::new();
        let post_id = PostId::new();
        queue
            .enqueue(CaptureQueueItem::new(post_id.clone(), "cam-1", 0))
            .unwrap();
        let err = queue
            .enqueue(CaptureQueueItem::new(post_id, "cam-1", 5))
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn test_busy_camera_skipped() {
        let mut queue = CaptureQueue::new();
        let high = item("cam-1", 10);
        let low = item("cam-2", 1);
        let low_id = low.id.clone();
        queue.enqueue(high).unwrap();
        queue.enqueue(low).unwrap();

        let busy: HashSet<String> = ["cam-1".to_string()].into_iter().collect();
        let outcome = queue.dequeue(&busy, Utc::now());
        // cam-1 is capturing, so the lower-priority cam-2 item is served
        assert_eq!(outcome.next.unwrap().id, low_id);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_marks_cancelled() {
        let mut queue = CaptureQueue::new();
        let it = item("cam-1", 0);
        let post_id = it.post_id.clone();
        queue.enqueue(it).unwrap();

        let removed = queue.remove(&post_id).unwrap();
        assert_eq!(removed.status, QueueItemStatus::Cancelled);
        assert!(queue.remove(&post_id).is_none());
    }

    #[test]
    fn test_snapshot_is_in_dequeue_order() {
        let mut queue = CaptureQueue::new();
        for priority in [3, 9, 1] {
            queue.enqueue(item("cam", priority)).unwrap();
        }
        let priorities: Vec<i32> = queue.snapshot().iter().map(|i| i.priority).collect();
        assert_eq!(priorities, vec![9, 3, 1]);
        assert_eq!(queue.len(), 3);
    }
}
