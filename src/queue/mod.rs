//! Bounded task queue whose consumers are also its producers.
//!
//! The queue is never closed. Every enqueue bumps a pending counter before the
//! task becomes visible and every finished task releases it again; when the
//! counter reaches zero the termination watcher flips the stop signal and all
//! waiting consumers return `None`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use tokio::sync::{mpsc, watch, Mutex, Notify};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// A fully-qualified URL waiting to be fuzzed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Task {
    url: String,
}

impl Task {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Pending work reached zero.
    Drained,
    /// Aborted through [`TaskQueue::cancel`].
    Cancelled,
}

#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
    rx: Mutex<mpsc::Receiver<Task>>,
    // worker-side spill when the channel is full; drained before the channel
    overflow: StdMutex<VecDeque<Task>>,
    overflow_ready: Notify,
    pending: AtomicUsize,
    idle: Notify,
    stop: watch::Sender<Option<StopReason>>,
}

/// Holds one unit of pending work; releases it on drop.
#[must_use = "dropping the guard releases the pending unit immediately"]
#[derive(Debug)]
pub struct PendingGuard<'a> {
    queue: &'a TaskQueue,
}

impl PendingGuard<'_> {
    /// Leaves the unit pending; it now belongs to the queued task.
    fn keep(self) {
        std::mem::forget(self);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.queue.release();
    }
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (stop, _) = watch::channel(None);
        Self {
            tx,
            rx: Mutex::new(rx),
            overflow: StdMutex::new(VecDeque::new()),
            overflow_ready: Notify::new(),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            stop,
        }
    }

    /// Tasks queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        *self.stop.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_reason().is_some()
    }

    /// Aborts the run. Waiting consumers return `None`; queued tasks are dropped.
    pub fn cancel(&self) {
        self.signal_stop(StopReason::Cancelled);
    }

    /// Resolves once the queue has been stopped for any reason.
    pub async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        let _ = rx.wait_for(|reason| reason.is_some()).await;
    }

    /// Registers a unit of pending work that is not a task, such as the
    /// seeding phase. The run cannot drain while the guard is alive.
    pub fn hold(&self) -> PendingGuard<'_> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        PendingGuard { queue: self }
    }

    /// Takes ownership of the pending unit of a task returned by
    /// [`TaskQueue::dequeue`]. Drop it once the task is fully processed,
    /// discoveries included.
    pub fn adopt(&self) -> PendingGuard<'_> {
        PendingGuard { queue: self }
    }

    /// Enqueues a task, waiting while the buffer is full. Returns false if
    /// the queue stopped first.
    pub async fn enqueue(&self, task: Task) -> bool {
        if self.is_stopped() {
            return false;
        }
        // released if this future is dropped or the send fails
        let reservation = self.hold();
        tokio::select! {
            biased;
            _ = self.stopped() => false,
            sent = self.tx.send(task) => {
                if sent.is_err() {
                    return false;
                }
                reservation.keep();
                true
            }
        }
    }

    /// Enqueues a task found by a worker. Never waits: a full buffer spills
    /// into the overflow list so a pool of blocked producers cannot starve
    /// itself of consumers.
    pub fn enqueue_discovered(&self, task: Task) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(task)) => {
                self.lock_overflow().push_back(task);
                self.overflow_ready.notify_one();
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.release();
                false
            }
        }
    }

    /// Next task, or `None` once the queue is stopped.
    pub async fn dequeue(&self) -> Option<Task> {
        loop {
            if self.is_stopped() {
                return None;
            }
            let spilled = self.lock_overflow().pop_front();
            if spilled.is_some() {
                return spilled;
            }
            tokio::select! {
                biased;
                _ = self.stopped() => return None,
                _ = self.overflow_ready.notified() => continue,
                task = async { self.rx.lock().await.recv().await } => return task,
            }
        }
    }

    /// Waits until pending work reaches zero or the queue is cancelled, then
    /// stops every consumer.
    pub async fn watch_termination(&self) -> StopReason {
        loop {
            if let Some(reason) = self.stop_reason() {
                return reason;
            }
            if self.pending() == 0 {
                self.signal_stop(StopReason::Drained);
                continue;
            }
            tokio::select! {
                _ = self.idle.notified() => {}
                _ = self.stopped() => {}
            }
        }
    }

    fn release(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "pending counter underflow");
        if previous == 1 {
            // notify_one stores a permit, so a watcher that has not started
            // waiting yet still sees it
            self.idle.notify_one();
        }
    }

    fn signal_stop(&self, reason: StopReason) {
        self.stop.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    fn lock_overflow(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        match self.overflow.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    async fn drain(queue: Arc<TaskQueue>, seen: Arc<StdMutex<Vec<String>>>) {
        while let Some(task) = queue.dequeue().await {
            let _done = queue.adopt();
            seen.lock().unwrap().push(task.url().to_string());
        }
    }

    #[tokio::test]
    async fn seeds_are_drained_then_watcher_stops() {
        let queue = Arc::new(TaskQueue::new(4));
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seeding = queue.hold();

        let watcher = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.watch_termination().await }
        });
        let workers: Vec<_> = (0..3)
            .map(|_| tokio::spawn(drain(Arc::clone(&queue), Arc::clone(&seen))))
            .collect();

        for i in 0..20 {
            assert!(queue.enqueue(Task::new(format!("http://x.test/{i}"))).await);
        }
        drop(seeding);

        assert_eq!(watcher.await.unwrap(), StopReason::Drained);
        for w in workers {
            w.await.unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 20);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn self_feeding_workers_terminate_after_finite_discovery() {
        // capacity 1 forces discoveries through the overflow list
        let queue = Arc::new(TaskQueue::new(1));
        let processed = Arc::new(StdMutex::new(HashSet::new()));
        let seeding = queue.hold();

        let watcher = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.watch_termination().await }
        });
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let processed = Arc::clone(&processed);
                tokio::spawn(async move {
                    while let Some(task) = queue.dequeue().await {
                        let _done = queue.adopt();
                        let depth = task.url().matches("/n").count();
                        if depth < 4 {
                            for child in 0..3 {
                                let url = format!("{}/n{child}", task.url());
                                assert!(queue.enqueue_discovered(Task::new(url)));
                            }
                        }
                        tokio::task::yield_now().await;
                        processed.lock().unwrap().insert(task.url().to_string());
                    }
                })
            })
            .collect();

        assert!(queue.enqueue(Task::new("http://x.test")).await);
        drop(seeding);

        assert_eq!(watcher.await.unwrap(), StopReason::Drained);
        for w in workers {
            w.await.unwrap();
        }
        // 1 + 3 + 9 + 27 + 81
        assert_eq!(processed.lock().unwrap().len(), 121);
    }

    #[tokio::test]
    async fn watcher_waits_while_work_is_in_flight() {
        let queue = Arc::new(TaskQueue::new(4));
        let in_flight = queue.hold();

        let watcher = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.watch_termination().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!watcher.is_finished());
        assert!(!queue.is_stopped());

        drop(in_flight);
        assert_eq!(watcher.await.unwrap(), StopReason::Drained);
    }

    #[tokio::test]
    async fn enqueue_applies_backpressure_when_full() {
        let queue = TaskQueue::new(1);
        assert!(queue.enqueue(Task::new("http://x.test/a")).await);
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), queue.enqueue(Task::new("b"))).await;
        assert!(blocked.is_err());
        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test]
    async fn cancel_wakes_consumers_and_rejects_new_work() {
        let queue = Arc::new(TaskQueue::new(4));
        let consumer = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.dequeue().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.cancel();

        assert_eq!(consumer.await.unwrap(), None);
        assert_eq!(queue.stop_reason(), Some(StopReason::Cancelled));
        assert!(!queue.enqueue(Task::new("http://x.test/late")).await);
        assert!(!queue.enqueue_discovered(Task::new("http://x.test/late")));
        assert_eq!(queue.watch_termination().await, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn empty_run_drains_immediately() {
        let queue = TaskQueue::new(4);
        assert_eq!(queue.watch_termination().await, StopReason::Drained);
        assert_eq!(queue.dequeue().await, None);
    }
}
