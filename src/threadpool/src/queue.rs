use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a bounded wait on [`SafeQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    Item(T),
    /// Nothing arrived before the timeout.
    Empty,
    /// The queue is closed and fully drained.
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A FIFO shared between producers and consumers.
///
/// `push` wakes a single waiter. `close` wakes all of them; items queued
/// before the close are still handed out, after which every `pop` reports
/// [`Pop::Closed`].
pub struct SafeQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
}

impl<T> Default for SafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SafeQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    // Nothing runs foreign code under this lock, so a poisoned guard still
    // protects a consistent deque.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` to the tail, or hands it back if the queue is closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Takes the head item, waiting at most `timeout` for one to show up.
    ///
    /// A timeout too large to be represented as a deadline waits until an
    /// item arrives or the queue is closed.
    pub fn pop(&self, timeout: Duration) -> Pop<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Pop::Item(item);
            }
            if state.closed {
                return Pop::Closed;
            }
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Pop::Empty;
                    }
                    self.not_empty
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .not_empty
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Refuses further pushes and wakes every waiting consumer. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn pops_in_push_order() {
        let queue = SafeQueue::new();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 5);
        for i in 0..5 {
            assert_eq!(queue.pop(POP_TIMEOUT), Pop::Item(i));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_times_out_on_empty_queue() {
        let queue = SafeQueue::<u32>::new();
        let start = Instant::now();
        assert_eq!(queue.pop(Duration::from_millis(50)), Pop::Empty);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn pop_wakes_on_push() {
        let queue = Arc::new(SafeQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push("hello").unwrap();
        assert_eq!(consumer.join().unwrap(), Pop::Item("hello"));
    }

    #[test]
    fn unbounded_timeout_waits_for_push_or_close() {
        let queue = Arc::new(SafeQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || (queue.pop(Duration::MAX), queue.pop(Duration::MAX)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(7).unwrap();
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), (Pop::Item(7), Pop::Closed));
    }

    #[test]
    fn close_drains_then_reports_closed() {
        let queue = SafeQueue::new();
        queue.push(1).unwrap();
        queue.close();
        assert!(queue.is_closed());
        assert_eq!(queue.push(2), Err(2));
        assert_eq!(queue.pop(POP_TIMEOUT), Pop::Item(1));
        assert_eq!(queue.pop(POP_TIMEOUT), Pop::Closed);
    }

    #[test]
    fn close_wakes_every_waiter() {
        let queue = Arc::new(SafeQueue::<u32>::new());
        let waiters = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.pop(Duration::from_secs(10)))
            })
            .collect::<Vec<_>>();
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        queue.close();
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Pop::Closed);
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn concurrent_consumers_never_share_an_item() {
        let queue = Arc::new(SafeQueue::new());
        for i in 0..1000 {
            queue.push(i).unwrap();
        }
        queue.close();
        let consumers = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Pop::Item(i) = queue.pop(POP_TIMEOUT) {
                        seen.push(i);
                    }
                    seen
                })
            })
            .collect::<Vec<_>>();
        let mut all = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect::<Vec<_>>();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
