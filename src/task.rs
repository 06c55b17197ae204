//! Deferred work on the UI thread.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Producers (observers, selector)                              │
//! │    post_task(closure) ──→ mpsc::UnboundedSender<Task>        │
//! └──────────────────────────────────────────────────────────────┘
//!                          │
//!                          v
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Owner (scenario loop / host event loop)                      │
//! │    run_until_idle() ──→ try_recv() until empty               │
//! │    tasks posted while draining run in the same drain         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks are `!Send` closures; the channel is only used as a FIFO owned by one thread.

use std::cell::RefCell;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub type Task = Box<dyn FnOnce()>;

pub struct TaskRunner {
    sender: UnboundedSender<Task>,
    receiver: RefCell<UnboundedReceiver<Task>>,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: RefCell::new(receiver),
        }
    }

    pub fn post_task(&self, task: impl FnOnce() + 'static) {
        if self.sender.send(Box::new(task)).is_err() {
            tracing::warn!("Dropping task posted to a closed task runner");
        }
    }

    /// Run queued tasks, including ones they post, until the queue is empty.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs so tasks may post more work
            let next = self.receiver.borrow_mut().try_recv();
            let Ok(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "Task queue drained");
        }
        ran
    }

    pub fn pending_task_count(&self) -> usize {
        self.receiver.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_tasks_run_in_order() {
        let runner = TaskRunner::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            runner.post_task(move || log.borrow_mut().push(i));
        }
        assert_eq!(runner.pending_task_count(), 3);
        assert!(log.borrow().is_empty());

        assert_eq!(runner.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(runner.pending_task_count(), 0);
    }

    #[test]
    fn test_tasks_posted_while_draining_run() {
        let runner = Rc::new(TaskRunner::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_runner = runner.clone();
        let inner_log = log.clone();
        runner.post_task(move || {
            inner_log.borrow_mut().push("outer");
            let log = inner_log.clone();
            inner_runner.post_task(move || log.borrow_mut().push("inner"));
        });

        assert_eq!(runner.run_until_idle(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_idle_runner() {
        assert_eq!(TaskRunner::default().run_until_idle(), 0);
    }
}
