//! One-shot alarms delivered on a tokio runtime.

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Callback run when an alarm expires, given the context the alarm was set with.
pub type AlarmCallback = Arc<dyn Fn(i32) + Send + Sync>;

/// The runtime alarm callbacks are delivered on.
#[derive(Clone, Debug)]
pub struct AlarmQueue {
    handle: Handle,
}

impl AlarmQueue {
    pub fn new(handle: Handle) -> Self {
        AlarmQueue { handle }
    }

    /// Queue backed by the runtime of the caller. None outside of a runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(AlarmQueue::new)
    }
}

/// A named one-shot alarm. Dropping the alarm cancels it.
#[derive(Debug)]
pub struct Alarm {
    name: String,
    task: Option<JoinHandle<()>>,
}

impl Alarm {
    pub fn new(name: &str) -> Self {
        Alarm { name: name.to_string(), task: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedules `callback(context)` to run on `queue` after `delay`. A pending
    /// expiry of this alarm is cancelled first.
    pub fn set_on_queue(
        &mut self,
        delay: Duration,
        callback: AlarmCallback,
        context: i32,
        queue: &AlarmQueue,
    ) {
        self.cancel();

        let name = self.name.clone();
        self.task = Some(queue.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Alarm {} expired, context {}", name, context);
            callback(context);
        }));
    }

    /// Cancels a pending expiry. No-op if the alarm is not set.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns true while the alarm is set and has not yet expired.
    pub fn is_scheduled(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.cancel();
    }
}
