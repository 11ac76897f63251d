//! Pull-based access to the events of a download run.
//!
//! Download tasks push [`Progress`] snapshots into a channel as they go.
//! A [`Bridge`] hands them out one at a time, to be pulled by a consumer
//! that reacts to each event before asking for the next. Once every task
//! has finished and the channel is drained, it yields [`Event::Complete`].
//!
//! Both async and blocking consumers are supported:
//!
//! ```rust
//! loop {
//!     let event = bridge.next().await;
//!     if event.is_complete() {
//!         break;
//!     }
//! }
//!
//! // From a thread outside the runtime:
//! let event = bridge.blocking_next();
//! ```

use tokio::sync::mpsc;

use crate::events::{Event, Progress};

/// Receiving end of a download run.
#[derive(Debug)]
pub struct Bridge {
    rx: mpsc::UnboundedReceiver<Progress>,
    complete: bool,
}

impl Bridge {
    #[must_use]
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Progress>) -> Self {
        Self {
            rx,
            complete: false,
        }
    }

    /// Waits for the next event of the run.
    ///
    /// After [`Event::Complete`] has been returned once, every further call
    /// returns it again immediately.
    pub async fn next(&mut self) -> Event {
        if self.complete {
            return Event::Complete;
        }

        let received = self.rx.recv().await;
        self.wrap(received)
    }

    /// Blocks the current thread until the next event of the run.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    #[must_use]
    pub fn blocking_next(&mut self) -> Event {
        if self.complete {
            return Event::Complete;
        }

        let received = self.rx.blocking_recv();
        self.wrap(received)
    }

    /// Whether [`Event::Complete`] has been returned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn wrap(&mut self, received: Option<Progress>) -> Event {
        if let Some(progress) = received {
            Event::Progress(progress)
        } else {
            trace!("download run complete");
            self.complete = true;
            Event::Complete
        }
    }
}
