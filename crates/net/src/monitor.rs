//! Per-transfer progress polling task

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressSink, ProgressState};
use crate::request::Method;

/// Polls a [`ProgressState`] on a fixed interval while one transfer runs
///
/// Each tick reports the current percentage to the sink (never lower than
/// the previous report) and forwards a cancellation request into the
/// transfer's abort token. A panicking sink is caught and ignored so the
/// dispatch path never sees it.
pub(crate) struct ProgressMonitor {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressMonitor {
    pub(crate) fn spawn(
        method: Method,
        state: Arc<ProgressState>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
        abort: CancellationToken,
        interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last = 0.0_f32;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {}
                }

                if state.is_complete() {
                    break;
                }

                if cancel.is_cancelled() {
                    state.request_cancel();
                    abort.cancel();
                    break;
                }

                let percent = state.percent(method);
                if percent > last {
                    last = percent;
                    let polled = catch_unwind(AssertUnwindSafe(|| sink.report(percent)));
                    if polled.is_err() {
                        tracing::debug!("progress sink panicked; continuing");
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Stop polling and wait until the task has exited
    pub(crate) async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            tracing::debug!(error = %e, "progress monitor ended abnormally");
        }
    }
}
