//! Render worker threads and the pool that owns them.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use log::warn;

use crate::document::PageIndex;
use crate::rasterizer::Rasterizer;
use crate::request::{RenderJob, RenderReply};

/// How long teardown waits for workers to finish their current page.
pub(crate) const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Body of one render worker thread.
///
/// Pulls jobs from the shared queue until a shutdown job arrives or the
/// queue disconnects. Failures are reported back, never panicked.
fn render_worker<R: Rasterizer>(
    rasterizer: R,
    jobs: Receiver<RenderJob>,
    replies: Sender<RenderReply>,
) {
    for job in jobs {
        match job {
            RenderJob::Page { page, resolution } => {
                let reply = match rasterizer.render_compressed(page, resolution) {
                    Ok(record) => RenderReply::Page(record),
                    Err(error) => RenderReply::Failed { page, error },
                };
                if replies.send(reply).is_err() {
                    // Controller is gone; nothing left to render for.
                    break;
                }
            }
            RenderJob::Shutdown => break,
        }
    }
}

/// The worker threads plus the sending half of the shared job queue.
///
/// flume channels are MPMC, so every worker clones the same receiver and
/// whichever worker is free picks up the next job.
pub(crate) struct WorkerPool {
    jobs: Sender<RenderJob>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers, each owning its own rasterizer clone.
    pub fn spawn<R>(count: usize, rasterizer: &R, replies: &Sender<RenderReply>) -> Self
    where
        R: Rasterizer + Clone + Send + 'static,
    {
        let (jobs, job_rx) = flume::unbounded::<RenderJob>();
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            let rasterizer = rasterizer.clone();
            let rx = job_rx.clone();
            let tx = replies.clone();
            handles.push(thread::spawn(move || render_worker(rasterizer, rx, tx)));
        }
        Self { jobs, handles }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Queue one render job. False only when every worker has exited.
    pub fn dispatch(&self, page: PageIndex, resolution: f64) -> bool {
        self.jobs
            .send(RenderJob::Page { page, resolution })
            .is_ok()
    }

    /// Ask every worker to finish its current page and exit, waiting at
    /// most `wait` overall. An unresponsive worker is detached, not killed.
    pub fn shutdown(&mut self, wait: Duration) {
        for _ in &self.handles {
            let _ = self.jobs.send(RenderJob::Shutdown);
        }
        let deadline = Instant::now() + wait;
        for handle in self.handles.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(SHUTDOWN_POLL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("render worker still busy at shutdown; detaching it");
            }
        }
    }
}
