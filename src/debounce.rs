// src/debounce.rs
//
// Latest-wins debounce wrapper around the encode pipeline.
//
// The core has no cancellation token: an in-flight encode runs to
// completion even when its result is already stale. This wrapper is the
// caller-side answer - rapid setting changes are coalesced over a quiet
// interval, only the newest request is encoded, and results that were
// superseded while encoding are dropped instead of delivered.

use crate::engine;
use crate::error::Result;
use crate::settings::{EncodedResult, ResizeSettings};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Quiet interval matching the original tool's 500 ms settings debounce.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
struct Request {
    generation: u64,
    source: Arc<Vec<u8>>,
    settings: ResizeSettings,
}

struct State {
    pending: Option<Request>,
    latest: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

/// Debounced, latest-wins front end to [`engine::encode`].
///
/// `submit` never blocks; the worker thread waits until no new submission
/// has arrived for the quiet interval, encodes the newest request, and
/// invokes the callback with the request's generation - unless a newer
/// submission landed while encoding, in which case the result is discarded.
pub struct DebouncedEncoder {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl DebouncedEncoder {
    pub fn new<F>(quiet_interval: Duration, mut on_result: F) -> Self
    where
        F: FnMut(u64, Result<EncodedResult>) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: None,
                latest: 0,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::spawn(move || loop {
            let request = {
                let mut state = worker_shared.state.lock();
                loop {
                    if state.shutdown {
                        return;
                    }
                    let Some(waiting_for) = state.pending.as_ref().map(|p| p.generation) else {
                        worker_shared.wakeup.wait(&mut state);
                        continue;
                    };
                    let timed_out = worker_shared
                        .wakeup
                        .wait_for(&mut state, quiet_interval)
                        .timed_out();
                    if state.shutdown {
                        return;
                    }
                    // A newer submission restarts the quiet interval; a
                    // spurious wakeup just waits again.
                    let still_same =
                        state.pending.as_ref().map(|p| p.generation) == Some(waiting_for);
                    if timed_out && still_same {
                        if let Some(request) = state.pending.take() {
                            break request;
                        }
                    }
                }
            };

            debug!(
                target: "bytefit::debounce",
                generation = request.generation,
                "encoding coalesced request"
            );
            let outcome = engine::encode(&request.source, &request.settings);

            let superseded = {
                let state = worker_shared.state.lock();
                state.latest != request.generation
            };
            if superseded {
                debug!(
                    target: "bytefit::debounce",
                    generation = request.generation,
                    "discarding stale result"
                );
            } else {
                on_result(request.generation, outcome);
            }
        });

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Wrapper with the original tool's 500 ms quiet interval.
    pub fn with_default_interval<F>(on_result: F) -> Self
    where
        F: FnMut(u64, Result<EncodedResult>) + Send + 'static,
    {
        Self::new(DEFAULT_QUIET_INTERVAL, on_result)
    }

    /// Queue a request, replacing any not-yet-started one. Returns the
    /// request's generation, which the callback echoes on delivery.
    pub fn submit(&self, source: Arc<Vec<u8>>, settings: ResizeSettings) -> u64 {
        let mut state = self.shared.state.lock();
        state.latest += 1;
        let generation = state.latest;
        state.pending = Some(Request {
            generation,
            source,
            settings,
        });
        self.shared.wakeup.notify_one();
        generation
    }
}

impl Drop for DebouncedEncoder {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
        }
        self.shared.wakeup.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
