//! Deferred disposal of retired GPU objects.
//!
//! GPU commands execute asynchronously, up to a few frames behind the CPU.
//! A compiled shader replaced by a hot reload may still be referenced by
//! command buffers the GPU has not finished, so it cannot be released when
//! the template swaps it out.
//!
//! ```text
//! push(obj)        queue (obj, current_frame)
//! frame_sync()     current_frame += 1
//!                  release every entry with current_frame - pushed >= K
//! flush_all()      release everything (GPU idle, shutdown only)
//! ```
//!
//! `K` is the in-flight frame depth. An object pushed at frame `N` survives
//! fewer than `K` syncs and is released by the first sync that reaches
//! frame `N + K`. With `K = 0` it is released by the next sync.

use std::collections::VecDeque;

/// Default in-flight frame depth.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Holds retired objects until `K` frame syncs have passed.
pub struct DeferredDisposer<T> {
    pending: VecDeque<(u64, T)>,
    current_frame: u64,
    frames_in_flight: u64,
}

impl<T> std::fmt::Debug for DeferredDisposer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredDisposer")
            .field("current_frame", &self.current_frame)
            .field("frames_in_flight", &self.frames_in_flight)
            .field("pending_count", &self.pending.len())
            .finish()
    }
}

impl<T> Default for DeferredDisposer<T> {
    fn default() -> Self {
        Self::new(MAX_FRAMES_IN_FLIGHT)
    }
}

impl<T> DeferredDisposer<T> {
    /// Create a disposer holding objects for `frames_in_flight` syncs.
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            current_frame: 0,
            frames_in_flight: frames_in_flight as u64,
        }
    }

    /// Queue an object for release.
    pub fn push(&mut self, object: T) {
        self.pending.push_back((self.current_frame, object));
    }

    /// Advance the frame counter and release every object that has waited
    /// at least `frames_in_flight` syncs. Returns the number released.
    pub fn frame_sync(&mut self) -> usize {
        self.current_frame += 1;

        // Entries are queued in frame order, so the ready ones are a prefix.
        let mut released = 0;
        while let Some((pushed, _)) = self.pending.front() {
            if self.current_frame - pushed < self.frames_in_flight {
                break;
            }
            self.pending.pop_front();
            released += 1;
        }

        if released > 0 {
            log::trace!(
                "Frame {}: released {} deferred objects, {} pending",
                self.current_frame,
                released,
                self.pending.len()
            );
        }
        released
    }

    /// Release everything immediately.
    ///
    /// Only valid once the GPU is idle, e.g. at shutdown.
    pub fn flush_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        if count > 0 {
            log::debug!("Flushed {count} deferred objects");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight as usize
    }
}

static_assertions::assert_impl_all!(DeferredDisposer<std::sync::Arc<crate::shader::CompiledStage>>: Send, Sync);
