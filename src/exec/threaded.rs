/*!
 * Threaded Dispatcher
 *
 * Platform implementation backing each execution context with an OS
 * thread parked on a gate, and each scheduler loop with a per-CPU gate
 * for the hand-off in the other direction. Context capacity is finite
 * so that context-memory exhaustion is a reachable condition.
 */

use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::dispatcher::{ContextId, Dispatcher, EntryPoint};
use crate::core::types::CpuId;
use crate::sync::Gate;

struct ThreadContext {
    /// Raised by a scheduler loop to run the context
    to_task: Gate,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadContext {
    fn new() -> Self {
        Self {
            to_task: Gate::new(),
            thread: Mutex::new(None),
        }
    }
}

/// Thread-per-context dispatcher
pub struct ThreadDispatcher {
    contexts: DashMap<ContextId, Arc<ThreadContext>, RandomState>,
    /// One hand-back gate per scheduler loop
    cpu_gates: DashMap<CpuId, Arc<Gate>, RandomState>,
    next_id: AtomicUsize,
    capacity: usize,
}

impl ThreadDispatcher {
    /// Create a dispatcher with room for `capacity` live contexts
    pub fn new(capacity: usize) -> Self {
        Self {
            contexts: DashMap::with_hasher(RandomState::new()),
            cpu_gates: DashMap::with_hasher(RandomState::new()),
            next_id: AtomicUsize::new(1),
            capacity,
        }
    }

    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn context(&self, ctx: ContextId) -> Arc<ThreadContext> {
        self.contexts
            .get(&ctx)
            .map(|entry| Arc::clone(&entry))
            .unwrap_or_else(|| panic!("dispatcher: unknown context {}", ctx))
    }

    fn cpu_gate(&self, cpu: CpuId) -> Arc<Gate> {
        self.cpu_gates
            .entry(cpu)
            .or_insert_with(|| Arc::new(Gate::new()))
            .clone()
    }
}

impl Dispatcher for ThreadDispatcher {
    fn allocate(&self, entry: EntryPoint) -> Option<ContextId> {
        if self.contexts.len() >= self.capacity {
            warn!(
                "Context allocation failed: {} contexts live, capacity {}",
                self.contexts.len(),
                self.capacity
            );
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let context = Arc::new(ThreadContext::new());

        let thread_context = Arc::clone(&context);
        let handle = std::thread::Builder::new()
            .name(format!("ctx-{}", id))
            .spawn(move || {
                // Parked until a scheduler loop selects this context.
                thread_context.to_task.pass();
                entry();
            })
            .ok()?;

        *context.thread.lock() = Some(handle);
        self.contexts.insert(id, context);
        debug!("Allocated context {}", id);
        Some(id)
    }

    fn resume(&self, cpu: CpuId, ctx: ContextId) {
        let gate = self.cpu_gate(cpu);
        self.context(ctx).to_task.open();
        gate.pass();
    }

    fn handoff(&self, cpu: CpuId) {
        self.cpu_gate(cpu).open();
    }

    fn yield_back(&self, ctx: ContextId) {
        self.context(ctx).to_task.pass();
    }

    fn release(&self, ctx: ContextId) {
        let Some((_, context)) = self.contexts.remove(&ctx) else {
            return;
        };
        // The retired thread has nothing left to do; joining it keeps the
        // zombie's stack alive exactly until its parent reaps it.
        if let Some(handle) = context.thread.lock().take() {
            if handle.join().is_err() {
                warn!("Context {} terminated by panic", ctx);
            }
        }
        debug!("Released context {}", ctx);
    }
}
