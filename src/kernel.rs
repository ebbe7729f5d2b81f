/*!
 * Kernel Facade
 *
 * One initialization call builds a fully-owned instance of the process
 * table, clock, dispatcher, and semaphore service. Nothing is ambient:
 * every test constructs its own kernel.
 */

use log::info;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::core::limits::{
    DEFAULT_CPUS, DEFAULT_MAX_PROCESSES, DEFAULT_SEMAPHORE_SLOTS, STARVATION_THRESHOLD,
};
use crate::core::types::{Channel, Tick};
use crate::exec::{Dispatcher, ThreadDispatcher};
use crate::process::table::Table;
use crate::sem::SemaphoreService;
use crate::sync::SpinLock;
use crate::time::TickClock;

/// Kernel construction parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct KernelConfig {
    /// Process table capacity
    pub max_processes: usize,
    /// Counting-semaphore slot count
    pub semaphore_slots: usize,
    /// Number of scheduler loops
    pub cpus: usize,
    /// Aging rounds before promotion to tier 1
    pub starvation_threshold: Tick,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_processes: DEFAULT_MAX_PROCESSES,
            semaphore_slots: DEFAULT_SEMAPHORE_SLOTS,
            cpus: DEFAULT_CPUS,
            starvation_threshold: STARVATION_THRESHOLD,
        }
    }
}

/// Builder for [`Kernel`]
pub struct KernelBuilder {
    config: KernelConfig,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
            dispatcher: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Process table capacity
    pub fn with_max_processes(mut self, capacity: usize) -> Self {
        self.config.max_processes = capacity;
        self
    }

    /// Number of scheduler loops
    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.config.cpus = cpus;
        self
    }

    /// Supply a custom platform dispatcher
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Build the kernel
    pub fn build(self) -> Kernel {
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(ThreadDispatcher::new(self.config.max_processes)));

        info!(
            "Kernel initialized: {} slots, {} semaphores, {} cpus",
            self.config.max_processes, self.config.semaphore_slots, self.config.cpus
        );

        Kernel {
            table: Arc::new(SpinLock::new(
                "ptable",
                Table::new(self.config.max_processes, self.config.cpus),
            )),
            clock: Arc::new(TickClock::new()),
            semaphores: Arc::new(SemaphoreService::new(self.config.semaphore_slots)),
            dispatcher,
            shutdown: Arc::new(AtomicBool::new(false)),
            config: self.config,
        }
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one kernel instance; clones share the same state
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) table: Arc<SpinLock<Table>>,
    pub(crate) clock: Arc<TickClock>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) semaphores: Arc<SemaphoreService>,
    pub(crate) shutdown: Arc<AtomicBool>,
}

impl Clone for Kernel {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            table: Arc::clone(&self.table),
            clock: Arc::clone(&self.clock),
            dispatcher: Arc::clone(&self.dispatcher),
            semaphores: Arc::clone(&self.semaphores),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl Kernel {
    /// Kernel with default configuration
    pub fn new() -> Self {
        KernelBuilder::new().build()
    }

    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// External timer entry point: advance the clock one tick and wake
    /// timed sleepers
    pub fn tick(&self) -> Tick {
        let now = self.clock.advance();
        self.wakeup(Channel::Clock);
        now
    }

    /// Ticks elapsed since the kernel was built
    pub fn uptime(&self) -> Tick {
        self.clock.now()
    }

    /// Ask every scheduler loop to stop once idle
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Spawn a timer thread ticking at `interval` until shutdown
    ///
    /// Convenience stand-in for the external timer collaborator.
    pub fn spawn_timer(&self, interval: Duration) -> JoinHandle<()> {
        let kernel = self.clone();
        std::thread::Builder::new()
            .name("timer".into())
            .spawn(move || {
                while !kernel.is_shutdown() {
                    std::thread::sleep(interval);
                    kernel.tick();
                }
            })
            .expect("failed to spawn timer thread")
    }

    /// Drive the configured number of scheduler loops until shutdown
    ///
    /// CPU 0 runs on the calling thread; the rest get their own threads,
    /// joined before returning.
    pub fn run(&self) {
        let extra: Vec<_> = (1..self.config.cpus)
            .map(|cpu| {
                let kernel = self.clone();
                std::thread::Builder::new()
                    .name(format!("cpu-{}", cpu))
                    .spawn(move || kernel.run_cpu(cpu))
                    .expect("failed to spawn scheduler thread")
            })
            .collect();

        self.run_cpu(0);

        for handle in extra {
            handle.join().expect("scheduler loop panicked");
        }
        info!("All scheduler loops stopped");
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
