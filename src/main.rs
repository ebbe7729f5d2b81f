/*!
 * Triq Kernel - Demo Entry Point
 *
 * Boots a kernel instance, runs a mixed workload across the three
 * feedback queues, exercises the semaphore service with a dining table
 * of philosophers, attaches a tracer, and prints the process table
 * along the way.
 */

use log::{info, warn};
use std::time::Duration;

use triq_kernel::{Kernel, Process};

/// Philosophers around the table; one chopstick semaphore each
const PHILOSOPHERS: usize = 6;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Triq kernel starting");
    let kernel = Kernel::builder().with_cpus(2).build();

    // External timer collaborator keeping ticks moving.
    let timer = kernel.spawn_timer(Duration::from_millis(1));

    kernel.start(workload).expect("failed to start root process");
    kernel.run();

    timer.join().expect("timer thread panicked");
    info!("Triq kernel stopped");
}

/// Root process body
fn workload(root: &Process) {
    let kernel = root.kernel().clone();

    spawn_tier_workers(root);
    spawn_philosophers(root);
    spawn_traced_pair(root);

    // Let the workload make some progress, then show the table.
    root.sleep_ticks(20).expect("root interrupted");
    println!("\n{}", kernel.dump_table());

    while root.wait().is_ok() {}

    println!("\nFinal table:\n{}", kernel.dump_table());
    let snapshot = serde_json::to_string_pretty(&kernel.snapshot()).expect("snapshot serializes");
    println!("\nSnapshot:\n{}", snapshot);
}

/// One compute-and-yield worker per feedback queue, plus a biased one
fn spawn_tier_workers(root: &Process) {
    let kernel = root.kernel().clone();

    for tier in 1..=3u8 {
        let name = format!("worker-q{}", tier);
        let pid = root
            .spawn(&name, |me| {
                for _ in 0..40 {
                    me.yield_now();
                    if me.killed() {
                        return;
                    }
                }
            })
            .expect("failed to spawn worker");
        if let Err(err) = kernel.set_queue(pid, tier) {
            warn!("Worker {} finished before placement: {}", pid, err);
        }
    }

    // A heavily biased straggler in the response-ratio tier.
    let pid = root
        .spawn("favored", |me| {
            for _ in 0..40 {
                me.yield_now();
            }
        })
        .expect("failed to spawn favored worker");
    if kernel.set_queue(pid, 3).is_ok() {
        let _ = kernel.set_bias(pid, 8);
    }
}

/// Dining philosophers over the semaphore service
fn spawn_philosophers(root: &Process) {
    let kernel = root.kernel();
    for stick in 0..PHILOSOPHERS {
        kernel.sem_init(stick, 1).expect("chopstick slot taken");
    }

    for seat in 0..PHILOSOPHERS {
        let left = seat;
        let right = (seat + 1) % PHILOSOPHERS;
        // Grab the lower-numbered chopstick first so the table cannot
        // deadlock.
        let (first, second) = (left.min(right), left.max(right));

        let name = format!("phil-{}", seat);
        root.spawn(&name, move |me| {
            for _ in 0..5 {
                if me.sem_acquire(first).is_err() {
                    return;
                }
                if me.sem_acquire(second).is_err() {
                    let _ = me.sem_release(first);
                    return;
                }
                // Eating.
                me.yield_now();
                me.sem_release(second).expect("chopstick disappeared");
                me.sem_release(first).expect("chopstick disappeared");
                // Thinking.
                me.yield_now();
            }
        })
        .expect("failed to seat philosopher");
    }
}

/// A sleepy target and the tracer that adopts and reaps it
fn spawn_traced_pair(root: &Process) {
    let target_pid = root
        .spawn("target", |me| {
            let _ = me.sleep_ticks(10);
            if let Some(ancestor) = me.logical_parent() {
                info!("Target {} reports logical parent {}", me.pid(), ancestor);
            }
        })
        .expect("failed to spawn target");

    root.spawn("tracer", move |me| {
        if me.trace(target_pid).is_err() {
            // Target already gone; nothing to adopt.
            return;
        }
        match me.wait() {
            Ok(reaped) => info!("Tracer {} reaped traced process {}", me.pid(), reaped),
            Err(err) => info!("Tracer {} found nothing to reap: {}", me.pid(), err),
        }
    })
    .expect("failed to spawn tracer");
}
