/*!
 * Gate
 *
 * One-way hand-off signal between a scheduler loop and an execution
 * context. The signal is buffered: an `open` that races ahead of the
 * matching `pass` is not lost.
 */

use parking_lot::{Condvar, Mutex};

/// Flag-buffered binary signal
pub struct Gate {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Raise the signal, releasing one `pass` (now or in the future)
    pub fn open(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.condvar.notify_one();
    }

    /// Block until the signal is raised, then consume it
    pub fn pass(&self) {
        let mut pending = self.pending.lock();
        while !*pending {
            self.condvar.wait(&mut pending);
        }
        *pending = false;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
