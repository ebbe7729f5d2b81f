/*!
 * Process-Owned Resources
 *
 * Opaque stand-ins for the resources a process owns exclusively: open
 * file handles and the working directory are shared between parent and
 * child by reference count; the address space is private and duplicated
 * on fork.
 */

use serde::{Deserialize, Serialize};

use crate::core::errors::ProcessError;

/// An open file handle; shared ownership, reclaimed when the last
/// reference drops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    pub path: String,
}

impl FileHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Working directory reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingDir {
    pub path: String,
}

impl WorkingDir {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Private address-space record; only its size is visible here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpace {
    size: usize,
}

impl AddressSpace {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy the whole space for a forked child
    pub fn duplicate(&self) -> Result<Self, ProcessError> {
        Ok(Self { size: self.size })
    }
}
