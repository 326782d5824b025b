//! Device and process placement.
//!
//! The trainer never talks to hardware directly; it asks an [`Accelerator`]
//! which device it is on and which process rank it holds. A single-machine
//! run uses [`Accelerator::local`], and multi-process launchers construct one
//! per rank. Only placement metadata lives here, the trainer does not
//! schedule work across ranks itself.

use anyhow::{bail, Result};

/// Placement metadata for one trainer process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator {
    /// Device identifier, e.g. "cpu" or "cuda:0".
    device: String,
    /// Rank of this process, in `0..num_processes`.
    process_index: usize,
    /// Total number of cooperating processes.
    num_processes: usize,
}

impl Accelerator {
    /// Create an accelerator for one rank of a multi-process run.
    ///
    /// # Errors
    ///
    /// Fails when `process_index` is out of range for `num_processes`.
    pub fn new(device: impl Into<String>, process_index: usize, num_processes: usize) -> Result<Self> {
        if num_processes == 0 {
            bail!("num_processes must be at least 1");
        }
        if process_index >= num_processes {
            bail!(
                "process_index {} out of range for {} processes",
                process_index,
                num_processes
            );
        }
        Ok(Self {
            device: device.into(),
            process_index,
            num_processes,
        })
    }

    /// Single-process CPU placement.
    pub fn local() -> Self {
        Self {
            device: "cpu".to_string(),
            process_index: 0,
            num_processes: 1,
        }
    }

    /// Device identifier this process runs on.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Rank of this process.
    pub fn process_index(&self) -> usize {
        self.process_index
    }

    /// Total number of cooperating processes.
    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    /// Whether this process is rank zero.
    pub fn is_main_process(&self) -> bool {
        self.process_index == 0
    }
}

impl Default for Accelerator {
    fn default() -> Self {
        Self::local()
    }
}
