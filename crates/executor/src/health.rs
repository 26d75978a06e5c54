use log::error;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};

use super::error::Error;

/// Tracks routines that panicked during this process.
///
/// A routine that panicked once is not run again; later calls fail with
/// [`Error::RoutineDisabled`].
#[derive(Debug, Default)]
pub struct HealthRegistry {
    disabled: BTreeSet<String>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self, routine: &str) -> bool {
        self.disabled.contains(routine)
    }

    /// Runs `job` under the name `routine`, disabling the routine if it panics.
    pub fn run<T, F>(&mut self, routine: &str, job: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error>,
    {
        if self.is_disabled(routine) {
            return Err(Error::RoutineDisabled(routine.to_string()));
        }

        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Routine '{}' panicked: {}. Disabling it.", routine, message);
                self.disabled.insert(routine.to_string());
                Err(Error::RoutinePanicked(routine.to_string(), message))
            }
        }
    }
}
