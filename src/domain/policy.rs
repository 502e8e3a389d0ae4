//! Failure policies for multi-row reads and multi-statement writes.
//!
//! Read paths (portfolio listing, historical series) are best-effort: a
//! row or date that fails is logged and dropped so the rest of the answer
//! still reaches the caller. The reward write path is all-or-nothing: the
//! first failing statement aborts the unit of work.

use std::fmt;

/// How a sequence of fallible steps reacts to a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    /// Log the failure and skip the step.
    ReadBestEffort,
    /// Propagate the first failure.
    WriteAtomic,
}

impl ConsistencyPolicy {
    /// Passes one step's result through the policy.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` for a skipped
    /// failure under [`ConsistencyPolicy::ReadBestEffort`].
    ///
    /// # Errors
    ///
    /// Under [`ConsistencyPolicy::WriteAtomic`] the step's error is returned
    /// unchanged.
    pub fn admit<T, E: fmt::Display>(
        self,
        what: &str,
        result: Result<T, E>,
    ) -> Result<Option<T>, E> {
        match (self, result) {
            (_, Ok(value)) => Ok(Some(value)),
            (Self::ReadBestEffort, Err(e)) => {
                tracing::warn!(step = what, error = %e, "skipping failed step");
                Ok(None)
            }
            (Self::WriteAtomic, Err(e)) => Err(e),
        }
    }

    /// Collects step results, applying [`ConsistencyPolicy::admit`] to each.
    ///
    /// # Errors
    ///
    /// Under [`ConsistencyPolicy::WriteAtomic`] returns the first error.
    pub fn collect<T, E, I>(self, what: &str, results: I) -> Result<Vec<T>, E>
    where
        E: fmt::Display,
        I: IntoIterator<Item = Result<T, E>>,
    {
        let mut out = Vec::new();
        for result in results {
            if let Some(value) = self.admit(what, result)? {
                out.push(value);
            }
        }
        Ok(out)
    }
}
