//! Subscriptions parameterized by live data
//!
//! A listener that closes over changing values must be rebuilt whenever those
//! values change. [`LiveSubscription`] remembers the inputs its current
//! registration was built from and reinstalls only when they differ,
//! releasing the old registration before installing the new one.

use super::broadcast::Subscription;
use crate::error::Result;

#[derive(Debug)]
pub struct LiveSubscription<D> {
    inputs: Option<D>,
    current: Option<Subscription>,
}

impl<D> Default for LiveSubscription<D> {
    fn default() -> Self {
        Self {
            inputs: None,
            current: None,
        }
    }
}

impl<D: PartialEq> LiveSubscription<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinstall through `install` unless `inputs` match the current ones
    ///
    /// Returns whether a new registration was installed. If `install` fails
    /// the subscription is left inactive and the next refresh retries.
    pub fn refresh<F>(&mut self, inputs: D, install: F) -> Result<bool>
    where
        F: FnOnce(&D) -> Result<Subscription>,
    {
        if self.current.is_some() && self.inputs.as_ref() == Some(&inputs) {
            return Ok(false);
        }

        self.release();
        let subscription = install(&inputs)?;
        self.current = Some(subscription);
        self.inputs = Some(inputs);
        Ok(true)
    }

    pub fn release(&mut self) {
        self.inputs = None;
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn inputs(&self) -> Option<&D> {
        self.inputs.as_ref()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.current.as_ref()
    }
}
