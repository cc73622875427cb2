// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoped ownership of the gate.

use crate::gate::FileGate;

/// Holds the gate until released or dropped.
///
/// Dropping the guard releases the token, so an early return or a panic while
/// the backend call is in flight never leaves the gate held.
#[must_use = "dropping the guard releases the gate immediately"]
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a FileGate,
    released: bool,
}

impl<'a> GateGuard<'a> {
    pub(crate) fn new(gate: &'a FileGate) -> Self {
        Self {
            gate,
            released: false,
        }
    }

    pub fn holder_id(&self) -> &str {
        self.gate.holder_id()
    }

    /// Release now and report whether the token was ours to remove.
    pub fn release(mut self) -> bool {
        self.released = true;
        self.gate.release()
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.gate.release();
        }
    }
}
