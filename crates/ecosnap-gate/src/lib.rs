// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exclusive gate serializing access to the AI backend across processes.
//!
//! The gate is a token file created atomically on acquisition and removed by
//! its holder on release. A holder that crashes leaves the token behind; once
//! it is older than the staleness threshold any waiter (or the idle sweep,
//! [`FileGate::reclaim_stale`]) removes it.

pub mod gate;
pub mod guard;
pub mod token;

pub use gate::FileGate;
pub use guard::GateGuard;
