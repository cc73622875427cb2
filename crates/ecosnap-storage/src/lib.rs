// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite workflow and audit store for EcoSnap.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, an additive
//! column check that runs on every open, retry-with-backoff for writes that
//! hit `SQLITE_BUSY`, and typed queries for workflows and audit records.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod schema;
pub mod writer;

pub use adapter::SqliteStore;
pub use database::Database;
pub use writer::RetryPolicy;
