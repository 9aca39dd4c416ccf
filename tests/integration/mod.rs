//! Integration test suite for scriptflow.
//!
//! These tests exercise the full path from a script directory on disk
//! to a finished run report: tree construction, sequential leaves,
//! concurrent branches with barriers, pool drain, and dry runs.
//!
//! # Test Categories
//!
//! - `scheduler_e2e`: Full tree execution through the driver
//! - `pool_drain`: Worker pool registry and drain behavior
//!
//! # CI Compatibility
//!
//! All tests use an in-process recording backend and temporary
//! directories; nothing external is spawned.

mod fixtures;

mod pool_drain;
mod scheduler_e2e;
