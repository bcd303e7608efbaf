//! Unit tests for pg-backup
//!
//! Artifact verification, retention pruning and configuration loading.

mod verify;
