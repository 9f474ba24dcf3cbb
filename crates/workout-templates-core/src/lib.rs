// ABOUTME: Core domain types shared by the workout template data-access layer
// ABOUTME: Template graph models, identifiers, drafts and the unified error type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Workout Templates Core
//!
//! Plain data types with no I/O. The main `workout_templates` crate builds the
//! caching and assembly machinery on top of these.

/// Unified error handling with standard error codes
pub mod errors;

/// Template graph models, identifiers and write drafts
pub mod models;
