// ABOUTME: Library entry point for the workout template data-access layer
// ABOUTME: Bulk assembly, two-tier caching, ordered mutations and the last-used snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Workout Templates
//!
//! Read and write access to workout templates stored in a remote relational
//! store as three normalized tables plus an exercise catalog.
//!
//! ## Architecture
//!
//! - **Assembler**: builds template graphs in a constant number of queries
//! - **Cache**: in-memory tier over a durable key/value tier, per domain
//! - **Mutations**: ordered inserts and deletes followed by cache invalidation
//! - **Last used**: single persisted "resume this" template
//! - **Service**: the caller-facing handle tying the above together
//!
//! Domain models and the error type live in `workout_templates_core`.

/// Template graph assembly from remote rows
pub mod assembler;

/// Memory and disk template cache
pub mod cache;

/// Exercise catalog lookups with a local cache
pub mod catalog;

/// Injectable time source
pub mod clock;

/// Environment configuration and cache policy
pub mod config;

/// Key names, TTL defaults and environment variable names
pub mod constants;

/// Last used template slot
pub mod last_used;

/// Tracing subscriber setup
pub mod logging;

/// Template writes
pub mod mutations;

/// Remote relational store contract and `SQLite` implementation
pub mod remote;

/// Caller-facing template API
pub mod service;

/// Durable key/value store contract and implementations
pub mod storage;

pub use service::TemplateService;
pub use workout_templates_core::errors::{AppError, AppResult, ErrorCode};
