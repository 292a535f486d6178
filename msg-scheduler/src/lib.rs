/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! msg-scheduler – time-triggered message schedule synthesis
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── topology/     – nodes, links, relay paths
//! ├── flow/         – periodic applications and the dependency-ordered flow set
//! ├── hyperperiod/  – LCM / GCD helpers
//! ├── backend/      – constraint sink / solver seam + built-in search backend
//! ├── scheduler/    – constraint generation, model extraction, retry driver
//! ├── schedule.rs   – the synthesized (link, slot) → flow-instance table
//! ├── config/       – scheduler settings and YAML scenario files
//! └── generator.rs  – random tree scenarios
//! ```

pub mod backend;
pub mod config;
pub mod flow;
pub mod generator;
pub mod hyperperiod;
pub mod schedule;
pub mod scheduler;
pub mod topology;
