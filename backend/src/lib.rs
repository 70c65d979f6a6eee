//! # Pet Tracker Backend
//!
//! Headless core of the pet health tracker: pet selection, medication
//! alarm scheduling, the symptom diary, and background report generation.
//! Domain services sit on top of SQLite-backed repositories; the platform
//! module holds the traits for everything the host system provides (wake-up
//! timers, notifications, the authenticated user). `rest` exposes the
//! services over HTTP for clients.

pub mod config;
pub mod domain;
pub mod mappers;
pub mod platform;
pub mod rest;
pub mod storage;
pub mod worker;
