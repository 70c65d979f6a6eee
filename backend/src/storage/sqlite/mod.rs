//! # SQLite Storage Module
//!
//! SQLite-backed implementations of the storage traits. Pets and symptom
//! entries are stored as keyed rows with JSON columns for their list/map
//! valued fields; alarms get a plain table with an ordered per-pet index
//! and a live watch-channel view on top.

pub mod alarm_repository;
pub mod connection;
pub mod pet_repository;
pub mod symptom_repository;

pub use alarm_repository::AlarmRepository;
pub use connection::DbConnection;
pub use pet_repository::PetRepository;
pub use symptom_repository::SymptomRepository;
