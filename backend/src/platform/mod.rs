//! Traits for everything the host platform provides: the authenticated
//! user, user-facing notifications, and the exact wake-up timer facility.

pub mod auth;
pub mod notifier;
pub mod wake_timer;

pub use auth::{AuthProvider, StaticAuthProvider};
pub use notifier::{LogNotifier, ReminderNotifier};
pub use wake_timer::{FiredWakeUp, TokioWakeUpTimer, WakeUpPayload, WakeUpTimer};
