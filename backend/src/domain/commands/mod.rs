pub mod alarms;
pub mod pets;
