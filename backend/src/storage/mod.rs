pub mod sqlite;
pub mod traits;

pub use sqlite::connection::DbConnection;
pub use traits::{AlarmStore, PetStore, SymptomStore};
