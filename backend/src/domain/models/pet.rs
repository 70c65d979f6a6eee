use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain model representing a pet in the system.
/// Owned by the remote pet collection; cached by the selection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
    pub diseases: Vec<String>,
}

impl Pet {
    /// Generate a unique ID for a pet
    pub fn generate_id() -> String {
        format!("pet::{}", Uuid::new_v4())
    }

    /// Whole years since the birthday, or None when the birthday is unknown
    pub fn age_years(&self) -> Option<i32> {
        let birthday = self.birthday?;
        let today = Utc::now().date_naive();
        let mut age = today.year() - birthday.year();
        if today.ordinal() < birthday.ordinal() {
            age -= 1;
        }
        Some(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet_with_birthday(birthday: Option<NaiveDate>) -> Pet {
        Pet {
            id: Pet::generate_id(),
            user_id: "user-1".to_string(),
            name: "Luna".to_string(),
            birthday,
            diseases: Vec::new(),
        }
    }

    #[test]
    fn test_age_unknown_without_birthday() {
        assert_eq!(pet_with_birthday(None).age_years(), None);
    }

    #[test]
    fn test_age_counts_whole_years() {
        let today = Utc::now().date_naive();
        let five_years_ago = NaiveDate::from_ymd_opt(today.year() - 5, 1, 1).unwrap();
        let age = pet_with_birthday(Some(five_years_ago)).age_years().unwrap();
        // Depending on where in the year we are, the last birthday may not
        // have passed yet.
        assert!(age == 5 || age == 4);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(Pet::generate_id(), Pet::generate_id());
    }
}
