use crate::domain::models::pet::Pet;
use chrono::NaiveDate;

/// Command to create a new pet for the authenticated user
#[derive(Debug, Clone)]
pub struct CreatePetCommand {
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CreatePetResult {
    pub pet: Pet,
}

#[derive(Debug, Clone)]
pub struct DeletePetResult {
    pub success_message: String,
}
