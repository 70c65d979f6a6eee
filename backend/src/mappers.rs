//! Conversions between domain models and the wire DTOs in `shared`.

use crate::domain::models::alarm::MedAlarm;
use crate::domain::models::pet::Pet;
use crate::domain::models::symptom::{SymptomDefinition, SymptomOption};

pub fn pet_to_dto(pet: &Pet) -> shared::Pet {
    shared::Pet {
        id: pet.id.clone(),
        user_id: pet.user_id.clone(),
        name: pet.name.clone(),
        birthday: pet.birthday,
        diseases: pet.diseases.clone(),
    }
}

pub fn alarm_to_dto(alarm: &MedAlarm) -> shared::MedAlarm {
    shared::MedAlarm {
        id: alarm.id.clone(),
        name: alarm.name.clone(),
        time: alarm.time,
        pet_id: alarm.pet_id.clone(),
    }
}

pub fn alarm_from_dto(dto: &shared::MedAlarm) -> MedAlarm {
    MedAlarm {
        id: dto.id.clone(),
        name: dto.name.clone(),
        time: dto.time,
        pet_id: dto.pet_id.clone(),
    }
}

pub fn definition_to_dto(def: &SymptomDefinition) -> shared::SymptomDefinition {
    shared::SymptomDefinition {
        id: def.id.clone(),
        label: def.label.clone(),
        options: def.options.iter().map(option_to_dto).collect(),
    }
}

fn option_to_dto(option: &SymptomOption) -> shared::SymptomOption {
    shared::SymptomOption {
        id: option.id.clone(),
        label: option.label.clone(),
    }
}
