//! Axum handlers over the domain services. This is the surface the
//! (out-of-scope) UI talks to; handlers stay thin and translate
//! `DomainError` into status codes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use shared::{
    AddDiseaseRequest, ChangeDateRequest, CreateAlarmRequest, CreateAlarmResponse,
    CreatePetRequest, DeletePetResponse, GenerateReportResponse, PetListResponse,
    SelectOptionRequest, SetExactAlarmPermissionRequest,
};
use std::sync::Arc;
use tracing::info;

use crate::domain::commands::alarms::{CreateAlarmCommand, ScheduleOutcome};
use crate::domain::commands::pets::CreatePetCommand;
use crate::domain::errors::DomainError;
use crate::domain::models::alarm::next_trigger_instant;
use crate::domain::{
    AlarmScheduleService, PetSelectionService, ReportService, SymptomDiaryService,
};
use crate::mappers;
use crate::platform::TokioWakeUpTimer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pets: Arc<PetSelectionService>,
    pub alarms: Arc<AlarmScheduleService>,
    pub diary: Arc<SymptomDiaryService>,
    pub reports: Arc<ReportService>,
    pub timer: Arc<TokioWakeUpTimer>,
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/pets", get(list_pets).post(create_pet))
        .route("/pets/:id", delete(delete_pet))
        .route("/pets/:id/select", post(select_pet))
        .route("/pets/:id/diseases", post(add_disease))
        .route("/pets/:id/alarms", get(list_alarms))
        .route("/alarms", post(create_alarm))
        .route("/alarms/remove", post(remove_alarm))
        .route("/diary", get(diary_state))
        .route("/diary/option", post(diary_select_option))
        .route("/diary/save", post(diary_save))
        .route("/diary/date", post(diary_change_date))
        .route("/reports", post(generate_report))
        .route("/permissions/exact-alarms", post(set_exact_alarm_permission));

    Router::new().nest("/api", api_routes).with_state(state)
}

fn error_response(e: DomainError) -> Response {
    match e {
        DomainError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        DomainError::NotFound(what) => {
            (StatusCode::NOT_FOUND, format!("{} not found", what)).into_response()
        }
        DomainError::PermissionDenied => (
            StatusCode::FORBIDDEN,
            "exact alarm permission not granted".to_string(),
        )
            .into_response(),
        DomainError::Persistence(err) => {
            tracing::error!("Storage failure: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "storage error").into_response()
        }
    }
}

/// GET /api/pets
async fn list_pets(State(state): State<AppState>) -> impl IntoResponse {
    let pets = state.pets.pets_snapshot();
    let response = PetListResponse {
        pets: pets.iter().map(mappers::pet_to_dto).collect(),
        selected_pet_id: state.pets.selected_pet_snapshot().map(|p| p.id),
    };
    (StatusCode::OK, Json(response))
}

/// POST /api/pets
async fn create_pet(
    State(state): State<AppState>,
    Json(request): Json<CreatePetRequest>,
) -> impl IntoResponse {
    info!("POST /api/pets - name: {}", request.name);

    let command = CreatePetCommand {
        name: request.name,
        birthday: request.birthday,
    };
    match state.pets.add_pet(command).await {
        Ok(result) => (StatusCode::CREATED, Json(mappers::pet_to_dto(&result.pet))).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/pets/:id
async fn delete_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/pets/{}", pet_id);

    let pet = state
        .pets
        .pets_snapshot()
        .into_iter()
        .find(|p| p.id == pet_id);
    let Some(pet) = pet else {
        return (StatusCode::NOT_FOUND, "pet not found").into_response();
    };

    match state.pets.delete_pet(&pet).await {
        Ok(result) => (
            StatusCode::OK,
            Json(DeletePetResponse {
                success_message: result.success_message,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/pets/:id/select
async fn select_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/pets/{}/select", pet_id);

    state.pets.select_pet_by_id(&pet_id);
    let selected = state
        .pets
        .selected_pet_snapshot()
        .map(|p| mappers::pet_to_dto(&p));
    (StatusCode::OK, Json(selected))
}

/// POST /api/pets/:id/diseases
async fn add_disease(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
    Json(request): Json<AddDiseaseRequest>,
) -> impl IntoResponse {
    info!("POST /api/pets/{}/diseases - {}", pet_id, request.disease);

    let pet = state
        .pets
        .pets_snapshot()
        .into_iter()
        .find(|p| p.id == pet_id);
    let Some(pet) = pet else {
        return (StatusCode::NOT_FOUND, "pet not found").into_response();
    };

    match state.pets.add_disease_to_pet(&request.disease, &pet).await {
        Ok(Some(updated)) => (StatusCode::OK, Json(mappers::pet_to_dto(&updated))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "pet not found").into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/pets/:id/alarms
async fn list_alarms(
    State(state): State<AppState>,
    Path(pet_id): Path<String>,
) -> impl IntoResponse {
    match state.alarms.alarms_for_pet(&pet_id).await {
        Ok(view) => {
            let alarms: Vec<shared::MedAlarm> =
                view.borrow().iter().map(mappers::alarm_to_dto).collect();
            (StatusCode::OK, Json(alarms)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/alarms
async fn create_alarm(
    State(state): State<AppState>,
    Json(request): Json<CreateAlarmRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/alarms - {} for pet {} at {:02}:{:02}",
        request.name, request.pet_id, request.hour, request.minute
    );

    if request.hour > 23 || request.minute > 59 {
        return (StatusCode::BAD_REQUEST, "invalid wall-clock time").into_response();
    }

    let command = CreateAlarmCommand {
        name: request.name,
        pet_id: request.pet_id,
        time: next_trigger_instant(request.hour, request.minute),
    };
    match state.alarms.add_alarm(command).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(CreateAlarmResponse {
                alarm: mappers::alarm_to_dto(&result.alarm),
                scheduled: result.outcome == ScheduleOutcome::Scheduled,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/alarms/remove
async fn remove_alarm(
    State(state): State<AppState>,
    Json(request): Json<shared::MedAlarm>,
) -> impl IntoResponse {
    info!("POST /api/alarms/remove - {}", request.name);

    let alarm = mappers::alarm_from_dto(&request);
    match state.alarms.remove_alarm(&alarm).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/diary
async fn diary_state(State(state): State<AppState>) -> impl IntoResponse {
    // A failed load lands in the published state; return it either way
    let _ = state.diary.load_entry().await;
    (StatusCode::OK, Json(state.diary.state_snapshot()))
}

/// POST /api/diary/option
async fn diary_select_option(
    State(state): State<AppState>,
    Json(request): Json<SelectOptionRequest>,
) -> impl IntoResponse {
    state
        .diary
        .select_option(&request.symptom_id, &request.option_id)
        .await;
    (StatusCode::OK, Json(state.diary.state_snapshot()))
}

/// POST /api/diary/save
async fn diary_save(State(state): State<AppState>) -> impl IntoResponse {
    match state.diary.save().await {
        Ok(()) => (StatusCode::OK, Json(state.diary.state_snapshot())).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/diary/date
async fn diary_change_date(
    State(state): State<AppState>,
    Json(request): Json<ChangeDateRequest>,
) -> impl IntoResponse {
    let result = match (request.date, request.delta_days) {
        (Some(date), _) => state.diary.change_to_date(date).await,
        (None, Some(delta)) => state.diary.change_date(delta).await,
        (None, None) => {
            return (StatusCode::BAD_REQUEST, "date or delta_days required").into_response()
        }
    };
    match result {
        Ok(()) => (StatusCode::OK, Json(state.diary.state_snapshot())).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/reports
async fn generate_report(State(state): State<AppState>) -> impl IntoResponse {
    match state.reports.generate_in_background().await {
        Ok(queued) => (
            StatusCode::ACCEPTED,
            Json(GenerateReportResponse {
                entry_count: queued.entry_count,
                pet_name: queued.pet_name,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/permissions/exact-alarms
async fn set_exact_alarm_permission(
    State(state): State<AppState>,
    Json(request): Json<SetExactAlarmPermissionRequest>,
) -> impl IntoResponse {
    state.timer.set_exact_permission(request.granted);
    StatusCode::NO_CONTENT
}
