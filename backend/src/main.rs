use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pet_tracker_backend::config::Config;
use pet_tracker_backend::domain::models::symptom::{SymptomDefinition, SymptomOption};
use pet_tracker_backend::domain::{
    AlarmScheduleService, PetSelectionService, ReportService, SymptomDiaryService,
};
use pet_tracker_backend::platform::{LogNotifier, ReminderNotifier, StaticAuthProvider, TokioWakeUpTimer};
use pet_tracker_backend::rest::{self, AppState};
use pet_tracker_backend::storage::sqlite::{AlarmRepository, PetRepository, SymptomRepository};
use pet_tracker_backend::storage::DbConnection;
use pet_tracker_backend::worker::{ReportRenderer, TokioRenderQueue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    let pet_repository = PetRepository::new(db.clone());
    let alarm_repository = AlarmRepository::new(db.clone());
    let symptom_repository = SymptomRepository::new(db);
    symptom_repository
        .seed_definitions_if_empty(&default_symptom_definitions())
        .await?;

    let (timer, fired_rx) = TokioWakeUpTimer::new(config.exact_alarms_enabled);
    let notifier: Arc<dyn ReminderNotifier> = Arc::new(LogNotifier);
    let auth = Arc::new(StaticAuthProvider::new(config.user_id.clone()));

    let pets = Arc::new(PetSelectionService::new(
        pet_repository,
        alarm_repository.clone(),
        auth,
    ));
    let alarms = Arc::new(AlarmScheduleService::new(
        alarm_repository,
        timer.clone(),
        notifier.clone(),
    ));
    // Fired wake-ups re-enter the alarm service for notify + reschedule
    tokio::spawn(alarms.clone().run(fired_rx));

    let diary = Arc::new(SymptomDiaryService::new(
        symptom_repository.clone(),
        pets.clone(),
    ));
    let reports = Arc::new(ReportService::new(
        symptom_repository,
        pets.clone(),
        Arc::new(TokioRenderQueue::new(
            ReportRenderer::new(config.report_output_dir()),
            notifier,
        )),
    ));

    if let Err(e) = pets.load_pets().await {
        warn!("Initial pet load failed: {}", e);
    }

    // CORS setup to allow a local frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let state = AppState {
        pets,
        alarms,
        diary,
        reports,
        timer,
    };
    let app = rest::router(state).layer(cors);

    info!("Starting server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Reference data seeded on first run; an existing set always wins.
fn default_symptom_definitions() -> Vec<SymptomDefinition> {
    fn option(id: &str, label: &str) -> SymptomOption {
        SymptomOption {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    vec![
        SymptomDefinition {
            id: "appetite".to_string(),
            label: "Appetite".to_string(),
            options: vec![
                option("none", "Not eating"),
                option("low", "Eating less"),
                option("normal", "Normal"),
            ],
        },
        SymptomDefinition {
            id: "energy".to_string(),
            label: "Energy".to_string(),
            options: vec![
                option("lethargic", "Lethargic"),
                option("normal", "Normal"),
                option("hyper", "Restless"),
            ],
        },
        SymptomDefinition {
            id: "vomiting".to_string(),
            label: "Vomiting".to_string(),
            options: vec![
                option("none", "None"),
                option("once", "Once"),
                option("repeated", "Several times"),
            ],
        },
        SymptomDefinition {
            id: "stool".to_string(),
            label: "Stool".to_string(),
            options: vec![
                option("normal", "Normal"),
                option("soft", "Soft"),
                option("diarrhea", "Diarrhea"),
            ],
        },
    ]
}
