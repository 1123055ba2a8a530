use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::AppointmentState;
use assistant_cell::AssistantState;
use doctor_cell::DoctorState;
use notification_cell::NotificationClients;
use shared_config::AppConfig;
use shared_database::{ClinicStore, MemoryClinicStore, PgClinicStore};

use router::Cells;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic booking API server");

    let config = AppConfig::from_env();
    let store = open_store(&config).await?;
    let clients = NotificationClients::from_config(&config);

    let cells = Cells {
        doctor: Arc::new(DoctorState::new(&config, store.clone(), clients.calendar.clone())),
        appointment: Arc::new(AppointmentState::new(&config, store, &clients)),
        assistant: Arc::new(AssistantState::new(&config)),
    };

    if config.seed_on_startup {
        match cells.doctor.seeder.seed_all(config.availability_horizon_days).await {
            Ok(report) => info!("Startup seed created {} slots", report.availability.slots_created),
            Err(e) => error!("Startup seed failed: {}", e),
        }
    }

    if config.availability_refresh_interval_secs > 0 {
        cells.doctor.refresh.clone().spawn_periodic(
            Duration::from_secs(config.availability_refresh_interval_secs),
            config.availability_horizon_days,
        );
    } else {
        warn!("Periodic availability refresh disabled");
    }

    cells.assistant.chat.sessions().spawn_purge(SESSION_PURGE_INTERVAL);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(&cells)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ClinicStore>> {
    if !config.has_database() {
        warn!("DATABASE_URL not set - using the in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryClinicStore::new()));
    }

    let store = PgClinicStore::connect(config)
        .await
        .context("failed to connect to PostgreSQL")?;
    store.migrate().await.context("failed to run migrations")?;
    Ok(Arc::new(store))
}
