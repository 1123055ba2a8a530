// Runs against a real PostgreSQL instance only when LIVE_DATABASE_URL is set.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicStore, PgClinicStore};
use shared_models::{NewDoctor, NewSlot};

async fn live_store() -> Option<PgClinicStore> {
    let url = std::env::var("LIVE_DATABASE_URL").ok()?;
    let config = AppConfig {
        database_url: url,
        ..AppConfig::default()
    };
    let store = PgClinicStore::connect(&config).await.ok()?;
    store.migrate().await.ok()?;
    Some(store)
}

#[tokio::test]
async fn concurrent_claims_on_one_row_yield_one_winner() {
    let Some(store) = live_store().await else {
        println!("Skipping live PostgreSQL test (set LIVE_DATABASE_URL to enable)");
        return;
    };
    let store = Arc::new(store);

    let doctor = store
        .upsert_doctor(NewDoctor {
            name: format!("Dr. Live {}", Uuid::new_v4()),
            specialty: "Neurology".to_string(),
            email: format!("live-{}@clinic.com", Uuid::new_v4()),
            phone_number: None,
        })
        .await
        .unwrap();

    // Far future so refresh jobs running against the same database leave it alone.
    let start = Utc.with_ymd_and_hms(2099, 1, 5, 3, 30, 0).unwrap();
    let mut uow = store.begin().await.unwrap();
    uow.insert_slots(&[NewSlot {
        doctor_id: doctor.id,
        slot_date: start.date_naive(),
        start_time: start,
        end_time: start + Duration::hours(1),
        is_booked: false,
    }])
    .await
    .unwrap();
    uow.commit().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut uow = store.begin().await.unwrap();
            let claimed = uow.claim_slot(doctor.id, start).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            uow.commit().await.unwrap();
            claimed.is_some()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
