use std::sync::Arc;

use notification_cell::CalendarService;
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_utils::ClinicClock;

use crate::services::{
    AvailabilityRefreshService, AvailabilityService, DoctorDirectoryService, SeederService,
};

pub struct DoctorState {
    pub directory: Arc<DoctorDirectoryService>,
    pub availability: AvailabilityService,
    pub refresh: Arc<AvailabilityRefreshService>,
    pub seeder: SeederService,
    pub horizon_days: u32,
}

impl DoctorState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn ClinicStore>,
        calendar: Option<Arc<dyn CalendarService>>,
    ) -> Self {
        let directory = Arc::new(DoctorDirectoryService::new(store.clone()));
        let refresh = Arc::new(AvailabilityRefreshService::from_config(store.clone(), config));

        Self {
            availability: AvailabilityService::new(
                store.clone(),
                directory.clone(),
                calendar,
                ClinicClock::from_config(config),
                config.notification_timeout(),
            ),
            seeder: SeederService::new(store, refresh.clone()),
            directory,
            refresh,
            horizon_days: config.availability_horizon_days,
        }
    }
}
