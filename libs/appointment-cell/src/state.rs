use std::sync::Arc;

use notification_cell::{NotificationClients, NotificationFanout};
use shared_config::AppConfig;
use shared_database::ClinicStore;

use crate::services::{AppointmentBookingService, ReportingService};

pub struct AppointmentState {
    pub booking: AppointmentBookingService,
    pub reporting: ReportingService,
}

impl AppointmentState {
    pub fn new(config: &AppConfig, store: Arc<dyn ClinicStore>, clients: &NotificationClients) -> Self {
        let fanout = Arc::new(NotificationFanout::from_clients(clients, config));
        Self {
            booking: AppointmentBookingService::from_config(store.clone(), fanout, config),
            reporting: ReportingService::from_config(store, clients.chat.clone(), config),
        }
    }
}
