use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use notification_cell::{ChannelStatus, ChatNotifier};
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_utils::ClinicClock;

use crate::models::{
    AppointmentSummaryReport, PatientConditionMatch, PatientCountReport,
    PatientsWithConditionReport, ReportingError,
};

const SUMMARY_DATE_FORMAT: &str = "%B %d, %Y";

/// Read-only reports over the appointment ledger. Day boundaries are clinic midnights.
pub struct ReportingService {
    store: Arc<dyn ClinicStore>,
    chat: Option<Arc<dyn ChatNotifier>>,
    clock: ClinicClock,
    chat_timeout: Duration,
}

impl ReportingService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        chat: Option<Arc<dyn ChatNotifier>>,
        clock: ClinicClock,
        chat_timeout: Duration,
    ) -> Self {
        Self { store, chat, clock, chat_timeout }
    }

    pub fn from_config(store: Arc<dyn ClinicStore>, chat: Option<Arc<dyn ChatNotifier>>, config: &AppConfig) -> Self {
        Self::new(store, chat, ClinicClock::from_config(config), config.notification_timeout())
    }

    /// Formats the doctor's appointments for the day and posts them to the chat channel.
    pub async fn appointments_summary_for_doctor(
        &self,
        doctor_email: &str,
        target_date: Option<&str>,
    ) -> Result<AppointmentSummaryReport, ReportingError> {
        let doctor = self
            .store
            .find_doctor_by_email(doctor_email.trim())
            .await?
            .ok_or_else(|| ReportingError::NotFound(format!("Doctor with email {} not found.", doctor_email)))?;

        let date = self
            .clock
            .parse_date_or_today(target_date)
            .map_err(|e| ReportingError::Validation(e.to_string()))?;
        let (from, to) = self.clock.day_bounds(date);
        let appointments = self.store.appointments_between(doctor.id, from, to).await?;

        let name = doctor.display_name();
        let date_label = date.format(SUMMARY_DATE_FORMAT).to_string();

        if appointments.is_empty() {
            let message = format!("Dr. {} has no appointments scheduled for {}.", name, date_label);
            let chat_status = self.post_to_chat(&format!("Daily Summary for Dr. {}:\n{}", name, message)).await;
            return Ok(AppointmentSummaryReport {
                status: "success".to_string(),
                message,
                appointment_count: 0,
                chat_status,
            });
        }

        let mut lines = vec![format!("Daily Appointment Summary for Dr. {} ({}):", name, date_label)];
        for (i, row) in appointments.iter().enumerate() {
            let local = self.clock.to_local(row.appointment.appointment_time);
            lines.push(format!(
                "{}. Time: {}, Patient: {} ({}), Reason: {}, ID: {}",
                i + 1,
                local.format("%H:%M %Z"),
                row.patient_name,
                row.patient_email,
                row.appointment.reason.as_deref().unwrap_or("N/A"),
                row.appointment.id
            ));
        }
        let message = lines.join("\n");
        let chat_status = self.post_to_chat(&message).await;

        Ok(AppointmentSummaryReport {
            status: "success".to_string(),
            message,
            appointment_count: appointments.len(),
            chat_status,
        })
    }

    pub async fn patient_count_by_date(&self, target_date: &str) -> Result<PatientCountReport, ReportingError> {
        if target_date.trim().is_empty() {
            return Err(ReportingError::Validation("target_date_str is required.".to_string()));
        }

        let date = self
            .clock
            .parse_date(target_date)
            .map_err(|_| ReportingError::Validation("Invalid date format. Please use YYYY-MM-DD.".to_string()))?;
        let (from, to) = self.clock.day_bounds(date);
        let patient_count = self.store.count_patients_between(from, to).await?;

        let message = format!(
            "On {}, there are {} unique patients with appointments.",
            date.format("%Y-%m-%d"),
            patient_count
        );
        info!("{}", message);

        Ok(PatientCountReport {
            status: "success".to_string(),
            message,
            date,
            patient_count,
        })
    }

    pub async fn patients_with_condition(&self, condition: &str) -> Result<PatientsWithConditionReport, ReportingError> {
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(ReportingError::Validation("Condition must be provided.".to_string()));
        }

        let patients: Vec<PatientConditionMatch> = self
            .store
            .patients_with_condition(condition)
            .await?
            .into_iter()
            .map(|p| PatientConditionMatch {
                patient_name: p.name,
                patient_email: p.email,
                condition: p.condition,
            })
            .collect();

        let message = if patients.is_empty() {
            format!("No patients found with condition '{}'.", condition)
        } else {
            format!("Found {} patients.", patients.len())
        };

        Ok(PatientsWithConditionReport {
            status: "success".to_string(),
            message,
            patients,
        })
    }

    async fn post_to_chat(&self, text: &str) -> ChannelStatus {
        let Some(chat) = &self.chat else {
            return ChannelStatus::Skipped("chat not configured".to_string());
        };

        match tokio::time::timeout(self.chat_timeout, chat.post(text)).await {
            Ok(Ok(())) => ChannelStatus::Delivered("Summary posted to chat.".to_string()),
            Ok(Err(e)) => {
                warn!("Posting summary to chat failed: {}", e);
                ChannelStatus::Failed(e.to_string())
            }
            Err(_) => {
                warn!("Posting summary to chat timed out");
                ChannelStatus::Failed("Request timed out".to_string())
            }
        }
    }
}
