use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorError, DoctorStatus};
use doctor_cell::services::doctor::DoctorService;
use notification_cell::{AppointmentNotice, NotificationService};
use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::pagination::Paginated;

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    DoctorSummary, PatientSummary,
};
use crate::services::conflict::SlotConflictService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locks::SlotLocks;

pub struct AppointmentBookingService {
    store: StoreClient,
    conflict_service: SlotConflictService,
    lifecycle_service: AppointmentLifecycleService,
    doctor_service: DoctorService,
    notifier: Arc<NotificationService>,
    locks: Arc<SlotLocks>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, notifier: Arc<NotificationService>, locks: Arc<SlotLocks>) -> Self {
        Self {
            store: StoreClient::new(config),
            conflict_service: SlotConflictService::new(config),
            lifecycle_service: AppointmentLifecycleService::new(),
            doctor_service: DoctorService::new(config),
            notifier,
            locks,
        }
    }

    /// Book a slot for a patient. The per-doctor lock is held across the
    /// conflict check and the insert so concurrent requests for the same
    /// doctor cannot both pass the check.
    pub async fn book(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        info!("Booking appointment for user {} with doctor {}", user_id, request.doctor_id);

        let doctor = self
            .doctor_service
            .get_doctor(request.doctor_id)
            .await
            .map_err(map_doctor_error)?;

        if doctor.status != DoctorStatus::Approved {
            return Err(AppointmentError::DoctorNotApproved);
        }

        let _guard = self.locks.acquire(doctor.id).await;

        let taken = self
            .conflict_service
            .slot_is_taken(doctor.id, request.date.date_naive(), &request.time, None)
            .await?;
        if taken {
            warn!(
                "Slot {} {} already booked for doctor {}",
                request.date.date_naive(),
                request.time,
                doctor.id
            );
            return Err(AppointmentError::SlotTaken);
        }

        let now = Utc::now();
        let appointment_doc = json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor.id,
            "user_id": user_id,
            "date": request.date,
            "time": request.time,
            "document": request.document,
            "status": AppointmentStatus::Pending,
            "notes": "",
            "reason": request.reason,
            "consultation_type": request.consultation_type.unwrap_or_default(),
            "prescription": null,
            "follow_up_required": false,
            "follow_up_date": null,
            "created_at": now,
            "updated_at": now
        });

        let created = self
            .store
            .insert("appointments", appointment_doc)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        let appointment = parse_appointment(created)?;

        let patient = self.fetch_patient(user_id).await?;
        let details = AppointmentDetails {
            doctor: Some(summarize_doctor(&doctor)),
            patient,
            appointment,
        };

        // Fan-out is best-effort; the booking is already committed.
        let notice = build_notice(&details, &doctor);
        self.notifier.appointment_created(&notice).await;

        info!("Appointment {} booked with doctor {}", details.appointment.id, doctor.id);
        Ok(details)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        self.list_page(format!("user_id=eq.{}", user_id), page, limit)
            .await
    }

    /// Listing for the calling doctor, resolved through their doctor
    /// profile rather than trusting the caller-supplied identifier.
    pub async fn list_for_doctor_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        let doctor = self
            .doctor_service
            .get_by_user(user_id)
            .await
            .map_err(map_doctor_error)?
            .ok_or(AppointmentError::DoctorProfileMissing)?;

        self.list_page(format!("doctor_id=eq.{}", doctor.id), page, limit)
            .await
    }

    pub async fn list_all(
        &self,
        page: i64,
        limit: i64,
        status: Option<AppointmentStatus>,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        let filter = match status {
            Some(status) => format!("status=eq.{}", status),
            None => String::new(),
        };
        self.list_page(filter, page, limit).await
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status_value: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let new_status: AppointmentStatus = status_value.parse()?;

        let appointment = self.get_appointment(appointment_id).await?;
        self.lifecycle_service
            .validate_status_transition(appointment.status, new_status)?;

        let patch = json!({
            "status": new_status,
            "updated_at": Utc::now()
        });
        let updated = self
            .store
            .update("appointments", &format!("id=eq.{}", appointment_id), patch)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointment = match updated.into_iter().next() {
            Some(value) => parse_appointment(value)?,
            None => return Err(AppointmentError::NotFound),
        };

        let details = self.expand_one(appointment).await?;

        match self.doctor_service.get_doctor(details.appointment.doctor_id).await {
            Ok(doctor) => {
                let notice = build_notice(&details, &doctor);
                self.notifier.appointment_updated(&notice).await;
            }
            Err(e) => warn!("Skipping status notification, doctor lookup failed: {}", e),
        }

        info!("Appointment {} status set to {}", appointment_id, new_status);
        Ok(details)
    }

    /// Move an appointment to a new slot; the status is left unchanged.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_date: DateTime<Utc>,
        new_time: &str,
    ) -> Result<AppointmentDetails, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if appointment.status.is_terminal() {
            return Err(AppointmentError::TerminalReschedule(appointment.status));
        }

        let _guard = self.locks.acquire(appointment.doctor_id).await;

        let taken = self
            .conflict_service
            .slot_is_taken(
                appointment.doctor_id,
                new_date.date_naive(),
                new_time,
                Some(appointment_id),
            )
            .await?;
        if taken {
            return Err(AppointmentError::NewSlotTaken);
        }

        let patch = json!({
            "date": new_date,
            "time": new_time,
            "updated_at": Utc::now()
        });
        let updated = self
            .store
            .update("appointments", &format!("id=eq.{}", appointment_id), patch)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointment = match updated.into_iter().next() {
            Some(value) => parse_appointment(value)?,
            None => return Err(AppointmentError::NotFound),
        };

        info!("Appointment {} rescheduled to {} {}", appointment_id, new_date.date_naive(), new_time);
        self.expand_one(appointment).await
    }

    // ==============================================================================
    // PRIVATE HELPERS
    // ==============================================================================

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let query = format!("id=eq.{}", appointment_id);
        let result = self
            .store
            .find_one("appointments", &query)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        match result {
            Some(value) => parse_appointment(value),
            None => Err(AppointmentError::NotFound),
        }
    }

    async fn list_page(
        &self,
        filter: String,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<AppointmentDetails>, AppointmentError> {
        let offset = (page - 1) * limit;
        let query = if filter.is_empty() {
            format!("order=date.desc&limit={}&offset={}", limit, offset)
        } else {
            format!("{}&order=date.desc&limit={}&offset={}", filter, limit, offset)
        };

        let result = self
            .store
            .find("appointments", &query)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let appointments = result
            .into_iter()
            .map(parse_appointment)
            .collect::<Result<Vec<Appointment>, AppointmentError>>()?;

        let total = self
            .store
            .count("appointments", &filter)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let records = self.expand_many(appointments).await?;
        Ok(Paginated::new(records, page, limit, total))
    }

    async fn expand_one(&self, appointment: Appointment) -> Result<AppointmentDetails, AppointmentError> {
        let mut expanded = self.expand_many(vec![appointment]).await?;
        expanded
            .pop()
            .ok_or_else(|| AppointmentError::Database("Expansion returned no record".to_string()))
    }

    /// Batched reference expansion: one lookup per referenced collection
    /// instead of one per appointment.
    async fn expand_many(
        &self,
        appointments: Vec<Appointment>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        if appointments.is_empty() {
            return Ok(vec![]);
        }

        let doctor_ids: BTreeSet<Uuid> = appointments.iter().map(|a| a.doctor_id).collect();
        let user_ids: BTreeSet<Uuid> = appointments.iter().map(|a| a.user_id).collect();

        let doctors = self
            .fetch_summaries::<DoctorSummary>("doctors", &doctor_ids)
            .await?;
        let patients = self
            .fetch_summaries::<PatientSummary>("users", &user_ids)
            .await?;

        Ok(appointments
            .into_iter()
            .map(|appointment| AppointmentDetails {
                doctor: doctors.get(&appointment.doctor_id).cloned(),
                patient: patients.get(&appointment.user_id).cloned(),
                appointment,
            })
            .collect())
    }

    async fn fetch_summaries<T>(
        &self,
        collection: &str,
        ids: &BTreeSet<Uuid>,
    ) -> Result<HashMap<Uuid, T>, AppointmentError>
    where
        T: serde::de::DeserializeOwned + HasId + Clone,
    {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = format!("id=in.({})", id_list);

        let result = self
            .store
            .find(collection, &query)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        let mut map = HashMap::new();
        for value in result {
            let summary: T = serde_json::from_value(value).map_err(|e| {
                AppointmentError::Database(format!("Failed to parse {} record: {}", collection, e))
            })?;
            map.insert(summary.id(), summary);
        }
        Ok(map)
    }

    async fn fetch_patient(&self, user_id: Uuid) -> Result<Option<PatientSummary>, AppointmentError> {
        let query = format!("id=eq.{}", user_id);
        let result = self
            .store
            .find_one("users", &query)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        match result {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| AppointmentError::Database(format!("Failed to parse user: {}", e))),
            None => Ok(None),
        }
    }
}

trait HasId {
    fn id(&self) -> Uuid;
}

impl HasId for DoctorSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl HasId for PatientSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

fn parse_appointment(value: Value) -> Result<Appointment, AppointmentError> {
    serde_json::from_value(value)
        .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e)))
}

fn summarize_doctor(doctor: &Doctor) -> DoctorSummary {
    DoctorSummary {
        id: doctor.id,
        fullname: doctor.fullname.clone(),
        specialization: doctor.specialization.clone(),
        fees: doctor.fees,
    }
}

fn build_notice(details: &AppointmentDetails, doctor: &Doctor) -> AppointmentNotice {
    AppointmentNotice {
        appointment_id: details.appointment.id,
        patient_user_id: details.appointment.user_id,
        patient_name: details
            .patient
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "a patient".to_string()),
        patient_email: details.patient.as_ref().map(|p| p.email.clone()),
        doctor_user_id: doctor.user_id,
        doctor_name: doctor.fullname.clone(),
        doctor_email: Some(doctor.email.clone()),
        date: details.appointment.date,
        time: details.appointment.time.clone(),
        status: details.appointment.status.to_string(),
        payload: json!(details),
    }
}

fn map_doctor_error(err: DoctorError) -> AppointmentError {
    match err {
        DoctorError::NotFound => AppointmentError::DoctorNotFound,
        DoctorError::Database(msg) => AppointmentError::Database(msg),
        other => AppointmentError::Database(other.to_string()),
    }
}
