use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_models::pagination::Paginated;

use crate::models::{Doctor, DoctorApplicationRequest, DoctorError, DoctorListParams, DoctorStatus, WorkingHours};

pub struct DoctorService {
    store: StoreClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let query = format!("id=eq.{}", doctor_id);
        let result = self
            .store
            .find_one("doctors", &query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        match result {
            Some(value) => parse_doctor(value),
            None => Err(DoctorError::NotFound),
        }
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let query = format!("user_id=eq.{}", user_id);
        let result = self
            .store
            .find_one("doctors", &query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        match result {
            Some(value) => parse_doctor(value).map(Some),
            None => Ok(None),
        }
    }

    /// Public listing of approved doctors with optional filters.
    pub async fn list_approved(
        &self,
        params: &DoctorListParams,
    ) -> Result<Paginated<Doctor>, DoctorError> {
        let page = params.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = params.limit.filter(|l| *l > 0).unwrap_or(10);

        let mut filters = vec!["status=eq.approved".to_string()];

        if let Some(specialization) = &params.specialization {
            filters.push(format!(
                "specialization=eq.{}",
                urlencoding::encode(specialization)
            ));
        }
        if let Some(min_fees) = params.min_fees {
            filters.push(format!("fees=gte.{}", min_fees));
        }
        if let Some(max_fees) = params.max_fees {
            filters.push(format!("fees=lte.{}", max_fees));
        }
        if let Some(search) = &params.search {
            let term = urlencoding::encode(search);
            filters.push(format!(
                "or=(fullname.ilike.*{}*,specialization.ilike.*{}*)",
                term, term
            ));
        }

        self.list_page(filters, page, limit).await
    }

    pub async fn get_pending(&self, page: i64, limit: i64) -> Result<Paginated<Doctor>, DoctorError> {
        self.list_page(vec!["status=eq.pending".to_string()], page, limit)
            .await
    }

    /// Submit a doctor application for the calling user. One application per
    /// user; created in `pending` status.
    pub async fn apply(
        &self,
        user_id: Uuid,
        request: DoctorApplicationRequest,
    ) -> Result<Doctor, DoctorError> {
        if self.get_by_user(user_id).await?.is_some() {
            return Err(DoctorError::AlreadyApplied);
        }

        let now = Utc::now();
        let doctor_doc = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "fullname": request.fullname,
            "email": request.email,
            "phone": request.phone,
            "specialization": request.specialization,
            "experience": request.experience,
            "fees": request.fees,
            "address": request.address,
            "timings": WorkingHours::default(),
            "status": DoctorStatus::Pending,
            "about": request.about.unwrap_or_default(),
            "profile_image": null,
            "certificates": [],
            "rating": 0.0,
            "total_reviews": 0,
            "created_at": now,
            "updated_at": now
        });

        let created = self
            .store
            .insert("doctors", doctor_doc)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let doctor = parse_doctor(created)?;
        info!("Doctor application submitted: {} (user {})", doctor.id, user_id);
        Ok(doctor)
    }

    pub async fn approve(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.set_status(doctor_id, DoctorStatus::Approved).await
    }

    pub async fn reject(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.set_status(doctor_id, DoctorStatus::Rejected).await
    }

    async fn set_status(&self, doctor_id: Uuid, status: DoctorStatus) -> Result<Doctor, DoctorError> {
        let query = format!("id=eq.{}", doctor_id);
        let patch = json!({
            "status": status,
            "updated_at": Utc::now()
        });

        let updated = self
            .store
            .update("doctors", &query, patch)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        match updated.into_iter().next() {
            Some(value) => {
                info!("Doctor {} status set to {}", doctor_id, status);
                parse_doctor(value)
            }
            None => Err(DoctorError::NotFound),
        }
    }

    async fn list_page(
        &self,
        filters: Vec<String>,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<Doctor>, DoctorError> {
        let filter_query = filters.join("&");
        let offset = (page - 1) * limit;
        let query = format!(
            "{}&order=created_at.desc&limit={}&offset={}",
            filter_query, limit, offset
        );

        let result = self
            .store
            .find("doctors", &query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(parse_doctor)
            .collect::<Result<Vec<Doctor>, DoctorError>>()?;

        let total = self
            .store
            .count("doctors", &filter_query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(Paginated::new(doctors, page, limit, total))
    }
}

fn parse_doctor(value: Value) -> Result<Doctor, DoctorError> {
    serde_json::from_value(value)
        .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))
}
