use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;
use shared_utils::jwt::issue_token;

use crate::models::{AuthError, AuthResponse, LoginRequest, PublicUser, RegisterRequest, UserRecord, UserType};

const TOKEN_TTL_HOURS: i64 = 24 * 7;

pub struct AccountService {
    store: StoreClient,
    jwt_secret: String,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if request.name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
            || request.phone.trim().is_empty()
        {
            return Err(AuthError::Validation(
                "Name, email, password, and phone are required".to_string(),
            ));
        }

        if self.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let user_doc = json!({
            "id": Uuid::new_v4(),
            "name": request.name,
            "email": request.email,
            "password_hash": password_hash,
            "phone": request.phone,
            "user_type": UserType::Customer,
            "is_doctor": false,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let created = self
            .store
            .insert("users", user_doc)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        let user: UserRecord = serde_json::from_value(created)
            .map_err(|e| AuthError::Database(format!("Failed to parse created user: {}", e)))?;

        info!("Registered user {}", user.id);
        self.issue_for(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        // Login-screen role selector must agree with the account's type.
        if let Some(selected) = request.user_type.as_deref() {
            let matches = match selected {
                "admin" => user.user_type == UserType::Admin,
                "doctor" => user.user_type == UserType::Doctor || user.is_doctor,
                "user" => user.user_type == UserType::Customer,
                _ => false,
            };
            if !matches {
                return Err(AuthError::InvalidCredentials);
            }
        }

        debug!("User {} logged in", user.id);
        self.issue_for(&user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserRecord, AuthError> {
        let query = format!("id=eq.{}", user_id);
        let result = self
            .store
            .find_one("users", &query)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        match result {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| AuthError::Database(format!("Failed to parse user: {}", e))),
            None => Err(AuthError::NotFound),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let query = format!("email=eq.{}", urlencoding::encode(email));
        let result = self
            .store
            .find_one("users", &query)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        match result {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| AuthError::Database(format!("Failed to parse user: {}", e))),
            None => Ok(None),
        }
    }

    fn issue_for(&self, user: &UserRecord) -> Result<AuthResponse, AuthError> {
        let token = issue_token(
            &user.id.to_string(),
            &user.email,
            &user.user_type.to_string(),
            user.is_doctor,
            &self.jwt_secret,
            TOKEN_TTL_HOURS,
        )
        .map_err(AuthError::Token)?;

        Ok(AuthResponse {
            token,
            user: PublicUser::from(user),
        })
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}
