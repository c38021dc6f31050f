//! In-memory user store and token bookkeeping

use std::collections::{HashMap, HashSet};

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::Argon2;
use chrono::Utc;
use shared::client::MIN_PASSWORD_LEN;
use shared::{
    AppError, AppResult, ErrorCode, PasswordUpdate, ProfileUpdate, RegisterRequest, Role,
    UserRecord,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::jwt::{JwtError, JwtService};

struct StoredUser {
    record: UserRecord,
    hash_pass: String,
}

pub struct AppState {
    pub config: Config,
    pub jwt: JwtService,
    // id -> user
    users: RwLock<HashMap<String, StoredUser>>,
    revoked: RwLock<HashSet<String>>,
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash_pass: &str) -> bool {
    PasswordHash::new(hash_pass)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let jwt = JwtService::new(&config.jwt_secret, config.token_ttl_minutes);
        let mut users = HashMap::new();

        if let Some(seed) = &config.seed_admin {
            let id = uuid::Uuid::new_v4().simple().to_string();
            let mut record = UserRecord::new(
                &id,
                "Administrator",
                normalize_email(&seed.email),
                Some(Role::Admin),
            );
            record.created_at = Some(Utc::now());
            users.insert(
                id,
                StoredUser {
                    record,
                    hash_pass: hash_password(&seed.password)?,
                },
            );
            info!(email = %seed.email, "Seeded admin account");
        }

        Ok(Self {
            config,
            jwt,
            users: RwLock::new(users),
            revoked: RwLock::new(HashSet::new()),
        })
    }

    /// Apply the configured auth latency
    pub async fn simulate_latency(&self) {
        if !self.config.auth_delay.is_zero() {
            tokio::time::sleep(self.config.auth_delay).await;
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<UserRecord> {
        req.check().map_err(AppError::validation)?;
        if req.role == Role::Admin {
            return Err(AppError::forbidden("Admin accounts cannot be self-registered"));
        }

        let email = normalize_email(&req.email);
        let hash_pass = hash_password(&req.password)?;

        let mut users = self.users.write().await;
        if users.values().any(|u| u.record.email == email) {
            return Err(AppError::conflict("User already exists"));
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut record = UserRecord::new(&id, req.name.trim(), email, Some(req.role));
        record.phone = Some(req.phone);
        record.address = Some(req.address);
        record.city = non_empty(req.city);
        record.state = non_empty(req.state);
        record.zipcode = non_empty(req.zipcode);
        if req.role == Role::Seller {
            record.business_name = non_empty(req.business_name);
            record.business_description = non_empty(req.business_description);
            record.tax_id = non_empty(req.tax_id);
        }
        record.created_at = Some(Utc::now());

        users.insert(
            id.clone(),
            StoredUser {
                record: record.clone(),
                hash_pass,
            },
        );
        info!(user_id = %id, role = %req.role, "User registered");
        Ok(record)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<UserRecord> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.record.email == email)
            .filter(|u| verify_password(password, &u.hash_pass))
            .map(|u| u.record.clone())
            .ok_or_else(AppError::invalid_credentials)
    }

    pub async fn find(&self, id: &str) -> Option<UserRecord> {
        self.users.read().await.get(id).map(|u| u.record.clone())
    }

    pub fn issue_token(&self, user: &UserRecord) -> AppResult<String> {
        let role = user
            .role
            .ok_or_else(|| AppError::internal("User has no role"))?;
        self.jwt
            .generate_token(&user.id, role)
            .map_err(|e| AppError::internal(e.to_string()))
    }

    /// Resolve a bearer token to its user
    pub async fn verify(&self, token: &str) -> AppResult<UserRecord> {
        let claims = self.jwt.validate_token(token).map_err(|e| match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token(),
        })?;
        if self.revoked.read().await.contains(&claims.jti) {
            return Err(AppError::invalid_token());
        }
        self.find(&claims.sub).await.ok_or_else(AppError::invalid_token)
    }

    /// Make `token` fail verification from now on
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        let claims = self
            .jwt
            .validate_token(token)
            .map_err(|_| AppError::invalid_token())?;
        self.revoked.write().await.insert(claims.jti);
        info!(user_id = %claims.sub, "Token revoked");
        Ok(())
    }

    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> AppResult<UserRecord> {
        let mut users = self.users.write().await;

        if let Some(email) = &update.email {
            let email = normalize_email(email);
            if email.is_empty() {
                return Err(AppError::validation("Email cannot be empty"));
            }
            if users.iter().any(|(other, u)| other != id && u.record.email == email) {
                return Err(AppError::conflict("Email already in use"));
            }
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::validation("Name cannot be empty"));
        }

        let user = users.get_mut(id).ok_or_else(|| AppError::not_found("User"))?;
        let record = &mut user.record;
        if let Some(name) = update.name {
            record.name = name.trim().to_string();
        }
        if let Some(email) = update.email {
            record.email = normalize_email(&email);
        }
        if let Some(phone) = update.phone {
            record.phone = Some(phone);
        }
        if let Some(address) = update.address {
            record.address = Some(address);
        }
        if let Some(city) = update.city {
            record.city = Some(city);
        }
        if let Some(state) = update.state {
            record.state = Some(state);
        }
        if let Some(zipcode) = update.zipcode {
            record.zipcode = Some(zipcode);
        }
        if record.role == Some(Role::Seller) {
            if let Some(business_name) = update.business_name {
                record.business_name = Some(business_name);
            }
            if let Some(description) = update.business_description {
                record.business_description = Some(description);
            }
            if let Some(tax_id) = update.tax_id {
                record.tax_id = Some(tax_id);
            }
        }

        info!(user_id = %id, "Profile updated");
        Ok(record.clone())
    }

    pub async fn change_password(&self, id: &str, update: PasswordUpdate) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or_else(|| AppError::not_found("User"))?;

        if !verify_password(&update.current_password, &user.hash_pass) {
            return Err(AppError::new(ErrorCode::PasswordMismatch));
        }
        if update.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::new(ErrorCode::PasswordTooShort));
        }

        user.hash_pass = hash_password(&update.new_password)?;
        info!(user_id = %id, "Password changed");
        Ok(())
    }
}
