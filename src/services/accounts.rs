use crate::{
    auth::{AuthService, TokenResponse},
    db::DbPool,
    entities::{password_reset_token, user},
    errors::ServiceError,
    notifications::{EmailMessage, Mailer},
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(email, length(max = 60))]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(email, length(max = 60))]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirm {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for Profile {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_staff: u.is_staff,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Registration, login, profile and password management
#[derive(Clone)]
pub struct AccountService {
    db_pool: Arc<DbPool>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn Mailer>,
    reset_ttl: Duration,
    public_base_url: String,
}

impl AccountService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        reset_ttl_secs: i64,
        public_base_url: String,
    ) -> Self {
        Self {
            db_pool,
            auth,
            mailer,
            reset_ttl: Duration::seconds(reset_ttl_secs),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn signup(&self, request: SignupRequest) -> Result<Profile, ServiceError> {
        request.validate()?;
        if request.password != request.password_confirm {
            return Err(ServiceError::ValidationError(
                "The two password fields didn't match.".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let email = request.email.trim().to_lowercase();
        let taken = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Email.eq(email.as_str()))
                    .add(user::Column::Username.eq(request.username.as_str())),
            )
            .one(db)
            .await?;
        if let Some(existing) = taken {
            let field = if existing.email == email {
                format!("Email '{}' already in use.", email)
            } else {
                format!("Username '{}' already in use.", request.username)
            };
            return Err(ServiceError::Conflict(field));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(request.username),
            email: Set(email),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            password_hash: Set(AuthService::hash_password(&request.password)?),
            is_staff: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(user_id = %created.id, "account created");
        Ok(created.into())
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        let invalid = || {
            ServiceError::Unauthorized(
                "Please enter a correct email and password.".to_string(),
            )
        };

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(invalid)?;

        if !AuthService::verify_password(&account.password_hash, &request.password)? {
            warn!(user_id = %account.id, "login rejected: wrong password");
            return Err(invalid());
        }

        let token = self.auth.generate_token(&account)?;
        info!(user_id = %account.id, staff = account.is_staff, "login succeeded");
        Ok(token)
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<Profile, ServiceError> {
        Ok(self.find_user(user_id).await?.into())
    }

    /// Changes email and username, refusing values owned by another account
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let email = request.email.trim().to_lowercase();

        let email_owner = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .filter(user::Column::Id.ne(user_id))
            .one(db)
            .await?;
        if email_owner.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' already in use.",
                email
            )));
        }

        let username_owner = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.as_str()))
            .filter(user::Column::Id.ne(user_id))
            .one(db)
            .await?;
        if username_owner.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' already in use.",
                request.username
            )));
        }

        let mut active = self.find_user(user_id).await?.into_active_model();
        active.email = Set(email);
        active.username = Set(request.username);
        active.updated_at = Set(Utc::now());
        let saved = active.update(db).await?;

        info!(%user_id, "profile updated");
        Ok(saved.into())
    }

    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<MessageResponse, ServiceError> {
        request.validate()?;
        let account = self.find_user(user_id).await?;

        if !AuthService::verify_password(&account.password_hash, &request.old_password)? {
            return Err(ServiceError::ValidationError(
                "Your old password was entered incorrectly.".to_string(),
            ));
        }

        let mut active = account.into_active_model();
        active.password_hash = Set(AuthService::hash_password(&request.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db_pool).await?;

        info!(%user_id, "password changed");
        Ok(MessageResponse::new("Password changed"))
    }

    /// Emails a single-use reset link. The reply is the same whether or not
    /// the address belongs to an account.
    #[instrument(skip(self, request))]
    pub async fn request_password_reset(
        &self,
        request: PasswordResetRequest,
    ) -> Result<MessageResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let email = request.email.trim().to_lowercase();

        let Some(account) = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await?
        else {
            info!("password reset requested for unknown email");
            return Ok(MessageResponse::new(RESET_REQUESTED_MESSAGE));
        };

        let token = generate_token();
        let now = Utc::now();
        password_reset_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            token_hash: Set(hash_token(&token)),
            expires_at: Set(now + self.reset_ttl),
            used_at: Set(None),
            created_at: Set(now),
        }
        .insert(db)
        .await?;

        let link = format!("{}/reset-password?token={}", self.public_base_url, token);
        let message = EmailMessage::password_reset(&account.email, &account.username, &link);
        if let Err(e) = self.mailer.send(message).await {
            error!(user_id = %account.id, error = %e, "failed to send password reset email");
            return Err(ServiceError::ExternalServiceError(
                "Could not send the password reset email".to_string(),
            ));
        }

        info!(user_id = %account.id, "password reset email sent");
        Ok(MessageResponse::new(RESET_REQUESTED_MESSAGE))
    }

    #[instrument(skip(self, request))]
    pub async fn confirm_password_reset(
        &self,
        request: PasswordResetConfirm,
    ) -> Result<MessageResponse, ServiceError> {
        request.validate()?;
        let invalid = || ServiceError::InvalidInput("The password reset link is invalid or has expired.".to_string());

        let txn = self.db_pool.begin().await?;
        let token = password_reset_token::Entity::find()
            .filter(password_reset_token::Column::TokenHash.eq(hash_token(request.token.trim())))
            .one(&txn)
            .await?
            .ok_or_else(invalid)?;

        let now = Utc::now();
        if !token.is_usable(now) {
            return Err(invalid());
        }

        let account = user::Entity::find_by_id(token.user_id)
            .one(&txn)
            .await?
            .ok_or_else(invalid)?;

        let user_id = account.id;
        let mut active_user = account.into_active_model();
        active_user.password_hash = Set(AuthService::hash_password(&request.new_password)?);
        active_user.updated_at = Set(now);
        active_user.update(&txn).await?;

        let mut active_token = token.into_active_model();
        active_token.used_at = Set(Some(now));
        active_token.update(&txn).await?;
        txn.commit().await?;

        info!(%user_id, "password reset completed");
        Ok(MessageResponse::new("Password has been reset"))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }
}
