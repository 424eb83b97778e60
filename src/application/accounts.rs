//! Credential verification and self-service account management.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use thiserror::Error;
use uuid::Uuid;

use crate::application::posts::FieldError;
use crate::application::repos::{RepoError, UpdateProfileParams, UsersRepo};
use crate::domain::entities::UserRecord;

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

/// The editable profile fields, enumerated once. The profile form, its
/// validation and the persisted update all iterate this list, so adding a
/// field is a one-line change.
pub const PROFILE_FIELDS: &[ProfileField] = &[
    ProfileField::Username,
    ProfileField::Email,
    ProfileField::FirstName,
    ProfileField::LastName,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Username,
    Email,
    FirstName,
    LastName,
}

impl ProfileField {
    pub fn name(self) -> &'static str {
        match self {
            ProfileField::Username => "username",
            ProfileField::Email => "email",
            ProfileField::FirstName => "first_name",
            ProfileField::LastName => "last_name",
        }
    }

}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account form rejected")]
    Form(Vec<FieldError>),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Raw profile form values keyed by [`ProfileField`].
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ProfileInput {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            email: record.email.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
        }
    }

    fn value(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::Username => &self.username,
            ProfileField::Email => &self.email,
            ProfileField::FirstName => &self.first_name,
            ProfileField::LastName => &self.last_name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    /// Verify credentials; `None` for unknown usernames and wrong
    /// passwords alike.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AccountError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<UserRecord, AccountError> {
        let mut errors = Vec::new();

        for &field in PROFILE_FIELDS {
            let value = input.value(field).trim();
            match field {
                ProfileField::Username => {
                    if value.is_empty() {
                        errors.push(FieldError {
                            field: field.name(),
                            message: "Username is required".to_string(),
                        });
                    } else if value.chars().count() > USERNAME_MAX_CHARS {
                        errors.push(FieldError {
                            field: field.name(),
                            message: format!(
                                "Username must be at most {USERNAME_MAX_CHARS} characters"
                            ),
                        });
                    }
                }
                ProfileField::Email => {
                    if value.is_empty() || !value.contains('@') {
                        errors.push(FieldError {
                            field: field.name(),
                            message: "A valid email address is required".to_string(),
                        });
                    }
                }
                ProfileField::FirstName | ProfileField::LastName => {}
            }
        }

        // The new username must not belong to someone else.
        let username = input.username.trim();
        if errors.is_empty() {
            if let Some(existing) = self.users.find_by_username(username).await? {
                if existing.id != user_id {
                    errors.push(FieldError {
                        field: ProfileField::Username.name(),
                        message: "Username is already taken".to_string(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(AccountError::Form(errors));
        }

        Ok(self
            .users
            .update_profile(UpdateProfileParams {
                id: user_id,
                username: username.to_string(),
                email: input.email.trim().to_string(),
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
            })
            .await?)
    }

    pub async fn change_password(
        &self,
        user: &UserRecord,
        input: &PasswordInput,
    ) -> Result<(), AccountError> {
        let mut errors = Vec::new();

        if !verify_password(&input.current_password, &user.password_hash) {
            errors.push(FieldError {
                field: "current_password",
                message: "Current password is incorrect".to_string(),
            });
        }
        if input.new_password.chars().count() < PASSWORD_MIN_CHARS {
            errors.push(FieldError {
                field: "new_password",
                message: format!("New password must be at least {PASSWORD_MIN_CHARS} characters"),
            });
        }
        if input.new_password != input.confirm_password {
            errors.push(FieldError {
                field: "confirm_password",
                message: "Passwords do not match".to_string(),
            });
        }

        if !errors.is_empty() {
            return Err(AccountError::Form(errors));
        }

        let hash = hash_password(&input.new_password)?;
        self.users.update_password(user.id, hash).await?;
        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
