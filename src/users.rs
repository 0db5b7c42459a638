use std::sync::LazyLock;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{post, put},
    Router,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::auth::Session;
use crate::error::{ok_with_message, ApiError, ApiJson, ApiResult};
use crate::models::User;
use crate::store::Store;
use crate::upload::{read_file_field, store_image, UploadedFile, BODY_LIMIT};
use crate::AppState;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

impl Store {
    fn user_mut(&mut self, id: u32) -> Result<&mut User, ApiError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ApiError::NotFound("user"))
    }

    pub fn update_profile(
        &mut self,
        user_id: u32,
        patch: ProfilePatch,
        now: DateTime<Utc>,
    ) -> Result<User, ApiError> {
        if let Some(nickname) = &patch.nickname {
            if nickname.trim().is_empty() {
                return Err(ApiError::Validation("nickname cannot be empty".to_string()));
            }
        }
        if let Some(email) = &patch.email {
            if !is_valid_email(email) {
                return Err(ApiError::Validation(format!("invalid email {:?}", email)));
            }
        }

        let user = self.user_mut(user_id)?;
        if let Some(nickname) = patch.nickname {
            user.nickname = nickname;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(bio) = patch.bio {
            user.bio = Some(bio).filter(|b| !b.is_empty());
        }
        if let Some(avatar) = patch.avatar {
            user.avatar = Some(avatar).filter(|a| !a.is_empty());
        }
        user.update_time = now;
        Ok(user.clone())
    }

    pub fn set_avatar(&mut self, user_id: u32, url: String, now: DateTime<Utc>) -> Result<User, ApiError> {
        let user = self.user_mut(user_id)?;
        user.avatar = Some(url);
        user.update_time = now;
        Ok(user.clone())
    }

    /// Replaces the password and revokes every other session of the user.
    pub fn change_password(
        &mut self,
        session: &Session,
        form: &ChangePassword,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if form.old_password.is_empty() || form.new_password.is_empty() || form.confirm_password.is_empty() {
            return Err(ApiError::Validation("all password fields are required".to_string()));
        }
        if form.new_password != form.confirm_password {
            return Err(ApiError::Validation("passwords do not match".to_string()));
        }

        let user = self.user_mut(session.user_id)?;
        if user.password != form.old_password {
            return Err(ApiError::Validation("old password is incorrect".to_string()));
        }
        user.password = form.new_password.clone();
        user.update_time = now;

        self.revoke_other_sessions(session.user_id, &session.token);
        Ok(())
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<User> {
    tracing::info!("update_profile for user {}", session.user_id);
    let mut store = state.store.write().await;
    let user = store.update_profile(session.user_id, patch, Utc::now())?;
    Ok(ok_with_message(user, "Profile updated"))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> ApiResult<UploadedFile> {
    tracing::info!("upload_avatar for user {}", session.user_id);
    let file = read_file_field(&mut multipart).await?;
    let stored = store_image(&state.config.upload_dir, file, "avatar").await?;
    state
        .store
        .write()
        .await
        .set_avatar(session.user_id, stored.url.clone(), Utc::now())?;
    Ok(ok_with_message(stored, "Avatar uploaded"))
}

pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<ChangePassword>,
) -> ApiResult<()> {
    tracing::info!("change_password for user {}", session.user_id);
    let mut store = state.store.write().await;
    store.change_password(&session, &form, Utc::now())?;
    Ok(ok_with_message((), "Password changed"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/profile", put(update_profile))
        .route("/api/user/changePassword", post(change_password))
        .route(
            "/api/user/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(BODY_LIMIT)),
        )
}
