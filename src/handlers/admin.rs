//! Admin role management.
//!
//! # Endpoints
//!
//! - `GET /admin/admins` - List admin emails
//! - `POST /admin/admins` - Grant the admin role (`{ "email": "..." }`)
//! - `DELETE /admin/admins/{email}` - Revoke the admin role
//!
//! All three require an admin caller. Changes apply to the live policy, so
//! the affected user's next request already carries the new role.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use tracing::{info, instrument};

use super::util::parse_json;
use crate::error::{AppError, AppResult};
use crate::identity::Caller;
use crate::models::{AdminChangeResponse, AdminListResponse, GrantAdminRequest};
use crate::state::AppState;
use crate::validation::validate_email;

#[instrument(skip(state, caller))]
pub async fn list_admins(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<AdminListResponse>> {
    caller.require_admin()?;

    Ok(Json(AdminListResponse {
        admins: state.admin_policy().admins(),
    }))
}

#[instrument(skip(state, caller, body))]
pub async fn grant_admin(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> AppResult<Json<AdminChangeResponse>> {
    let granted_by = caller.require_admin()?;
    let payload: GrantAdminRequest = parse_json(&body)?;
    let email = validate_email(&payload.email)?.to_lowercase();

    let changed = state.admin_policy().grant(&email);
    info!(%email, granted_by = %granted_by.id, changed, "Admin role granted");

    Ok(Json(AdminChangeResponse { email, changed }))
}

#[instrument(skip(state, caller))]
pub async fn revoke_admin(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> AppResult<Json<AdminChangeResponse>> {
    let revoked_by = caller.require_admin()?;
    let email = validate_email(&email)?.to_lowercase();

    if email == revoked_by.email.trim().to_lowercase() {
        return Err(AppError::BadRequest(
            "Admins cannot revoke their own role".to_string(),
        ));
    }

    let changed = state.admin_policy().revoke(&email);
    info!(%email, revoked_by = %revoked_by.id, changed, "Admin role revoked");

    Ok(Json(AdminChangeResponse { email, changed }))
}
