//! Tenant-context extractors.
//!
//! The principal is resolved once per request: staff first, then portal user.
//! An authenticated user with neither record is rejected with 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use onboard_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::services::tenant::{resolve_context, TenantContext};
use crate::state::AppState;

/// Authenticated and provisioned principal.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub user: AuthUser,
    pub context: TenantContext,
}

impl FromRequestParts<AppState> for Tenant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let context = resolve_context(&state.repos, user.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Forbidden(
                    "Account is not provisioned for portal or staff access".into(),
                ))
            })?;
        Ok(Tenant { user, context })
    }
}

/// Requires a staff principal. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireStaff(tenant): RequireStaff) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireStaff(pub Tenant);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let tenant = Tenant::from_request_parts(parts, state).await?;
        tenant.context.require_staff()?;
        Ok(RequireStaff(tenant))
    }
}
