//! User API endpoints.

use axum::{Json, extract::State};
use entities::User;
use incident_store::{Store, UserFilter};
use rpc_protocol::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
    requests::{CreateUserRequest, GetUserRequest, IssueTokenRequest, ListUsersRequest, parse_id},
    responses::{CreateUserResponse, ListUsersResponse, TokenResponse, UserResponse},
};

use crate::error::{ServerError, ServerResult};
use crate::middleware::CurrentUser;
use crate::state::SharedState;

fn ensure_admin(user: &CurrentUser, operation: &str) -> ServerResult<()> {
    if user.0.role.capabilities().is_unrestricted() {
        Ok(())
    } else {
        Err(ServerError::PermissionDenied(format!(
            "role {} cannot {operation}",
            user.0.role
        )))
    }
}

/// Light shape check; delivery is what proves an address.
fn validate_email(email: &str) -> ServerResult<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(ServerError::InvalidRequest(format!(
            "'{email}' is not an email address"
        ))),
    }
}

/// Creates a user. Admin only.
pub async fn create_user<S: Store>(
    State(state): State<SharedState<S>>,
    caller: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> ServerResult<Json<CreateUserResponse>> {
    ensure_admin(&caller, "create users")?;

    let mut user = User::new(validate_email(&request.email)?, request.role);
    if let Some(name) = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        user = user.with_name(name);
    }

    let user = state.store().create_user(user).await?;
    tracing::info!(
        user_id = %user.id,
        role = %user.role,
        created_by = %caller.0.id,
        "User created"
    );

    let access_token = match &state.jwt_manager {
        Some(manager) => Some(manager.generate_token(&user)?),
        None => None,
    };

    Ok(Json(CreateUserResponse { user, access_token }))
}

/// Gets a user. Non-admin callers may only read themselves.
pub async fn get_user<S: Store>(
    State(state): State<SharedState<S>>,
    caller: CurrentUser,
    Json(request): Json<GetUserRequest>,
) -> ServerResult<Json<UserResponse>> {
    let user_id = parse_id("user_id", &request.user_id)?;
    if user_id != caller.0.id {
        ensure_admin(&caller, "read other users")?;
    }

    let user = state
        .store()
        .get_user(user_id)
        .await?
        .ok_or_else(|| rpc_protocol::ApiError::not_found(format!("User not found: {user_id}")))?;

    Ok(Json(UserResponse { user }))
}

/// Lists users. Admin only.
pub async fn list_users<S: Store>(
    State(state): State<SharedState<S>>,
    caller: CurrentUser,
    Json(request): Json<ListUsersRequest>,
) -> ServerResult<Json<ListUsersResponse>> {
    ensure_admin(&caller, "list users")?;

    let filter = UserFilter {
        role: request.role,
        limit: Some(request.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
        offset: request.offset,
    };
    let (users, total_count) = state.store().list_users(filter).await?;

    Ok(Json(ListUsersResponse { users, total_count }))
}

/// Issues a fresh bearer token. Callers renew their own token; only admins
/// may issue one for another user. JWT mode only.
pub async fn issue_token<S: Store>(
    State(state): State<SharedState<S>>,
    caller: CurrentUser,
    Json(request): Json<IssueTokenRequest>,
) -> ServerResult<Json<TokenResponse>> {
    let manager = state.jwt_manager.as_ref().ok_or_else(|| {
        ServerError::InvalidRequest("tokens are only issued in JWT auth mode".to_string())
    })?;

    let user = match request.user_id.as_deref() {
        None => caller.0.clone(),
        Some(raw) => {
            let user_id = parse_id("user_id", raw)?;
            if user_id == caller.0.id {
                caller.0.clone()
            } else {
                ensure_admin(&caller, "issue tokens for other users")?;
                state.store().get_user(user_id).await?.ok_or_else(|| {
                    rpc_protocol::ApiError::not_found(format!("User not found: {user_id}"))
                })?
            }
        }
    };

    let access_token = manager
        .generate_token(&user)
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    tracing::info!(user_id = %user.id, issued_by = %caller.0.id, "Access token issued");

    Ok(Json(TokenResponse {
        user_id: user.id.to_string(),
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: manager.expiration_seconds(),
    }))
}

/// Returns the calling user.
pub async fn get_current_user(caller: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse { user: caller.0 })
}
