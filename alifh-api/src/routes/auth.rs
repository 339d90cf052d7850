/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/sign-up/email`: create an account with a password
/// - `POST /api/auth/sign-in/email`: password sign-in
/// - `POST /api/auth/sign-in/magic-link`: email a single-use sign-in link
/// - `GET  /api/auth/magic-link/verify`: redeem a link, then redirect
/// - `POST /api/auth/sign-out`: revoke the current session
/// - `GET  /api/auth/get-session`: current session and user, or `null`
/// - `POST /api/auth/update-user`: change display name or avatar
/// - `POST /api/auth/change-password`: rotate the password, optionally
///   signing out every other session
///
/// Successful sign-ins set the `alifh.session_token` cookie and also return
/// the token for non-browser clients.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::session::{client_ip, token_from_headers, user_agent, AuthUser, MaybeAuth},
};
use alifh_shared::{
    auth::{
        delivery::MagicLinkMessage,
        magic_link::{self, sanitize_callback_url, MagicLinkClaims},
        middleware::{issue_session, revoke_session},
        password,
        session_token::{clear_session_cookie, session_cookie},
    },
    dashboard::{self, AccessSummary, SIGN_IN_PATH},
    models::{
        membership::PartnerMembership,
        session::Session,
        user::{normalize_email, CreateUser, UpdateUser, User, UserRole},
        verification::{CreateVerification, Verification},
    },
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Same message for unknown emails, wrong passwords and magic-link-only
/// accounts
const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[serde(rename = "callbackURL")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[serde(rename = "callbackURL")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Used as the display name when the link creates an account
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[serde(rename = "callbackURL")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(url(message = "Image must be a URL"))]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,

    #[serde(default)]
    pub revoke_other_sessions: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: String,

    #[serde(rename = "callbackURL")]
    pub callback_url: Option<String>,
}

/// Body of a successful sign-up or sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,

    /// Where the client should navigate next
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct GetSessionResponse {
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Sanitized callback if given, else the user's dashboard
pub(crate) async fn landing_path(
    state: &AppState,
    user: &User,
    callback: Option<&str>,
) -> ApiResult<String> {
    if let Some(callback) = sanitize_callback_url(callback) {
        return Ok(callback);
    }

    let memberships = PartnerMembership::list_for_user_with_partner(&state.db, user.id).await?;
    let access = AccessSummary::from_memberships(
        user,
        &memberships,
        &state.session_settings.platform_partner_slug,
    );

    Ok(dashboard::resolve(&access, &memberships).path().to_string())
}

async fn start_session(
    state: &AppState,
    headers: &HeaderMap,
    user: User,
    callback: Option<&str>,
) -> ApiResult<([(header::HeaderName, String); 1], Json<AuthResponse>)> {
    let issued = issue_session(
        &state.db,
        user.id,
        &state.session_settings,
        client_ip(headers),
        user_agent(headers),
    )
    .await?;

    let redirect = landing_path(state, &user, callback).await?;
    let cookie = session_cookie(
        &issued.token,
        state.config.session_max_age_seconds(),
        state.config.api.production,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            token: issued.token,
            user,
            redirect,
        }),
    ))
}

fn invalid_link_redirect() -> Response {
    Redirect::to(&format!("{}?error=INVALID_TOKEN", SIGN_IN_PATH)).into_response()
}

/// Create an account with email and password
///
/// ```text
/// POST /api/auth/sign-up/email
/// { "email": "buyer@example.com", "password": "...", "name": "Sara", "callbackURL": "/account" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn sign_up_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    req.email = req.email.trim().to_string();
    req.validate()?;
    password::validate_password_length(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.clone(),
            password_hash: Some(password_hash),
            name: req.name.clone().filter(|n| !n.trim().is_empty()),
            role: UserRole::User,
            email_verified: false,
        },
    )
    .await?;

    info!(user_id = %user.id, "User signed up");

    start_session(&state, &headers, user, req.callback_url.as_deref()).await
}

/// Password sign-in
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email, wrong password, or an account
///   without a password
pub async fn sign_in_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    req.email = req.email.trim().to_string();
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email).await?;
    let Some((user, hash)) = user.and_then(|u| u.password_hash.clone().map(|h| (u, h))) else {
        debug!("Sign-in for unknown email or passwordless account");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !password::verify_password(&req.password, &hash)? {
        warn!(user_id = %user.id, "Sign-in with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!(user_id = %user.id, "User signed in with password");

    start_session(&state, &headers, user, req.callback_url.as_deref()).await
}

/// Email a magic link
///
/// Always answers `{ "status": true }` so the endpoint does not reveal which
/// emails have accounts.
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(mut req): Json<MagicLinkRequest>,
) -> ApiResult<Json<StatusResponse>> {
    req.email = req.email.trim().to_string();
    req.validate()?;

    let email = normalize_email(&req.email);
    let existing = User::find_by_email(&state.db, &email).await?;

    if existing.is_none() && !state.config.auth.magic_link_allow_sign_up {
        debug!("Magic link requested for unknown email with sign-up disabled");
        return Ok(Json(StatusResponse { status: true }));
    }

    let id = Uuid::new_v4();
    let claims = MagicLinkClaims::new(email.clone(), id, state.config.magic_link_ttl());
    let callback_url = sanitize_callback_url(req.callback_url.as_deref());

    Verification::create(
        &state.db,
        CreateVerification {
            id,
            identifier: email.clone(),
            name: req.name.clone().filter(|n| !n.trim().is_empty()),
            callback_url: callback_url.clone(),
            expires_at: claims.expires_at(),
        },
    )
    .await?;

    let token = magic_link::create_token(&claims, state.auth_secret())?;
    let url = magic_link::build_link(&state.config.api.base_url, &token, callback_url.as_deref())?;

    state
        .mailer
        .send(&MagicLinkMessage {
            email,
            url,
            expires_at: claims.expires_at(),
        })
        .await?;

    info!(verification_id = %id, "Magic link sent");

    Ok(Json(StatusResponse { status: true }))
}

/// Redeem a magic link
///
/// Redirects (303) to the callback URL, or the user's dashboard, with the
/// session cookie set. Invalid, expired or already-used links redirect to
/// `/sign-in?error=INVALID_TOKEN`.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<Response> {
    let claims = match magic_link::validate_token(&query.token, state.auth_secret()) {
        Ok(claims) => claims,
        Err(e) => {
            info!(error = %e, "Rejected magic link");
            return Ok(invalid_link_redirect());
        }
    };

    let Some(verification) = Verification::consume(&state.db, claims.jti).await? else {
        info!(verification_id = %claims.jti, "Magic link already used or expired");
        return Ok(invalid_link_redirect());
    };

    if verification.identifier != claims.sub {
        warn!(verification_id = %verification.id, "Magic link subject mismatch");
        return Ok(invalid_link_redirect());
    }

    let user = match User::find_by_email(&state.db, &claims.sub).await? {
        Some(user) => user,
        None if state.config.auth.magic_link_allow_sign_up => {
            let user = User::create(
                &state.db,
                CreateUser {
                    email: claims.sub.clone(),
                    password_hash: None,
                    name: verification.name.clone(),
                    role: UserRole::User,
                    email_verified: true,
                },
            )
            .await?;
            info!(user_id = %user.id, "User signed up via magic link");
            user
        }
        None => return Ok(invalid_link_redirect()),
    };

    if !user.email_verified {
        User::mark_email_verified(&state.db, user.id).await?;
    }

    let callback = query
        .callback_url
        .as_deref()
        .or(verification.callback_url.as_deref());
    let (cookie, Json(body)) = start_session(&state, &headers, user, callback).await?;

    info!(user_id = %body.user.id, "User signed in with magic link");

    Ok((cookie, Redirect::to(&body.redirect)).into_response())
}

/// Revoke the presented session. Succeeds without one.
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = token_from_headers(&headers) {
        if revoke_session(&state.db, &token).await? {
            info!("Session revoked");
        }
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(state.config.api.production))],
        Json(SuccessResponse { success: true }),
    ))
}

/// Current session and user; `null` when signed out
pub async fn get_session(MaybeAuth(auth): MaybeAuth) -> Json<Option<GetSessionResponse>> {
    Json(auth.map(|auth| GetSessionResponse {
        session: auth.session,
        user: auth.user,
    }))
}

/// Update the signed-in user's profile
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let user = User::update(
        &state.db,
        auth.user.id,
        UpdateUser {
            name: req.name.map(|n| n.trim().to_string()),
            image: req.image,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse { user }))
}

/// Change the password of the signed-in user
///
/// With `revokeOtherSessions` every session is deleted and a fresh one is
/// issued for the caller.
///
/// # Errors
///
/// - `401 Unauthorized`: current password wrong, or the account has none
/// - `422 Unprocessable Entity`: new password outside the length policy
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Response> {
    password::validate_password_length(&req.new_password)
        .map_err(|e| ApiError::invalid_field("newPassword", e))?;

    let Some(hash) = auth.user.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };
    if !password::verify_password(&req.current_password, hash)? {
        warn!(user_id = %auth.user.id, "Password change with wrong current password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let new_hash = password::hash_password(&req.new_password)?;
    User::set_password_hash(&state.db, auth.user.id, &new_hash).await?;
    info!(user_id = %auth.user.id, "Password changed");

    if !req.revoke_other_sessions {
        return Ok(Json(UserResponse { user: auth.user }).into_response());
    }

    let revoked = Session::delete_for_user(&state.db, auth.user.id).await?;
    info!(user_id = %auth.user.id, revoked, "Sessions revoked after password change");

    Ok(start_session(&state, &headers, auth.user, None)
        .await?
        .into_response())
}
