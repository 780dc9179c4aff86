use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use launchpad_db::is_unique_violation;
use launchpad_db::models::{NewUser, UserRow};
use launchpad_types::api::{
    AuthResponse, CivicLoginRequest, Envelope, LoginRequest, MeResponse, RegisterRequest,
};
use launchpad_types::models::{PublicUser, Role};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{SESSION_COOKIE, session_token};
use crate::password;
use crate::state::{AppState, AppStateInner, blocking, current_time};

pub const MIN_PASSWORD_LEN: usize = 8;

// -- Service --

pub fn register_user(
    state: &AppStateInner,
    req: RegisterRequest,
    now: DateTime<Utc>,
) -> Result<AuthResponse, ApiError> {
    let full_name = required(req.full_name, "fullName")?;
    let email = normalize_email(&required(req.email, "email")?)?;
    let password = req
        .password
        .filter(|p| !p.trim().is_empty())
        .ok_or(ApiError::MissingRequiredField("password"))?;
    let role = req.role.ok_or(ApiError::MissingRequiredField("role"))?;

    let (matric_number, course, organization, position) = match role {
        Role::Student => (
            Some(required(req.matric_number, "matricNumber")?),
            Some(required(req.course, "course")?),
            None,
            None,
        ),
        Role::Guest => (
            None,
            None,
            Some(required(req.organization, "organization")?),
            Some(required(req.position, "position")?),
        ),
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::DuplicateEmail);
    }
    if let Some(matric) = &matric_number {
        if state.db.matric_number_exists(matric)? {
            return Err(ApiError::Conflict(
                "An account with this matric number already exists".into(),
            ));
        }
    }

    let password_hash = password::hash_password(&password)?;
    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&NewUser {
            id: user_id,
            full_name: &full_name,
            email: &email,
            password_hash: Some(&password_hash),
            role,
            matric_number: matric_number.as_deref(),
            course: course.as_deref(),
            organization: organization.as_deref(),
            position: position.as_deref(),
            civic_id: None,
            is_verified: false,
            created_at: now,
        })
        .map_err(|e| {
            // lost a race with a concurrent registration
            if is_unique_violation(&e) {
                ApiError::DuplicateEmail
            } else {
                ApiError::Internal(e)
            }
        })?;

    let user = load_user(state, user_id)?;
    let token = state.tokens.issue(user_id, &email, now)?;

    info!("Registered {} as {}", user_id, role);
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

/// Unknown identifier, provider-only account and wrong password are all the
/// same `InvalidCredentials`.
pub fn login_user(
    state: &AppStateInner,
    req: LoginRequest,
    now: DateTime<Utc>,
) -> Result<AuthResponse, ApiError> {
    let identifier = req.identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::MissingRequiredField("identifier"));
    }
    if req.password.is_empty() {
        return Err(ApiError::MissingRequiredField("password"));
    }

    let lookup = if identifier.contains('@') {
        identifier.to_lowercase()
    } else {
        identifier.to_string()
    };

    let found = state.db.get_user_by_login_identifier(&lookup)?;
    let verified = match found.as_ref().and_then(|u| u.password_hash.as_deref()) {
        Some(hash) => password::verify_password(hash, &req.password),
        None => {
            password::verify_against_dummy(&req.password);
            false
        }
    };

    let mut user = match found {
        Some(user) if verified => user,
        _ => {
            debug!("Rejected login attempt");
            return Err(ApiError::InvalidCredentials);
        }
    };

    state.db.touch_last_login(user.id, now)?;
    user.last_login = Some(now);

    let token = state.tokens.issue(user.id, &user.email, now)?;
    info!("User {} logged in", user.id);
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

/// Find the account for a provider subject: by subject, then by email
/// (linking the subject), else create a verified guest account.
pub fn civic_login(
    state: &AppStateInner,
    req: CivicLoginRequest,
    now: DateTime<Utc>,
) -> Result<AuthResponse, ApiError> {
    let verifier = state
        .identity
        .as_deref()
        .ok_or_else(|| ApiError::Validation("Identity provider login is not enabled".into()))?;
    let identity = verifier.verify(&req.assertion)?;

    let user_id = match state.db.get_user_by_civic_id(&identity.subject)? {
        Some(user) => user.id,
        None => {
            let email = identity
                .email
                .as_deref()
                .ok_or(ApiError::MissingRequiredField("email"))
                .and_then(normalize_email)?;

            match state.db.get_user_by_email(&email)? {
                Some(existing) => {
                    let linked = existing.civic_id.is_none()
                        && state.db.link_civic_id(existing.id, &identity.subject, now)?;
                    if !linked {
                        return Err(ApiError::Conflict(
                            "This account is already linked to another identity".into(),
                        ));
                    }
                    info!("Linked identity provider subject to user {}", existing.id);
                    existing.id
                }
                None => {
                    let full_name = identity
                        .name
                        .clone()
                        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
                    create_provider_user(state, &identity.subject, &email, &full_name, now)?
                }
            }
        }
    };

    state.db.touch_last_login(user_id, now)?;
    let user = load_user(state, user_id)?;
    let token = state.tokens.issue(user.id, &user.email, now)?;

    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

fn create_provider_user(
    state: &AppStateInner,
    subject: &str,
    email: &str,
    full_name: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, ApiError> {
    let user_id = Uuid::new_v4();
    let created = state.db.create_user(&NewUser {
        id: user_id,
        full_name,
        email,
        password_hash: None,
        role: Role::Guest,
        matric_number: None,
        course: None,
        organization: None,
        position: None,
        civic_id: Some(subject),
        is_verified: true,
        created_at: now,
    });

    match created {
        Ok(()) => {
            info!("Created user {} from identity provider login", user_id);
            Ok(user_id)
        }
        // a concurrent login for the same subject got there first
        Err(e) if is_unique_violation(&e) => state
            .db
            .get_user_by_civic_id(subject)?
            .map(|u| u.id)
            .ok_or_else(|| ApiError::Conflict("Account is being created, try again".into())),
        Err(e) => Err(e.into()),
    }
}

pub fn resolve_token(
    state: &AppStateInner,
    token: &str,
    now: DateTime<Utc>,
) -> Result<PublicUser, ApiError> {
    let claims = state.tokens.verify(token, now)?;
    state
        .db
        .get_user_by_id(claims.sub)?
        .map(Into::into)
        .ok_or(ApiError::UserNotFound)
}

fn load_user(state: &AppStateInner, user_id: Uuid) -> Result<UserRow, ApiError> {
    state
        .db
        .get_user_by_id(user_id)?
        .ok_or(ApiError::UserNotFound)
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingRequiredField(field))
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::Validation("Email address is not valid".into())),
    }
}

// -- Handlers --

fn session_cookie(state: &AppStateInner, token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.cookie_secure)
        .build()
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let resp = blocking(&state, move |s| register_user(s, req, now)).await?;
    let jar = jar.add(session_cookie(&state, &resp.token));

    Ok((StatusCode::CREATED, jar, Json(Envelope::ok(resp))))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let resp = blocking(&state, move |s| login_user(s, req, now)).await?;
    let jar = jar.add(session_cookie(&state, &resp.token));

    Ok((jar, Json(Envelope::ok(resp))))
}

pub async fn civic(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<CivicLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let resp = blocking(&state, move |s| civic_login(s, req, now)).await?;
    let jar = jar.add(session_cookie(&state, &resp.token));

    Ok((jar, Json(Envelope::ok(resp))))
}

/// Clears the session cookie. Bearer tokens stay valid until they expire.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Json(Envelope::ok(serde_json::json!({ "loggedOut": true }))))
}

/// GET /auth/me resolves the token itself so a deleted account reads as
/// `UserNotFound` rather than a bad token.
pub async fn me(State(state): State<AppState>, req: Request) -> Result<impl IntoResponse, ApiError> {
    let (mut parts, _body) = req.into_parts();
    let token = session_token(&mut parts).await.ok_or(ApiError::Unauthorized)?;

    let now = current_time();
    let user = blocking(&state, move |s| resolve_token(s, &token, now)).await?;

    Ok(Json(Envelope::ok(MeResponse { user })))
}
