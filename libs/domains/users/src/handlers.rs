use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, patch, post},
};
use axum_helpers::{
    ACCESS_TOKEN_TTL, JwtAuth, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    },
    jwt_auth_middleware,
};
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{
    ChangePassword, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

/// OpenAPI documentation for the Auth API
#[derive(OpenApi)]
#[openapi(
    paths(register, login, logout, get_user, change_password),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ChangePassword,
            UserResponse
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            UnauthorizedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Auth", description = "User registration and authentication")
    )
)]
pub struct ApiDoc;

/// Application state for auth handlers
pub struct AuthState<R: UserRepository> {
    pub service: UserService<R>,
    pub jwt_auth: JwtAuth,
}

impl<R: UserRepository> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            jwt_auth: self.jwt_auth.clone(),
        }
    }
}

/// Create the auth router. Registration and login are public; user
/// lookup and password change require a valid JWT.
pub fn router<R: UserRepository + 'static>(service: UserService<R>, auth: JwtAuth) -> Router {
    let state = AuthState {
        service,
        jwt_auth: auth.clone(),
    };

    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/user/{id}", get(get_user))
        .route("/change-password/{id}", patch(change_password))
        .layer(middleware::from_fn_with_state(auth, jwt_auth_middleware))
        .with_state(state);

    public.merge(protected)
}

fn is_development() -> bool {
    std::env::var("APP_ENV")
        .map(|env| env == "development")
        .unwrap_or_else(|_| cfg!(debug_assertions))
}

fn session_cookie(access_token: &str) -> String {
    let secure_flag = if is_development() { "" } else { " Secure;" };
    format!(
        "access_token={}; HttpOnly;{} SameSite=Strict; Path=/; Max-Age={}",
        access_token, secure_flag, ACCESS_TOKEN_TTL
    )
}

/// An immediately-expiring cookie that overwrites the session token.
fn expired_session_cookie() -> String {
    let secure_flag = if is_development() { "" } else { " Secure;" };
    format!(
        "access_token=; HttpOnly;{} SameSite=Strict; Path=/; Max-Age=0",
        secure_flag
    )
}

/// Issue a token and build the login response with the cookie set.
fn login_response(jwt_auth: &JwtAuth, user: UserResponse) -> Result<Response, UserError> {
    let access_token = jwt_auth
        .create_access_token(
            &user.id.to_string(),
            &user.email,
            &user.name,
            &[user.role.to_string()],
        )
        .map_err(|e| {
            tracing::error!("Failed to create access token: {:?}", e);
            UserError::Internal("Failed to create token".to_string())
        })?;

    let cookie = session_cookie(&access_token);
    let cookie_header = HeaderValue::from_str(&cookie)
        .map_err(|e| UserError::Internal(format!("Failed to create cookie: {}", e)))?;

    let body = LoginResponse { user, access_token };

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie_header)]),
        Json(body),
    )
        .into_response())
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered and logged in", body = LoginResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn register<R: UserRepository>(
    State(state): State<AuthState<R>>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> Result<Response, UserError> {
    let user = state.service.register(input).await?;
    login_response(&state.jwt_auth, user)
}

/// Login with email/password
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): State<AuthState<R>>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<Response, UserError> {
    let user = state
        .service
        .verify_credentials(&input.email, &input.password)
        .await?;

    login_response(&state.jwt_auth, user)
}

/// Logout by clearing the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Session cookie cleared"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn logout() -> Result<Response, UserError> {
    let cookie_header = HeaderValue::from_str(&expired_session_cookie())
        .map_err(|e| UserError::Internal(format!("Failed to create cookie: {}", e)))?;

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cookie_header)]),
    )
        .into_response())
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/user/{id}",
    tag = "Auth",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn get_user<R: UserRepository>(
    State(state): State<AuthState<R>>,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserResponse>> {
    let user = state.service.get_user(id).await?;
    Ok(Json(user))
}

/// Change a user's password
#[utoipa::path(
    patch,
    path = "/change-password/{id}",
    tag = "Auth",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed successfully"),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn change_password<R: UserRepository>(
    State(state): State<AuthState<R>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<ChangePassword>,
) -> UserResult<impl IntoResponse> {
    state
        .service
        .change_password(id, &input.current_password, &input.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
