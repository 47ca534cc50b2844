// ==========================================
// 请求提取器：调用方身份 + 请求参数
// ==========================================
// X-User-Id: 整数用户ID
// X-User-Roles: 逗号分隔的角色名，无法识别的角色忽略
// 缺少或无法解析身份 → 403
// 请求体/路径/查询参数解析失败 → 400 VALIDATION_ERROR (统一错误体)
// ==========================================

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::{ApiError, Caller};
use crate::domain::types::RoleType;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::Forbidden("缺少调用方身份".to_string()))?;

        let roles = parts
            .headers
            .get(USER_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();

        Ok(Caller::new(user_id, roles))
    }
}

// ==========================================
// 参数提取器 (拒绝时返回 ApiError)
// ==========================================

/// JSON 请求体
pub struct ApiJson<T>(pub T);

/// 路径参数
pub struct ApiPath<T>(pub T);

/// 查询参数
pub struct ApiQuery<T>(pub T);

fn rejection_to_error(kind: &str, status: StatusCode, detail: String) -> ApiError {
    if status.is_server_error() {
        tracing::error!(kind, detail = %detail, "请求参数提取失败");
        ApiError::Unexpected(detail)
    } else {
        tracing::debug!(kind, detail = %detail, "请求参数无效");
        ApiError::ValidationError(format!("{}无效: {}", kind, detail))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_to_error("请求体", rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        rejection_to_error("路径参数", rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_to_error("查询参数", rejection.status(), rejection.body_text())
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

fn parse_roles(raw: &str) -> Vec<RoleType> {
    let mut roles = Vec::new();
    for name in raw.split(',').filter(|s| !s.trim().is_empty()) {
        match RoleType::from_str(name) {
            Some(role) if !roles.contains(&role) => roles.push(role),
            Some(_) => {}
            None => tracing::debug!(role = name.trim(), "忽略无法识别的角色"),
        }
    }
    roles
}
