use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info};

use crate::api::types::*;
use crate::api::AppState;
use crate::errors::{AppError, Result};
use crate::models::customer::{CustomerDto, CustomerPage};
use crate::models::document::{KycStats, ReviewDecision};
use crate::services::jwt::CurrentUser;
use crate::utils::middleware::ADMIN_COOKIE;

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}",
        ADMIN_COOKIE, token, max_age_secs
    )
}

// ===== admin session =====

#[utoipa::path(post, path = "/admin/login", request_body = AdminLoginRequest,
    responses((status = 200, body = AdminLoginResponse), (status = 401, description = "Invalid credentials")))]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Response> {
    let outcome = match state.auth.authenticate(&req.username, &req.password).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(action = "admin_login_failed", user = %req.username, error = %e);
            return Err(e);
        }
    };

    let body = AdminLoginResponse {
        token: outcome.token.clone(),
        user_id: outcome.user.user_id,
        username: outcome.user.username,
        role: outcome.user.role,
    };

    let cookie = session_cookie(&outcome.token, state.config.jwt_ttl.num_seconds());
    let mut response = Json(body).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| AppError::InternalError("Invalid session cookie".to_string()))?,
    );
    Ok(response)
}

#[utoipa::path(post, path = "/admin/logout", responses((status = 200, body = ActionResponse)))]
pub async fn admin_logout() -> Result<Response> {
    let mut response = Json(ActionResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        session_cookie("", 0)
            .parse()
            .map_err(|_| AppError::InternalError("Invalid session cookie".to_string()))?,
    );
    Ok(response)
}

#[utoipa::path(get, path = "/admin/validate", responses((status = 200, body = ValidateResponse)))]
pub async fn admin_validate(user: Option<CurrentUser>) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        valid: user.is_some(),
    })
}

// ===== documents =====

/// Denies non-admin callers whose resolved customer identity does not own
/// the document. Resolution failures deny as well.
async fn enforce_ownership(
    state: &AppState,
    user: &CurrentUser,
    document_customer_id: i64,
) -> Result<()> {
    if user.is_admin() {
        return Ok(());
    }
    if state
        .customers
        .verify_ownership(document_customer_id, user.user_id, &user.token)
        .await
    {
        Ok(())
    } else {
        Err(AppError::AuthorizationFailure(
            "Access denied - document does not belong to you".to_string(),
        ))
    }
}

#[utoipa::path(post, path = "/api/kyc/upload",
    responses((status = 200, body = KycDocumentResponse), (status = 404, description = "No customer record for this user")))]
pub async fn upload_document(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<KycDocumentResponse>> {
    let customer_id = state
        .customers
        .resolve_customer_id(user.user_id, &user.token)
        .await?;

    let mut name: Option<String> = None;
    let mut document_type: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut payload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("name") => {
                name = Some(field.text().await.map_err(|e| {
                    AppError::ValidationError(format!("Invalid 'name' field: {}", e))
                })?);
            }
            Some("document_type") => {
                document_type = Some(field.text().await.map_err(|e| {
                    AppError::ValidationError(format!("Invalid 'document_type' field: {}", e))
                })?);
            }
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::ValidationError(format!("Invalid 'file' field: {}", e))
                })?;
                payload = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let document_type = document_type
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("'document_type' is required".to_string()))?;
    let (content_type, content) =
        payload.ok_or_else(|| AppError::ValidationError("'file' is required".to_string()))?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .or(file_name)
        .ok_or_else(|| AppError::ValidationError("'name' is required".to_string()))?;

    info!(action = "upload_request", user_id = user.user_id, customer_id, name = %name);
    let doc = state
        .kyc
        .upload(customer_id, &name, &document_type, &content_type, content)
        .await?;
    Ok(Json(doc.into()))
}

#[utoipa::path(get, path = "/api/kyc/my-documents",
    responses((status = 200, body = [KycDocumentResponse])))]
pub async fn my_documents(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<KycDocumentResponse>>> {
    let customer_id = state
        .customers
        .resolve_customer_id(user.user_id, &user.token)
        .await?;

    let docs = state.kyc.documents_by_customer(customer_id).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/kyc/document/{id}/download",
    params(("id" = i64, Path, description = "Document id")),
    responses((status = 200, description = "Raw document bytes"), (status = 403, description = "Not the owner")))]
pub async fn download_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(document_id): Path<i64>,
) -> Result<Response> {
    // Ownership is resolved from the owner column alone; the blob row is
    // only loaded once the caller is allowed to see it.
    let owner = state.kyc.owner_of(document_id).await?;
    enforce_ownership(&state, &user, owner).await?;

    let doc = state.kyc.download(document_id).await?;
    Response::builder()
        .header(header::CONTENT_TYPE, doc.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", doc.document_name),
        )
        .body(Body::from(doc.content))
        .map_err(|e| AppError::InternalError(format!("Failed to build response: {}", e)))
}

#[utoipa::path(delete, path = "/api/kyc/document/{id}",
    params(("id" = i64, Path, description = "Document id")),
    responses((status = 200, body = ActionResponse), (status = 409, description = "Document is no longer pending")))]
pub async fn delete_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(document_id): Path<i64>,
) -> Result<Json<ActionResponse>> {
    let owner = state.kyc.owner_of(document_id).await?;
    enforce_ownership(&state, &user, owner).await?;

    state.kyc.delete(document_id, &user.username).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Document deleted successfully".to_string(),
    }))
}

// ===== admin review =====

#[utoipa::path(put, path = "/api/kyc/admin/verify/{id}",
    params(("id" = i64, Path, description = "Document id"), ReviewQuery),
    responses((status = 200, body = KycDocumentResponse)))]
pub async fn verify_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(document_id): Path<i64>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<KycDocumentResponse>> {
    let doc = state
        .kyc
        .review(
            document_id,
            ReviewDecision::Verified,
            query.message.as_deref().unwrap_or(""),
            &user.username,
        )
        .await?;
    Ok(Json(doc.into()))
}

#[utoipa::path(put, path = "/api/kyc/admin/reject/{id}",
    params(("id" = i64, Path, description = "Document id"), ReviewQuery),
    responses((status = 200, body = KycDocumentResponse), (status = 400, description = "Missing rejection message")))]
pub async fn reject_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(document_id): Path<i64>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<KycDocumentResponse>> {
    let doc = state
        .kyc
        .review(
            document_id,
            ReviewDecision::Rejected,
            query.message.as_deref().unwrap_or(""),
            &user.username,
        )
        .await?;
    Ok(Json(doc.into()))
}

#[utoipa::path(get, path = "/api/kyc/admin/pending-verifications",
    responses((status = 200, body = [KycDocumentResponse])))]
pub async fn pending_verifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<KycDocumentResponse>>> {
    let docs = state.kyc.pending_verifications().await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/kyc/admin/documents/{customerId}",
    params(("customerId" = i64, Path, description = "Customer id")),
    responses((status = 200, body = [KycDocumentResponse])))]
pub async fn customer_documents(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Vec<KycDocumentResponse>>> {
    let docs = state.kyc.documents_by_customer(customer_id).await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/kyc/admin/stats", responses((status = 200, body = KycStats)))]
pub async fn kyc_stats(State(state): State<AppState>) -> Result<Json<KycStats>> {
    Ok(Json(state.kyc.statistics().await?))
}

// ===== admin customer views =====

#[utoipa::path(get, path = "/admin/customers", params(CustomerListQuery),
    responses((status = 200, body = CustomerPage)))]
pub async fn list_customers(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<CustomerPage>> {
    let page = state
        .customers
        .list_customers(
            query.search.as_deref(),
            query.kyc_status.as_deref(),
            query.page,
            query.size,
            &user.token,
        )
        .await?;
    Ok(Json(page))
}

#[utoipa::path(get, path = "/admin/customers/{id}",
    params(("id" = i64, Path, description = "Customer id")),
    responses((status = 200, body = CustomerDto), (status = 404, description = "Customer not found")))]
pub async fn get_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(customer_id): Path<i64>,
) -> Result<Json<CustomerDto>> {
    let customer = state
        .customers
        .fetch_customer(customer_id, &user.token)
        .await?;
    Ok(Json(customer))
}

#[utoipa::path(post, path = "/admin/approve-customer/{customerId}",
    params(("customerId" = i64, Path, description = "Customer id")),
    responses((status = 200, body = ActionResponse),
        (status = 400, description = "Aggregate incomplete"),
        (status = 502, description = "Customer service rejected the update")))]
pub async fn approve_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(customer_id): Path<i64>,
) -> Result<Json<ActionResponse>> {
    info!(action = "approve_customer_request", customer_id, by = %user.username);
    state.approval.approve_customer(customer_id, &user.token).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Customer KYC approved successfully".to_string(),
    }))
}

// ===== public =====

pub async fn health_check() -> &'static str {
    "OK"
}
