use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    context::AppContext,
    error::GenerationError,
    mcp_server::ProfilePictureServer,
    pipeline::{self, GenerateProfilePictureRequest, UNAUTHENTICATED_MESSAGE},
};

/// Callable endpoint, signed object delivery and the MCP service at `mcp_path`.
pub fn router(ctx: Arc<AppContext>, mcp_path: &str) -> Router {
    let ctx_for_service = ctx.clone();
    let service = StreamableHttpService::new(
        move || Ok(ProfilePictureServer::new(ctx_for_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    Router::new()
        .route(
            "/generateProfilePicture",
            post(generate_profile_picture_callable).layer(CorsLayer::permissive()),
        )
        .route("/objects/{*path}", get(serve_signed_object))
        .nest_service(mcp_path, service)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Body of a callable invocation: `{"data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct CallableRequest {
    pub data: Value,
}

#[derive(Serialize)]
struct CallableSuccess<T> {
    result: T,
}

#[derive(Serialize)]
struct CallableFailure<'a> {
    error: CallableErrorBody<'a>,
}

#[derive(Serialize)]
struct CallableErrorBody<'a> {
    status: &'static str,
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

fn callable_error(err: &GenerationError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = CallableFailure {
        error: CallableErrorBody {
            status: err.status(),
            message: err.message(),
        },
    };
    (status, Json(body)).into_response()
}

/// Turns the raw body into the strict request schema.
fn parse_callable_body(
    body: Result<Json<CallableRequest>, JsonRejection>,
) -> Result<GenerateProfilePictureRequest, GenerationError> {
    let Json(envelope) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected callable body");
        GenerationError::invalid_argument(
            "Request body must be JSON of the form {\"data\": {...}}.",
        )
    })?;
    serde_json::from_value(envelope.data).map_err(|err| {
        tracing::warn!(error = %err, "Rejected callable data");
        GenerationError::invalid_argument(format!("Invalid request data: {err}"))
    })
}

/// `POST /generateProfilePicture`
pub async fn generate_profile_picture_callable(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Result<Json<CallableRequest>, JsonRejection>,
) -> Response {
    let Some(caller) = ctx.verifier.identity_from_headers(&headers) else {
        let err = GenerationError::unauthenticated(UNAUTHENTICATED_MESSAGE);
        tracing::warn!(status = err.status(), "Rejected request");
        return callable_error(&err);
    };
    let request = match parse_callable_body(body) {
        Ok(request) => request,
        Err(err) => return callable_error(&err),
    };
    match pipeline::generate_profile_picture(&ctx, Some(&caller), &request).await {
        Ok(result) => (StatusCode::OK, Json(CallableSuccess { result })).into_response(),
        Err(err) => callable_error(&err),
    }
}

#[derive(Debug, Deserialize)]
pub struct SignedReadQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// `GET /objects/{*path}`: serves an object to holders of a valid signed URL.
pub async fn serve_signed_object(
    State(ctx): State<Arc<AppContext>>,
    Path(path): Path<String>,
    Query(query): Query<SignedReadQuery>,
) -> Response {
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return json_error(StatusCode::FORBIDDEN, "missing signature");
    };
    if !ctx.objects.verify_signed_read(&path, expires, signature) {
        return json_error(StatusCode::FORBIDDEN, "invalid or expired signature");
    }
    let object = match ctx.objects.get(&path).await {
        Ok(Some(object)) => object,
        Ok(None) => return json_error(StatusCode::NOT_FOUND, "object not found"),
        Err(err) => {
            tracing::error!(path = %path, error = ?err, "Read object failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "read object failed");
        }
    };

    let mut response = (StatusCode::OK, object.bytes).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&object.metadata.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Some(value) = object
        .metadata
        .cache_control
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        headers.insert(CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_callable_error_shape() {
        let response =
            callable_error(&GenerationError::invalid_argument("Unable to download image."));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": {"status": "INVALID_ARGUMENT", "message": "Unable to download image."}})
        );
    }

    #[test]
    fn test_parse_callable_body() {
        let parsed = parse_callable_body(Ok(Json(CallableRequest {
            data: json!({"imageUrl": "https://x/y.png"}),
        })))
        .unwrap();
        assert_eq!(parsed.image_url, "https://x/y.png");

        let err = parse_callable_body(Ok(Json(CallableRequest {
            data: json!({"imageUrl": ["not", "a", "string"]}),
        })))
        .unwrap_err();
        assert_eq!(err.status(), "INVALID_ARGUMENT");

        let err = parse_callable_body(Ok(Json(CallableRequest { data: Value::Null }))).unwrap_err();
        assert_eq!(err.status(), "INVALID_ARGUMENT");
    }
}
