use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use folio_core::{now_millis, ContactMessage, Decision, RateLimiter};

use crate::cookies::CookieJar;
use crate::dto::{ContactRequest, ContactResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Validates the form, consumes a slot from the visitor's cookie-held quota,
/// and only then hands the message to the mailer.
///
/// Every response past validation carries the updated cookie, including
/// delivery failures: a failed send still counts against the quota.
/// Malformed bodies are reported through [`AppError`] like any other
/// validation failure.
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!("Rejected contact body: {rejection}");
        AppError::BadRequest(rejection.body_text())
    })?;
    let message = ContactMessage::new(&body.user_name, &body.user_email, &body.message)?;

    let jar = CookieJar::from_headers(&headers, &state.config.cookie);
    let mut limiter = RateLimiter::new(jar);
    let decision = limiter.check_and_consume(now_millis());
    let cookies = AppendHeaders(limiter.into_store().into_set_cookie_headers());

    let outcome = match decision {
        Decision::Denied { retry_after } => Err(AppError::RateLimited { retry_after }),
        Decision::Allowed { remaining } => state
            .mailer
            .send(&message)
            .await
            .map(|()| Json(ContactResponse::sent(remaining)))
            .map_err(AppError::from),
    };

    Ok((cookies, outcome).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, RETRY_AFTER, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use folio_core::limiter::STORAGE_KEY;
    use folio_core::{CoreError, CoreResult, Mailer, SubmissionLog};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    #[derive(Default)]
    struct MockMailer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for MockMailer {
        async fn send(&self, _message: &ContactMessage) -> CoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoreError::Delivery("provider unavailable".to_string()));
            }
            Ok(())
        }
    }

    impl MockMailer {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn app(mailer: Arc<MockMailer>) -> Router {
        let state = AppState {
            config: Arc::new(ServerConfig::default()),
            mailer,
        };
        Router::new()
            .nest("/api", crate::api::router())
            .with_state(state)
    }

    fn valid_body() -> serde_json::Value {
        serde_json::json!({
            "user_name": "Ada",
            "user_email": "ada@example.com",
            "message": "Would love to chat about a project."
        })
    }

    fn request(body: serde_json::Value, cookie: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn log_cookie(timestamps: &[u64]) -> String {
        let json = SubmissionLog::from_timestamps(timestamps.to_vec()).encode().unwrap();
        format!("{STORAGE_KEY}={}", urlencoding::encode(&json))
    }

    /// Decodes the submission log from the response's `Set-Cookie`, if any.
    fn stored_log(response: &Response) -> Option<SubmissionLog> {
        let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
        let value = header
            .strip_prefix(&format!("{STORAGE_KEY}="))?
            .split(';')
            .next()?;
        Some(SubmissionLog::parse(&urlencoding::decode(value).ok()?))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn first_submission_is_sent_and_recorded() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(request(valid_body(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mailer.calls(), 1);
        assert_eq!(stored_log(&response).unwrap().len(), 1);

        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("Max-Age=3600"));
        assert!(set_cookie.contains("SameSite=Strict"));

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "success");
        assert_eq!(body["remaining"], 4);
    }

    #[tokio::test]
    async fn full_quota_is_denied_without_sending() {
        let mailer = Arc::new(MockMailer::default());
        let recent = now_millis() - 1_000;

        let response = app(mailer.clone())
            .oneshot(request(valid_body(), Some(log_cookie(&[recent; 5]))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(mailer.calls(), 0);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let retry: u64 = response.headers()[RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 3_500 && retry <= 3_600);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], "ratelimit");
    }

    #[tokio::test]
    async fn denial_still_rewrites_pruned_cookie() {
        let mailer = Arc::new(MockMailer::default());
        let now = now_millis();
        let stale = now - 2 * 3_600_000;
        let recent = now - 1_000;

        let response = app(mailer.clone())
            .oneshot(request(
                valid_body(),
                Some(log_cookie(&[stale, recent, recent, recent, recent, recent])),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(mailer.calls(), 0);
        assert_eq!(stored_log(&response).unwrap().timestamps(), &[recent; 5]);
    }

    #[tokio::test]
    async fn corrupted_cookie_is_treated_as_empty() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(request(
                valid_body(),
                Some(format!("{STORAGE_KEY}=not%20json")),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mailer.calls(), 1);
        assert_eq!(stored_log(&response).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_the_consumed_slot() {
        let mailer = Arc::new(MockMailer {
            fail: true,
            ..Default::default()
        });
        let earlier = now_millis() - 60_000;

        let response = app(mailer.clone())
            .oneshot(request(valid_body(), Some(log_cookie(&[earlier]))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(mailer.calls(), 1);
        assert_eq!(stored_log(&response).unwrap().len(), 2);

        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Failed to send message");
    }

    #[tokio::test]
    async fn invalid_form_never_touches_the_quota() {
        let mailer = Arc::new(MockMailer::default());
        let body = serde_json::json!({ "user_name": "Ada", "user_email": "nope", "message": "Hi" });

        let response = app(mailer.clone())
            .oneshot(request(body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mailer.calls(), 0);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid email: is not a valid address");
    }

    #[tokio::test]
    async fn missing_fields_are_a_validation_error() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(request(serde_json::json!({}), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mailer.calls(), 0);
    }

    fn raw_request(content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/api/contact");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn assert_json_bad_request(response: Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], "error");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn non_json_body_is_a_json_bad_request() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(raw_request(Some("application/json"), "not json"))
            .await
            .unwrap();

        assert_json_bad_request(response).await;
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn wrong_typed_field_is_a_json_bad_request() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(raw_request(
                Some("application/json"),
                r#"{"user_name":5,"user_email":"ada@example.com","message":"Hi"}"#,
            ))
            .await
            .unwrap();

        assert_json_bad_request(response).await;
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_json_bad_request() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(raw_request(None, &valid_body().to_string()))
            .await
            .unwrap();

        assert_json_bad_request(response).await;
        assert_eq!(mailer.calls(), 0);
    }

    #[tokio::test]
    async fn unrelated_cookies_are_ignored() {
        let mailer = Arc::new(MockMailer::default());

        let response = app(mailer.clone())
            .oneshot(request(valid_body(), Some("theme=dark; lang=en".to_string())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(set_cookies.len(), 1);
    }
}
