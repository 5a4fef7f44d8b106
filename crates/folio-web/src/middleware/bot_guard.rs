//! Rejects contact submissions from scripted clients before they reach the
//! quota. Real browsers always send a User-Agent.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

const BOT_PATTERNS: &[&str] = &[
    "bot", "crawl", "spider", "scrape", "curl", "wget", "python-requests", "httpie", "go-http",
];

fn is_bot(user_agent: Option<&str>) -> bool {
    match user_agent {
        None => true,
        Some(ua) => {
            let ua_lower = ua.to_lowercase();
            BOT_PATTERNS.iter().any(|pattern| ua_lower.contains(pattern))
        }
    }
}

pub async fn bot_guard(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok());

    if is_bot(user_agent) {
        match user_agent {
            None => tracing::warn!("Blocked contact request without User-Agent"),
            Some(ua) => tracing::warn!("Blocked bot contact request: {ua}"),
        }
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_agent_is_blocked() {
        assert!(is_bot(None));
    }

    #[test]
    fn tools_are_blocked_case_insensitively() {
        assert!(is_bot(Some("curl/8.4.0")));
        assert!(is_bot(Some("Mozilla/5.0 (compatible; Googlebot/2.1)")));
        assert!(is_bot(Some("Python-Requests/2.31")));
    }

    #[test]
    fn browsers_pass() {
        assert!(!is_bot(Some(
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
        )));
    }
}
