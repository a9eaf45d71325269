//! Server-rendered pages and the form posts behind them. Every form post
//! answers with a redirect and leaves a one-shot flash message in a cookie.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::error;

use weathermail_report::escape_html;
use weathermail_types::City;
use weathermail_types::api::{Claims, SubscriptionRequest, SubscriptionView};

use crate::auth::{AppState, authenticate, clear_session, session_cookie, signup_account};
use crate::error::ApiError;
use crate::middleware::session_claims;
use crate::subscriptions::{
    list_for_user, parse_subscribe, parse_unsubscribe, subscribe_user, unsubscribe_user,
};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub signup_username: String,
    #[serde(default)]
    pub signup_email: String,
    #[serde(default)]
    pub signup_password: String,
}

/// GET /, the subscription dashboard for a logged-in user.
pub async fn home(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    let Some(claims) = session_claims(&headers, &jar, &state.jwt_secret) else {
        return Redirect::to("/auth").into_response();
    };

    let (jar, flash) = take_flash(jar);
    let subscriptions = match list_for_user(&state, claims.sub, None).await {
        Ok(subs) => subs,
        Err(e) => {
            log_internal(&e);
            Vec::new()
        }
    };

    let body = dashboard(&claims, &subscriptions);
    (jar, Html(layout("Your subscriptions", flash, &body))).into_response()
}

/// GET /auth, login and signup forms.
pub async fn auth_page(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    if session_claims(&headers, &jar, &state.jwt_secret).is_some() {
        return Redirect::to("/").into_response();
    }

    let (jar, flash) = take_flash(jar);
    (jar, Html(layout("Sign in", flash, AUTH_FORMS))).into_response()
}

pub async fn login_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() {
        return flash_redirect(jar, FlashKind::Error, "Username and password are required", "/auth");
    }

    match authenticate(&state, &form.username, &form.password).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.token));
            flash_redirect(jar, FlashKind::Success, "Logged in successfully", "/")
        }
        Err(e) => fail(jar, e, "/auth"),
    }
}

pub async fn signup_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let result = signup_account(
        &state,
        form.signup_username.trim(),
        form.signup_email.trim(),
        &form.signup_password,
    )
    .await;

    match result {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.token));
            flash_redirect(jar, FlashKind::Success, "Account created successfully", "/")
        }
        Err(e) => fail(jar, e, "/auth"),
    }
}

pub async fn logout(jar: CookieJar) -> Response {
    flash_redirect(clear_session(jar), FlashKind::Success, "Logged out", "/auth")
}

pub async fn subscribe_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<SubscriptionRequest>,
) -> Response {
    let Some(claims) = session_claims(&headers, &jar, &state.jwt_secret) else {
        return flash_redirect(jar, FlashKind::Error, "Please log in first", "/auth");
    };

    let outcome = async {
        let (email, city) = parse_subscribe(&form)?;
        subscribe_user(&state, claims.sub, &email, city).await?;
        Ok::<_, ApiError>(format!("Subscribed {} to {}", email, city))
    }
    .await;

    match outcome {
        Ok(message) => flash_redirect(jar, FlashKind::Success, &message, "/"),
        Err(e) => fail(jar, e, "/"),
    }
}

pub async fn unsubscribe_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<SubscriptionRequest>,
) -> Response {
    let Some(claims) = session_claims(&headers, &jar, &state.jwt_secret) else {
        return flash_redirect(jar, FlashKind::Error, "Please log in first", "/auth");
    };

    let outcome = async {
        let (email, city) = parse_unsubscribe(&form)?;
        unsubscribe_user(&state, claims.sub, &email, city).await?;
        Ok::<_, ApiError>(format!("Unsubscribed {} from {}", email, city))
    }
    .await;

    match outcome {
        Ok(message) => flash_redirect(jar, FlashKind::Success, &message, "/"),
        Err(e) => fail(jar, e, "/"),
    }
}

fn fail(jar: CookieJar, err: ApiError, to: &str) -> Response {
    log_internal(&err);
    flash_redirect(jar, FlashKind::Error, &err.to_string(), to)
}

fn log_internal(err: &ApiError) {
    if let ApiError::Internal(e) = err {
        error!("Internal error: {:#}", e);
    }
}

fn flash_redirect(jar: CookieJar, kind: FlashKind, message: &str, to: &str) -> Response {
    let cookie = Cookie::build((FLASH_COOKIE, format!("{}:{}", kind.as_str(), message)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), Redirect::to(to)).into_response()
}

/// Reads and clears the flash cookie.
fn take_flash(jar: CookieJar) -> (CookieJar, Option<(FlashKind, String)>) {
    let flash = jar.get(FLASH_COOKIE).and_then(|c| parse_flash(c.value()));
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, flash)
}

fn parse_flash(raw: &str) -> Option<(FlashKind, String)> {
    let (kind, message) = raw.split_once(':')?;
    let kind = match kind {
        "success" => FlashKind::Success,
        "error" => FlashKind::Error,
        _ => return None,
    };
    Some((kind, message.to_string()))
}

fn layout(title: &str, flash: Option<(FlashKind, String)>, body: &str) -> String {
    let flash = flash
        .map(|(kind, message)| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                kind.as_str(),
                escape_html(&message)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} - Weathermail</title>
<style>
  body {{ font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; color: #333; }}
  .flash {{ padding: 10px 14px; border-radius: 6px; margin-bottom: 16px; }}
  .flash.success {{ background: #e3f6e5; }}
  .flash.error {{ background: #fbe3e3; }}
  form {{ margin: 12px 0; }}
  input, select {{ padding: 6px; margin-right: 6px; }}
  table {{ width: 100%; border-collapse: collapse; }}
  td, th {{ text-align: left; padding: 6px; border-bottom: 1px solid #eee; }}
</style>
</head>
<body>
<h1>{title}</h1>
{flash}
{body}
</body>
</html>
"#,
        title = escape_html(title),
    )
}

const AUTH_FORMS: &str = r#"<h2>Log in</h2>
<form method="post" action="/login">
  <input name="username" placeholder="Username" required>
  <input name="password" type="password" placeholder="Password" required>
  <button type="submit">Log in</button>
</form>
<h2>Sign up</h2>
<form method="post" action="/signup">
  <input name="signup_username" placeholder="Username" required>
  <input name="signup_email" type="email" placeholder="Email" required>
  <input name="signup_password" type="password" placeholder="Password (8+ characters)" required>
  <button type="submit">Create account</button>
</form>"#;

fn dashboard(claims: &Claims, subscriptions: &[SubscriptionView]) -> String {
    let options: String = City::all()
        .iter()
        .map(|city| format!(r#"<option value="{0}">{0}</option>"#, city))
        .collect();

    let rows: String = subscriptions
        .iter()
        .map(|sub| {
            let email = escape_html(&sub.email);
            format!(
                r#"<tr><td>{email}</td><td>{city}</td><td>{since}</td><td>
<form method="post" action="/unsubscribe-form">
  <input type="hidden" name="email" value="{email}">
  <input type="hidden" name="city" value="{city}">
  <button type="submit">Unsubscribe</button>
</form></td></tr>"#,
                city = sub.city,
                since = sub.subscribed_at.format("%Y-%m-%d"),
            )
        })
        .collect();

    let table = if rows.is_empty() {
        "<p>No subscriptions yet.</p>".to_string()
    } else {
        format!("<table><tr><th>Email</th><th>City</th><th>Since</th><th></th></tr>{rows}</table>")
    };

    format!(
        r#"<p>Signed in as <strong>{user}</strong> · <a href="/logout">Log out</a></p>
<h2>Subscribe</h2>
<form method="post" action="/subscribe-form">
  <input name="email" type="email" placeholder="you@example.com" required>
  <select name="city">{options}</select>
  <button type="submit">Subscribe</button>
</form>
<h2>Current subscriptions</h2>
{table}"#,
        user = escape_html(&claims.username),
    )
}
