use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

pub const AUTH_COOKIE: &str = "auth_token";

/// Adds the session cookie carrying `token` to `jar`.
pub fn set_auth_cookie(jar: CookieJar, token: &str, max_age_secs: i64) -> CookieJar {
    let cookie = Cookie::build((AUTH_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build();
    jar.add(cookie)
}

/// Expires every cookie the session relies on.
pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    let cookie = Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    jar.add(cookie)
}
