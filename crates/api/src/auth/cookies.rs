//! Session cookies.
//!
//! Both cookies are http-only, `SameSite=Lax`, path `/`, and `Secure` in
//! production. The access cookie lives as long as the access token; the
//! refresh cookie as long as the refresh token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::jwt::IssuedSession;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

fn session_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Add both session cookies to `jar`.
pub fn with_session(jar: CookieJar, session: &IssuedSession, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        session.access_token.clone(),
        session.access_expires_in,
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        session.refresh_token.clone(),
        session.refresh_expires_in,
        secure,
    ))
}

/// Remove both session cookies.
pub fn cleared(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> IssuedSession {
        IssuedSession {
            user_id: 1,
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            access_expires_in: 3600,
            refresh_expires_in: 604_800,
        }
    }

    #[test]
    fn session_cookies_have_expected_attributes() {
        let jar = with_session(CookieJar::new(), &session(), true);
        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "access");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(time::Duration::seconds(3600)));

        let refresh = jar.get(REFRESH_COOKIE).unwrap();
        assert_eq!(refresh.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn cleared_removes_both() {
        let jar = cleared(with_session(CookieJar::new(), &session(), false));
        assert!(jar.get(ACCESS_COOKIE).is_none());
        assert!(jar.get(REFRESH_COOKIE).is_none());
    }
}
