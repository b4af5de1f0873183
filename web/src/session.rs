//! Cookie side of the stateless session: issue, validate and revoke the
//! session marker and the display name cookie.

use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use identity::session::MarkerSigner;
use identity::DisplayIdentity;
use log::*;
use service::config::Config;
use time::OffsetDateTime;

/// Upper bound on the configured lifetime (ten years).
const MAX_SESSION_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    Valid,
    Invalid,
}

#[derive(Clone)]
pub struct SessionStore {
    signer: Arc<MarkerSigner>,
    session_cookie: String,
    identity_cookie: String,
    secure: bool,
}

impl SessionStore {
    pub fn new(
        signer: MarkerSigner,
        session_cookie: impl Into<String>,
        identity_cookie: impl Into<String>,
        secure: bool,
    ) -> Self {
        Self {
            signer: Arc::new(signer),
            session_cookie: session_cookie.into(),
            identity_cookie: identity_cookie.into(),
            secure,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, identity::Error> {
        let seconds = config.session_max_age_seconds.min(MAX_SESSION_SECONDS);
        let max_age = chrono::Duration::seconds(seconds as i64);
        let signer = match config.session_secret() {
            Some(secret) => MarkerSigner::new(secret.as_bytes(), max_age)?,
            None => {
                warn!("No session secret configured; sessions will not survive a restart");
                MarkerSigner::with_random_secret(max_age)?
            }
        };
        Ok(Self::new(
            signer,
            config.session_cookie_name.clone(),
            config.identity_cookie_name.clone(),
            config.is_secure(),
        ))
    }

    pub fn validity(&self, jar: &CookieJar) -> SessionValidity {
        self.validity_at(jar, Utc::now())
    }

    pub fn validity_at(&self, jar: &CookieJar, now: DateTime<Utc>) -> SessionValidity {
        match jar.get(&self.session_cookie) {
            Some(cookie) if self.signer.is_valid(cookie.value(), now) => SessionValidity::Valid,
            _ => SessionValidity::Invalid,
        }
    }

    /// Cookies establishing a fresh session for `identity`.
    pub fn issue(&self, identity: &DisplayIdentity) -> Vec<Cookie<'static>> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &DisplayIdentity, now: DateTime<Utc>) -> Vec<Cookie<'static>> {
        let max_age = time::Duration::seconds(self.signer.max_age().num_seconds());
        let marker = self.signer.issue(now);
        let display_name = urlencoding::encode(identity.as_str()).into_owned();

        vec![
            Cookie::build((self.session_cookie.clone(), marker))
                .path("/")
                .http_only(true)
                .secure(self.secure)
                .same_site(SameSite::Lax)
                .max_age(max_age)
                .build(),
            Cookie::build((self.identity_cookie.clone(), display_name))
                .path("/")
                .http_only(false)
                .secure(self.secure)
                .same_site(SameSite::Lax)
                .max_age(max_age)
                .build(),
        ]
    }

    /// Cookies that immediately expire both the session and display name.
    pub fn revoke(&self) -> Vec<Cookie<'static>> {
        [&self.session_cookie, &self.identity_cookie]
            .into_iter()
            .map(|name| {
                Cookie::build((name.clone(), String::new()))
                    .path("/")
                    .secure(self.secure)
                    .max_age(time::Duration::ZERO)
                    .expires(OffsetDateTime::UNIX_EPOCH)
                    .build()
            })
            .collect()
    }
}

/// Append cookies as `Set-Cookie` headers. Values are written verbatim; the
/// display name is already percent-encoded by [`SessionStore::issue`].
pub fn append_cookies(headers: &mut HeaderMap, cookies: Vec<Cookie<'static>>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => error!("Dropping unencodable cookie {}: {e}", cookie.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(
            MarkerSigner::new(b"secret", chrono::Duration::days(7)).unwrap(),
            "quartz_session",
            "quartz_username",
            false,
        )
    }

    fn jar_with(cookies: Vec<Cookie<'static>>) -> CookieJar {
        cookies
            .into_iter()
            .fold(CookieJar::new(), |jar, cookie| jar.add(cookie))
    }

    #[test]
    fn test_issued_cookies_make_a_valid_session() {
        let store = store();
        let cookies = store.issue(&DisplayIdentity::new("alice"));
        assert_eq!(store.validity(&jar_with(cookies)), SessionValidity::Valid);
    }

    #[test]
    fn test_missing_or_forged_marker_is_invalid() {
        let store = store();
        assert_eq!(store.validity(&CookieJar::new()), SessionValidity::Invalid);

        let forged = jar_with(vec![Cookie::new("quartz_session", "is_authenticated")]);
        assert_eq!(store.validity(&forged), SessionValidity::Invalid);
    }

    #[test]
    fn test_session_expires() {
        let store = store();
        let now = Utc::now();
        let jar = jar_with(store.issue_at(&DisplayIdentity::new("alice"), now));
        assert_eq!(
            store.validity_at(&jar, now + chrono::Duration::days(8)),
            SessionValidity::Invalid
        );
    }

    #[test]
    fn test_cookie_attributes() {
        let cookies = store().issue(&DisplayIdentity::new("李雷"));

        let session = cookies[0].to_string();
        assert!(session.starts_with("quartz_session="));
        assert!(session.contains("HttpOnly"));
        assert!(session.contains("Path=/"));
        assert!(session.contains("Max-Age=604800"));

        let name = cookies[1].to_string();
        assert!(name.starts_with("quartz_username=%E6%9D%8E%E9%9B%B7"));
        assert!(!name.contains("HttpOnly"));
        assert!(name.contains("Max-Age=604800"));
    }

    #[test]
    fn test_secure_flag_follows_configuration() {
        let secure = SessionStore::new(
            MarkerSigner::new(b"secret", chrono::Duration::days(7)).unwrap(),
            "s",
            "u",
            true,
        );
        for cookie in secure.issue(&DisplayIdentity::placeholder()) {
            assert!(cookie.to_string().contains("Secure"));
        }
    }

    #[test]
    fn test_revoke_expires_both_cookies() {
        let cookies = store().revoke();
        assert_eq!(cookies.len(), 2);
        for cookie in &cookies {
            assert_eq!(cookie.value(), "");
            assert!(cookie.to_string().contains("Max-Age=0"));
        }
        assert_eq!(cookies[0].name(), "quartz_session");
        assert_eq!(cookies[1].name(), "quartz_username");
    }

    #[test]
    fn test_append_cookies_writes_set_cookie_headers() {
        let mut headers = HeaderMap::new();
        append_cookies(&mut headers, store().revoke());
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }
}
