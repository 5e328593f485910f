use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use std::collections::HashMap;

/// Storage item holding the login flag.
pub const LOGGED_IN_ITEM: &str = "loggedIn";

// Ten years: the flag has no expiry of its own.
const COOKIE_MAX_AGE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Where session items persist between requests.
pub trait SessionStorage {
    fn get_item(&self, name: &str) -> Option<String>;
    fn set_item(&mut self, name: &str, value: &str);
    fn remove_item(&mut self, name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub logged_in: bool,
}

impl SessionState {
    pub fn load(storage: &impl SessionStorage) -> Self {
        SessionState {
            logged_in: storage.get_item(LOGGED_IN_ITEM).as_deref() == Some("true"),
        }
    }

    pub fn initialize(storage: &mut impl SessionStorage) -> Self {
        storage.set_item(LOGGED_IN_ITEM, "true");
        SessionState { logged_in: true }
    }

    pub fn clear(storage: &mut impl SessionStorage) -> Self {
        storage.remove_item(LOGGED_IN_ITEM);
        SessionState::default()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Incorrect credentials")]
    IncorrectCredentials,
}

/// The single accepted user id and password.
#[derive(Debug, Clone)]
pub struct Credentials {
    user_id: String,
    password: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }

    /// Surrounding whitespace in either field is ignored.
    pub fn check(&self, user_id: &str, password: &str) -> Result<(), LoginError> {
        if user_id.trim() == self.user_id && password.trim() == self.password {
            Ok(())
        } else {
            Err(LoginError::IncorrectCredentials)
        }
    }
}

/// Session items carried in browser cookies: read from the request's
/// `Cookie` header, written back as `Set-Cookie` headers on the response.
#[derive(Debug, Default)]
pub struct CookieStorage {
    items: HashMap<String, String>,
    outgoing: Vec<String>,
}

impl CookieStorage {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let items = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        CookieStorage {
            items,
            outgoing: Vec::new(),
        }
    }

    /// `Set-Cookie` headers for every change made through this storage.
    pub fn into_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in self.outgoing {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "dropping unencodable cookie"),
            }
        }
        headers
    }
}

impl SessionStorage for CookieStorage {
    fn get_item(&self, name: &str) -> Option<String> {
        self.items.get(name).cloned()
    }

    fn set_item(&mut self, name: &str, value: &str) {
        self.items.insert(name.to_string(), value.to_string());
        self.outgoing.push(format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            name, value, COOKIE_MAX_AGE_SECS
        ));
    }

    fn remove_item(&mut self, name: &str) {
        self.items.remove(name);
        self.outgoing
            .push(format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", name));
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

#[cfg(test)]
impl SessionStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> Option<String> {
        self.items.get(name).cloned()
    }

    fn set_item(&mut self, name: &str, value: &str) {
        self.items.insert(name.to_string(), value.to_string());
    }

    fn remove_item(&mut self, name: &str) {
        self.items.remove(name);
    }
}
