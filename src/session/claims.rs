//! Unverified decoding of the token payload.
//!
//! The signature is never checked: claims only drive presentation, the backend
//! decides what a request may do.
//!
//! Extraction rules, applied once here instead of at every caller:
//!
//! | field      | accepted shapes                                   |
//! |------------|---------------------------------------------------|
//! | `sub`, `user_id`, `id`, `role_id` | string or integer, kept as text |
//! | `username`, `email`, `role_name`  | string                          |
//! | `role`     | string, list of strings, or `{ "name": .. }`      |
//! | `roles`    | list of strings or `{ "name": .. }` objects       |
//! | `exp`      | seconds since the epoch, number or numeric string |
//!
//! `roleId` is accepted as an alias of `role_id`. A field with an unexpected
//! shape is dropped, it never invalidates the rest of the payload. The one
//! exception is `exp`: `0`, `""`, `false` and `null` mean no expiry, while any
//! other value that is not a number is kept as [`Expiry::Unreadable`] and the
//! token counts as expired.

use base64ct::{Base64, Encoding};
use serde::Serialize;
use serde_json::{Map, Value};

/// Expiry claim of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Seconds since the epoch
    At(i64),
    /// Present but not a number
    Unreadable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub user_id: Option<String>,
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Vec<String>,
    pub roles: Vec<String>,
    pub role_name: Option<String>,
    pub role_id: Option<String>,
    pub exp: Option<Expiry>,
    /// Everything else the payload carried
    pub extra: Map<String, Value>,
}

const KNOWN_FIELDS: &[&str] = &[
    "sub", "user_id", "id", "username", "email", "role", "roles", "role_name", "role_id", "roleId", "exp",
];

impl Claims {
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let extra = payload
            .iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            sub: identifier(payload.get("sub")),
            user_id: identifier(payload.get("user_id")),
            id: identifier(payload.get("id")),
            username: text(payload.get("username")),
            email: text(payload.get("email")),
            role: role_names(payload.get("role")),
            roles: match payload.get("roles") {
                Some(Value::Array(_)) => role_names(payload.get("roles")),
                _ => Vec::new(),
            },
            role_name: text(payload.get("role_name")),
            role_id: identifier(payload.get("role_id")).or_else(|| identifier(payload.get("roleId"))),
            exp: expiry(payload.get("exp")),
            extra,
        }
    }

    /// Whether the token is still live at `now` (seconds). Claims without an
    /// expiry never expire; an unreadable expiry is already past.
    pub fn is_live_at(&self, now: i64) -> bool {
        match self.exp {
            Some(Expiry::At(exp)) => exp > now,
            Some(Expiry::Unreadable) => false,
            None => true,
        }
    }

    /// Expiry timestamp when the token carries a readable one
    pub fn expires_at(&self) -> Option<i64> {
        match self.exp {
            Some(Expiry::At(exp)) => Some(exp),
            _ => None,
        }
    }
}

/// Decode the payload segment of `token`.
///
/// Returns `None` when the token has fewer than two segments, the payload is
/// not base64url, or it does not hold a JSON object.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() < 2 {
        return None;
    }

    let mut payload: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let pad = payload.len() % 4;
    if pad != 0 {
        payload.push_str(&"=".repeat(4 - pad));
    }

    let bytes = Base64::decode_vec(&payload).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(Claims::from_payload(&map)),
        _ => None,
    }
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn role_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(role_name).collect(),
        Some(other) => role_name(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn role_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => text(map.get("name")),
        _ => None,
    }
}

fn expiry(value: Option<&Value>) -> Option<Expiry> {
    let seconds = match value? {
        Value::Null | Value::Bool(false) => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    match seconds {
        // A bare 0 is "no expiry"; "0" as text is a timestamp in the past
        Some(f) if f == 0.0 && matches!(value, Some(Value::Number(_))) => None,
        // `exp > now` for a fractional exp holds exactly when its ceiling does
        Some(f) => Some(Expiry::At(f.ceil() as i64)),
        None => Some(Expiry::Unreadable),
    }
}
