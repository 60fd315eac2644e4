use serde::Serialize;

use crate::models::User;
use crate::session::claims::Claims;

/// The signed-in user as far as the client can tell.
///
/// Built from token claims, optionally refined by the profile the backend
/// returns for the user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentUser {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role_names: Vec<String>,
    pub role_id: Option<String>,
    pub photo_url: Option<String>,
    pub claims: Option<Claims>,
}

impl CurrentUser {
    /// Apply the fallback rules: id from `sub`, `user_id`, `id`; username
    /// from `username`, `sub`; roles from `role`, `roles`, `role_name`.
    pub fn from_claims(claims: &Claims) -> Self {
        let id = claims
            .sub
            .clone()
            .or_else(|| claims.user_id.clone())
            .or_else(|| claims.id.clone());
        let username = claims.username.clone().or_else(|| claims.sub.clone());

        let mut role_names: Vec<String> = claims.role.clone();
        role_names.extend(claims.roles.iter().cloned());
        role_names.extend(claims.role_name.iter().cloned());

        Self {
            id,
            username,
            email: claims.email.clone(),
            role_names,
            role_id: claims.role_id.clone(),
            photo_url: None,
            claims: Some(claims.clone()),
        }
    }

    /// Numeric user id usable in `/users/{id}`.
    ///
    /// Tokens often carry the username in `sub`, so `user_id` and `id` are
    /// tried before giving up.
    pub fn numeric_id(&self) -> Option<i64> {
        let from_claims = self.claims.as_ref().and_then(|c| {
            [&c.user_id, &c.id, &c.sub]
                .into_iter()
                .flatten()
                .find_map(|v| v.parse::<i64>().ok())
        });
        from_claims.or_else(|| self.id.as_deref().and_then(|v| v.parse().ok()))
    }

    /// Overlay what the backend reports about the user
    pub fn merge_profile(&mut self, profile: &User) {
        self.id = Some(profile.id.to_string());
        self.username = Some(profile.username.clone());
        if profile.email.is_some() {
            self.email = profile.email.clone();
        }
        if profile.photo_url.is_some() {
            self.photo_url = profile.photo_url.clone();
        }
        if let Some(role_id) = profile.role_id {
            self.role_id = Some(role_id.to_string());
        }
        if let Some(role) = &profile.role {
            self.role_names.push(role.name.clone());
        }
        if let Some(name) = profile.extra.get("role_name").and_then(|v| v.as_str()) {
            self.role_names.push(name.to_string());
        }
    }

    /// Label for prompts and status lines
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.id.as_ref().map(|id| format!("User {id}")))
            .unwrap_or_else(|| "Profile".to_string())
    }
}
