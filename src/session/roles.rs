//! Role-set computation for role-gated views.
//!
//! Roles come from two vocabularies: the token carries short English names
//! (`admin`, `teacher`, `student`) while the role catalog holds display names
//! (`Администратор`, ...). Synonym groups bridge the two so a view written in
//! either vocabulary matches.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::models::Role;
use crate::session::user::CurrentUser;

/// Trim, lower-case and collapse internal whitespace
pub fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub struct SynonymGroup {
    pub key: &'static str,
    pub synonyms: &'static [&'static str],
    pub canonical: &'static str,
}

pub const SYNONYM_GROUPS: &[SynonymGroup] = &[
    SynonymGroup {
        key: "admin",
        synonyms: &["admin", "administrator", "админ", "администратор"],
        canonical: "Администратор",
    },
    SynonymGroup {
        key: "teacher",
        synonyms: &["teacher", "instructor", "lecturer", "преподаватель"],
        canonical: "Преподаватель",
    },
    SynonymGroup {
        key: "student",
        synonyms: &["student", "pupil", "ученик", "студент"],
        canonical: "Студент",
    },
];

/// id → name catalog served by `GET /roles/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoleCatalog {
    roles: Vec<Role>,
}

impl RoleCatalog {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    /// Build from a raw response body. Anything but a list is an empty
    /// catalog; list entries without an id and name are skipped.
    pub fn from_response(body: &Value) -> Self {
        let roles = match body {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| serde_json::from_value::<Role>(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };
        Self { roles }
    }

    pub fn find(&self, id: i64) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Normalized role names and role-id strings of the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a role name in normalized form; blank names are ignored
    pub fn insert_name(&mut self, name: &str) {
        let normalized = normalize(name);
        if !normalized.is_empty() {
            self.0.insert(normalized);
        }
    }

    /// Insert a role id verbatim
    pub fn insert_id(&mut self, id: &str) {
        let id = id.trim();
        if !id.is_empty() {
            self.0.insert(id.to_string());
        }
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.contains(entry)
    }

    /// Whether a required role (name or id, as written in a view rule)
    /// is held: by normalized name, raw text, or canonical number form.
    pub fn matches(&self, required: &str) -> bool {
        if self.0.contains(&normalize(required)) || self.0.contains(required) {
            return true;
        }
        numeric_form(required).is_some_and(|n| self.0.contains(&n))
    }

    pub fn matches_any<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().any(|r| self.matches(r.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for name in iter {
            set.insert_name(name.as_ref());
        }
        set
    }
}

fn numeric_form(value: &str) -> Option<String> {
    let n: f64 = value.trim().parse().ok()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some((n as i64).to_string())
    } else {
        None
    }
}

/// Merge every role hint of `user` into one normalized set, then expand
/// synonym groups against the catalog.
pub fn compute_role_set(user: Option<&CurrentUser>, catalog: &RoleCatalog) -> RoleSet {
    let mut set = RoleSet::new();
    let Some(user) = user else {
        return set;
    };

    if let Some(claims) = &user.claims {
        for name in claims.role.iter().chain(claims.roles.iter()) {
            set.insert_name(name);
        }
        if let Some(name) = &claims.role_name {
            set.insert_name(name);
        }
        if let Some(id) = &claims.role_id {
            set.insert_id(id);
        }
    }

    for name in &user.role_names {
        set.insert_name(name);
    }

    if let Some(id) = &user.role_id {
        set.insert_id(id);
        if let Some(role) = id.trim().parse::<i64>().ok().and_then(|id| catalog.find(id)) {
            set.insert_name(&role.name);
        }
    }

    expand_synonyms(&mut set, catalog);
    set
}

fn expand_synonyms(set: &mut RoleSet, catalog: &RoleCatalog) {
    for group in SYNONYM_GROUPS {
        let held = group.synonyms.iter().any(|s| set.contains(&normalize(s)));
        if !held {
            continue;
        }

        let canonical = normalize(group.canonical);
        set.insert_name(group.key);
        set.insert_name(&canonical);
        for role in catalog.roles() {
            if normalize(&role.name) == canonical {
                set.insert_name(&role.name);
            }
        }
    }
}
