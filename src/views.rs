//! Declarative visibility rules for role-gated views.
//!
//! Each view id maps to one [`Visibility`] rule; evaluation is a pure function
//! of the authentication state and the role set, so calling it repeatedly with
//! the same inputs always yields the same map. Rules are advisory: they decide
//! what is offered, the backend decides what is allowed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::roles::RoleSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Always,
    AuthOnly,
    GuestOnly,
    /// Shown to authenticated users holding any of these roles (names or ids)
    Roles(Vec<String>),
}

impl Visibility {
    /// Rule from a comma-separated role list such as `"Администратор,admin"`
    pub fn roles(list: &str) -> Self {
        let roles: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if roles.is_empty() {
            Visibility::Always
        } else {
            Visibility::Roles(roles)
        }
    }

    /// Rule from markup-style markers (`data-auth-only`, `data-guest-only`,
    /// `data-role` / `data-roles`). A role list wins over the other markers.
    pub fn from_attributes(auth_only: bool, guest_only: bool, roles: Option<&str>) -> Self {
        match roles.map(Visibility::roles) {
            Some(rule @ Visibility::Roles(_)) => rule,
            _ if guest_only => Visibility::GuestOnly,
            _ if auth_only => Visibility::AuthOnly,
            _ => Visibility::Always,
        }
    }

    pub fn is_visible(&self, authenticated: bool, roles: &RoleSet) -> bool {
        match self {
            Visibility::Always => true,
            Visibility::AuthOnly => authenticated,
            Visibility::GuestOnly => !authenticated,
            Visibility::Roles(required) if required.is_empty() => true,
            Visibility::Roles(required) => authenticated && roles.matches_any(required),
        }
    }
}

/// On-disk form of one rule
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    #[serde(default)]
    auth_only: bool,
    #[serde(default)]
    guest_only: bool,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<RuleSpec> for Visibility {
    fn from(rule: RuleSpec) -> Self {
        let roles: Vec<String> = rule
            .roles
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if !roles.is_empty() {
            Visibility::Roles(roles)
        } else {
            Visibility::from_attributes(rule.auth_only, rule.guest_only, None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    views: BTreeMap<String, RuleSpec>,
}

/// View id → rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewRules {
    rules: BTreeMap<String, Visibility>,
}

impl ViewRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, view: &str, rule: Visibility) -> Self {
        self.rules.insert(view.to_string(), rule);
        self
    }

    pub fn insert(&mut self, view: &str, rule: Visibility) {
        self.rules.insert(view.to_string(), rule);
    }

    pub fn get(&self, view: &str) -> Option<&Visibility> {
        self.rules.get(view)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules mirroring the admin screens
    pub fn admin_console() -> Self {
        let admin = "Администратор,admin";
        let staff = "Администратор,admin,Преподаватель,teacher";
        Self::new()
            .with("home", Visibility::Always)
            .with("login", Visibility::GuestOnly)
            .with("profile", Visibility::AuthOnly)
            .with("users", Visibility::roles(admin))
            .with("roles", Visibility::roles(admin))
            .with("teachers", Visibility::roles(admin))
            .with("students", Visibility::roles(admin))
            .with("courses", Visibility::roles(staff))
            .with("enrollments", Visibility::roles(staff))
            .with("grades", Visibility::roles(staff))
            .with("schedule", Visibility::roles(staff))
            .with("reports", Visibility::roles(staff))
    }

    /// Parse a YAML document of the form
    ///
    /// ```yaml
    /// views:
    ///   users: { roles: [admin, Администратор] }
    ///   login: { guest_only: true }
    ///   home: {}
    /// ```
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let file: RulesFile = serde_yaml::from_str(source)?;
        Ok(Self {
            rules: file
                .views
                .into_iter()
                .map(|(view, rule)| (view, Visibility::from(rule)))
                .collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Start with every view hidden, then reveal those whose rule holds
    pub fn evaluate(&self, authenticated: bool, roles: &RoleSet) -> VisibilityMap {
        let mut shown: BTreeMap<String, bool> = self.rules.keys().map(|view| (view.clone(), false)).collect();
        for (view, rule) in &self.rules {
            if rule.is_visible(authenticated, roles) {
                shown.insert(view.clone(), true);
            }
        }
        VisibilityMap(shown)
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityMap(BTreeMap<String, bool>);

impl VisibilityMap {
    /// Unknown views are hidden
    pub fn is_visible(&self, view: &str) -> bool {
        self.0.get(view).copied().unwrap_or(false)
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, shown)| **shown).map(|(view, _)| view.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(view, shown)| (view.as_str(), *shown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> RoleSet {
        names.iter().collect()
    }

    #[test]
    fn test_role_gate_matches_either_vocabulary() {
        let rules = ViewRules::new().with("users", Visibility::from_attributes(false, false, Some("Администратор,admin")));

        let shown = rules.evaluate(true, &roles(&["admin"]));
        assert!(shown.is_visible("users"));

        let shown = rules.evaluate(true, &roles(&["student"]));
        assert!(!shown.is_visible("users"));
    }

    #[test]
    fn test_role_gate_requires_authentication() {
        let rules = ViewRules::new().with("users", Visibility::roles("admin"));
        assert!(!rules.evaluate(false, &roles(&["admin"])).is_visible("users"));
    }

    #[test]
    fn test_guest_and_auth_markers() {
        let rules = ViewRules::new()
            .with("login", Visibility::from_attributes(false, true, None))
            .with("profile", Visibility::from_attributes(true, false, None))
            .with("home", Visibility::from_attributes(false, false, Some(" , ")));

        let guest = rules.evaluate(false, &RoleSet::new());
        assert!(guest.is_visible("login"));
        assert!(!guest.is_visible("profile"));
        assert!(guest.is_visible("home"));

        let member = rules.evaluate(true, &RoleSet::new());
        assert!(!member.is_visible("login"));
        assert!(member.is_visible("profile"));
    }

    #[test]
    fn test_numeric_role_ids() {
        let rules = ViewRules::new().with("grades", Visibility::roles("2"));
        let mut set = RoleSet::new();
        set.insert_id("2");
        assert!(rules.evaluate(true, &set).is_visible("grades"));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let rules = ViewRules::admin_console();
        let set = roles(&["teacher", "преподаватель"]);

        let first = rules.evaluate(true, &set);
        let second = rules.evaluate(true, &set);
        assert_eq!(first, second);
        assert!(first.is_visible("grades"));
        assert!(!first.is_visible("users"));
        assert!(!first.is_visible("login"));
        assert!(!first.is_visible("unknown-view"));
    }

    #[test]
    fn test_yaml_rules() {
        let rules = ViewRules::from_yaml(
            r#"
views:
  users: { roles: [admin, Администратор] }
  login: { guest_only: true }
  profile: { auth_only: true }
  home: {}
"#,
        )
        .unwrap();

        assert_eq!(
            rules.get("users"),
            Some(&Visibility::Roles(vec!["admin".to_string(), "Администратор".to_string()]))
        );
        assert_eq!(rules.get("login"), Some(&Visibility::GuestOnly));
        assert_eq!(rules.get("profile"), Some(&Visibility::AuthOnly));
        assert_eq!(rules.get("home"), Some(&Visibility::Always));

        assert!(ViewRules::from_yaml("views:\n  users: { role: admin }\n").is_err());
    }
}
