//! User profiles and the multi-system role map.
//!
//! Roles are stored in `user_profiles.roles` as JSON text, one entry per
//! system, e.g. `{"bento": ["admin"], "reimburse": ["user"]}`. Every system
//! only recognizes the `admin` and `user` role strings. The legacy global
//! `is_admin` flag is kept as a separate column, not folded into the map.

use std::collections::HashMap;

use sea_orm::entity::prelude::*;

/// Closed enumeration of the systems a profile can hold roles in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemName {
    Bento,
    Reimburse,
    Img,
}

impl SystemName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bento => "bento",
            Self::Reimburse => "reimburse",
            Self::Img => "img",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "bento" => Some(Self::Bento),
            "reimburse" => Some(Self::Reimburse),
            "img" => Some(Self::Img),
            _ => None,
        }
    }
}

/// Typed view over the stored role JSON.
///
/// Unknown system keys and non-list values are dropped on parse; a missing or
/// malformed column yields an empty map. Lookups never fail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleMap {
    entries: HashMap<SystemName, Vec<String>>,
}

impl RoleMap {
    pub fn from_json(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return Self::default();
        };
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut entries = HashMap::new();
        for (key, roles) in object {
            let Some(system) = SystemName::from_key(key) else {
                continue;
            };
            let Some(list) = roles.as_array() else {
                continue;
            };
            let roles = list
                .iter()
                .filter_map(|role| role.as_str().map(ToString::to_string))
                .collect();
            entries.insert(system, roles);
        }
        Self { entries }
    }

    pub fn system_roles(&self, system: SystemName) -> &[String] {
        self.entries.get(&system).map_or(&[], Vec::as_slice)
    }

    pub fn has_role(&self, system: SystemName, role: &str) -> bool {
        self.system_roles(system).iter().any(|r| r == role)
    }

    pub fn is_system_admin(&self, system: SystemName) -> bool {
        self.has_role(system, "admin")
    }
}

/// A user profile with its decoded role map.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
    pub roles: RoleMap,
}

impl Profile {
    /// A user is reimburse admin iff the role map grants `admin` under
    /// `reimburse`, or the legacy global flag is set.
    pub fn is_reimburse_admin(&self) -> bool {
        self.roles.is_system_admin(SystemName::Reimburse) || self.is_admin
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
    /// JSON object mapping system name to role strings.
    pub roles: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Profile {
    fn from(model: Model) -> Self {
        Self {
            roles: RoleMap::from_json(model.roles.as_deref()),
            id: model.id,
            email: model.email,
            name: model.name,
            is_admin: model.is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_map_ignores_unknown_systems() {
        let map = RoleMap::from_json(Some(r#"{"reimburse": ["admin"], "wiki": ["admin"]}"#));
        assert!(map.is_system_admin(SystemName::Reimburse));
        assert!(map.system_roles(SystemName::Bento).is_empty());
    }

    #[test]
    fn role_map_tolerates_malformed_json() {
        assert_eq!(RoleMap::from_json(Some("not json")), RoleMap::default());
        assert_eq!(RoleMap::from_json(Some("[1,2]")), RoleMap::default());
        assert_eq!(RoleMap::from_json(None), RoleMap::default());
    }

    #[test]
    fn legacy_flag_grants_admin_regardless_of_map() {
        let profile = Profile {
            id: "u1".to_string(),
            email: None,
            name: None,
            is_admin: true,
            roles: RoleMap::from_json(Some(r#"{"reimburse": ["user"]}"#)),
        };
        assert!(profile.is_reimburse_admin());
    }

    #[test]
    fn user_role_is_not_admin() {
        let profile = Profile {
            id: "u1".to_string(),
            email: None,
            name: None,
            is_admin: false,
            roles: RoleMap::from_json(Some(r#"{"reimburse": ["user"]}"#)),
        };
        assert!(!profile.is_reimburse_admin());
    }
}
