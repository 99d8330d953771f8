use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Role tag resolved by the identity layer. The engine never authenticates;
/// it only branches on what it is handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Diretor,
    Usuario,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Diretor => "diretor",
            Self::Usuario => "usuario",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "diretor" | "director" => Ok(Self::Diretor),
            "usuario" | "user" => Ok(Self::Usuario),
            other => Err(format!("unsupported role `{other}` (expected admin|diretor|usuario)")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    pub can_set_director_discount: bool,
    pub can_edit_plans: bool,
    pub can_edit_taxes: bool,
}

impl PermissionFlags {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => {
                Self { can_set_director_discount: true, can_edit_plans: true, can_edit_taxes: true }
            }
            Role::Diretor => Self {
                can_set_director_discount: true,
                can_edit_plans: false,
                can_edit_taxes: true,
            },
            Role::Usuario => Self::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub permissions: PermissionFlags,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self { user_id: user_id.into(), role, permissions: PermissionFlags::for_role(role) }
    }

    pub fn with_permissions(mut self, permissions: PermissionFlags) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn require(&self, allowed: bool, action: &'static str) -> Result<(), DomainError> {
        if allowed {
            return Ok(());
        }
        Err(DomainError::PermissionDenied { role: self.role.to_string(), action })
    }
}

#[cfg(test)]
mod tests {
    use super::{Actor, PermissionFlags, Role};
    use crate::errors::DomainError;

    #[test]
    fn role_defaults_gate_director_discount() {
        assert!(Actor::new("ana", Role::Admin).permissions.can_set_director_discount);
        assert!(Actor::new("bia", Role::Diretor).permissions.can_set_director_discount);
        assert!(!Actor::new("caio", Role::Usuario).permissions.can_set_director_discount);
    }

    #[test]
    fn explicit_flags_override_role_defaults() {
        let actor = Actor::new("caio", Role::Usuario).with_permissions(PermissionFlags {
            can_edit_taxes: true,
            ..PermissionFlags::default()
        });
        assert!(actor.require(actor.permissions.can_edit_taxes, "edit taxes").is_ok());
        assert!(matches!(
            actor.require(actor.permissions.can_edit_plans, "edit plans"),
            Err(DomainError::PermissionDenied { ref role, .. }) if role == "usuario"
        ));
    }

    #[test]
    fn role_serializes_with_portuguese_tags() {
        assert_eq!(serde_json::to_string(&Role::Diretor).expect("serialize"), r#""diretor""#);
        assert_eq!("director".parse::<Role>(), Ok(Role::Diretor));
    }
}
