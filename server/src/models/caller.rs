use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ticket::TicketOrigin;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Promoter,
    Staff,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "promoter" => Ok(Role::Promoter),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::AuthError(format!("Unknown role '{}'", other))),
        }
    }
}

/// Identity resolved by the collaborator in front of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }

    pub fn may_issue(&self, origin: TicketOrigin) -> bool {
        match self.role {
            Role::Client => origin == TicketOrigin::SelfService,
            Role::Promoter => origin.is_complimentary(),
            Role::Staff | Role::Admin => true,
        }
    }

    pub fn require_staff(&self, action: &str) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Only staff may {}", action)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_permissions() {
        let client = Caller::new(Uuid::new_v4(), Role::Client);
        let promoter = Caller::new(Uuid::new_v4(), Role::Promoter);
        let staff = Caller::new(Uuid::new_v4(), Role::Staff);

        assert!(client.may_issue(TicketOrigin::SelfService));
        assert!(!client.may_issue(TicketOrigin::Gift));
        assert!(promoter.may_issue(TicketOrigin::Invitation));
        assert!(!promoter.may_issue(TicketOrigin::ManualSale));
        assert!(staff.may_issue(TicketOrigin::ManualSale));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(" Staff ".parse::<Role>().unwrap(), Role::Staff);
        assert_eq!("guest".parse::<Role>().unwrap_err().code(), "AUTH_ERROR");
    }
}
