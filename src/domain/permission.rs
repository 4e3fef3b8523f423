use {
    super::error::HistoryError,
    derive_more::Display,
    std::collections::{HashMap, HashSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Role {
    #[display("admin")]
    Admin,
    #[display("manager")]
    Manager,
    #[display("viewer")]
    Viewer,
    #[display("auditor")]
    Auditor,
}

impl TryFrom<&str> for Role {
    type Error = HistoryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "viewer" => Ok(Self::Viewer),
            "auditor" => Ok(Self::Auditor),
            other => Err(HistoryError::Forbidden(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Capability {
    #[display("create")]
    Create,
    #[display("read")]
    Read,
    #[display("update")]
    Update,
    #[display("delete")]
    Delete,
    #[display("history")]
    History,
}

/// Role → capability lookup. Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: HashMap<Role, HashSet<Capability>>,
}

impl PermissionTable {
    pub fn standard() -> Self {
        use Capability::*;

        let grants = HashMap::from([
            (Role::Admin, HashSet::from([Create, Read, Update, Delete, History])),
            (Role::Manager, HashSet::from([Create, Read, Update, History])),
            (Role::Viewer, HashSet::from([Read])),
            (Role::Auditor, HashSet::from([Read, History])),
        ]);
        Self { grants }
    }

    pub fn allows(&self, role: Role, capability: Capability) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|caps| caps.contains(&capability))
    }

    pub fn require(&self, role: Role, capability: Capability) -> Result<(), HistoryError> {
        if self.allows(role, capability) {
            Ok(())
        } else {
            Err(HistoryError::Forbidden(format!(
                "role {role} lacks the {capability} capability"
            )))
        }
    }

    /// Reverting history needs the top role, whatever `History` grants.
    pub fn require_revert(&self, role: Role) -> Result<(), HistoryError> {
        if role == Role::Admin {
            Ok(())
        } else {
            Err(HistoryError::Forbidden("only admins can revert changes".into()))
        }
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}
