//! User aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{EvmAddress, UserId};
use crate::error::IdentityError;

/// What a user is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits claims and receives settlements
    Claimant,
    /// Reviews and settles claims
    Insurer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Claimant => "claimant",
            Role::Insurer => "insurer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claimant" => Ok(Role::Claimant),
            "insurer" => Ok(Role::Insurer),
            other => Err(IdentityError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// How a wallet gets attached to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletLink {
    /// An address the user controls
    External(EvmAddress),
    /// A wallet provisioned at the custodial provider
    Custodial { wallet_id: String, address: EvmAddress },
}

impl WalletLink {
    pub fn address(&self) -> &EvmAddress {
        match self {
            WalletLink::External(address) => address,
            WalletLink::Custodial { address, .. } => address,
        }
    }

    pub fn wallet_id(&self) -> Option<&str> {
        match self {
            WalletLink::External(_) => None,
            WalletLink::Custodial { wallet_id, .. } => Some(wallet_id),
        }
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lowercased login email
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub wallet_address: Option<EvmAddress>,
    /// Custodial provider wallet id, when the wallet was provisioned for the user
    pub wallet_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn register(email: &str, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new_v7(),
            email: normalize_email(email),
            password_hash,
            role,
            wallet_address: None,
            wallet_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet_address.is_some()
    }

    /// Attaches a wallet; a user can be linked once
    pub fn link_wallet(&mut self, link: &WalletLink) -> Result<(), IdentityError> {
        if self.has_wallet() {
            return Err(IdentityError::WalletAlreadyLinked);
        }
        self.wallet_address = Some(link.address().clone());
        self.wallet_id = link.wallet_id().map(str::to_string);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Emails compare case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> EvmAddress {
        EvmAddress::parse("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[test]
    fn test_register_normalizes_email() {
        let user = User::register("  Alice@Example.COM ", "hash".to_string(), Role::Claimant);
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.has_wallet());
    }

    #[test]
    fn test_wallet_links_once() {
        let mut user = User::register("a@b.io", "hash".to_string(), Role::Claimant);
        user.link_wallet(&WalletLink::Custodial {
            wallet_id: "w-1".to_string(),
            address: address(),
        })
        .unwrap();
        assert_eq!(user.wallet_id.as_deref(), Some("w-1"));

        let again = user.link_wallet(&WalletLink::External(address()));
        assert!(matches!(again, Err(IdentityError::WalletAlreadyLinked)));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Insurer".parse::<Role>().unwrap(), Role::Insurer);
        assert!("admin".parse::<Role>().is_err());
    }
}
