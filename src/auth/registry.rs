//! Account registry
//!
//! Bounded table of accounts provisioned at startup. Account ids start at 1;
//! a session without an account carries `None` instead of id 0.

use super::rights::AccessRights;
use crate::error::AuthError;
use log::info;

/// Identifier of a registered account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(usize);

impl AccountId {
    fn index(self) -> usize {
        self.0 - 1
    }
}

/// A provisioned FTP account.
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    password: String,
    root: String,
    pub rights: AccessRights,
}

impl Account {
    /// Virtual root every path of this account is confined to.
    pub fn root(&self) -> &str {
        &self.root
    }
}

/// Limits applied when accounts are created.
#[derive(Debug, Clone, Copy)]
pub struct AccountLimits {
    pub max_accounts: usize,
    pub max_username_length: usize,
    pub max_password_length: usize,
    pub max_path_length: usize,
}

pub struct AccountRegistry {
    accounts: Vec<Account>,
    limits: AccountLimits,
}

impl AccountRegistry {
    pub fn new(limits: AccountLimits) -> Self {
        Self {
            accounts: Vec::with_capacity(limits.max_accounts),
            limits,
        }
    }

    /// Creates an account, replacing any existing account with the same name.
    pub fn create_account(
        &mut self,
        name: &str,
        password: &str,
        root: &str,
        rights: AccessRights,
    ) -> Result<AccountId, AuthError> {
        if name.is_empty() {
            return Err(AuthError::EmptyName);
        }
        if name.len() > self.limits.max_username_length {
            return Err(AuthError::NameTooLong(self.limits.max_username_length));
        }
        if password.len() > self.limits.max_password_length {
            return Err(AuthError::PasswordTooLong(
                name.to_string(),
                self.limits.max_password_length,
            ));
        }
        if root.len() > self.limits.max_path_length {
            return Err(AuthError::RootTooLong(
                name.to_string(),
                self.limits.max_path_length,
            ));
        }

        let account = Account {
            name: name.to_string(),
            password: password.to_string(),
            root: root.to_string(),
            rights,
        };

        if let Some(id) = self.find_account(name) {
            self.accounts[id.index()] = account;
            info!("Replaced account {name}");
            return Ok(id);
        }

        if self.accounts.len() >= self.limits.max_accounts {
            return Err(AuthError::RegistryFull(self.limits.max_accounts));
        }

        self.accounts.push(account);
        info!("Created account {name}");
        Ok(AccountId(self.accounts.len()))
    }

    pub fn find_account(&self, name: &str) -> Option<AccountId> {
        self.accounts
            .iter()
            .position(|account| account.name == name)
            .map(|index| AccountId(index + 1))
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(id.index())
    }

    /// An empty stored password accepts any password.
    pub fn check_password(&self, id: AccountId, password: &str) -> bool {
        self.get(id)
            .is_some_and(|account| account.password.is_empty() || account.password == password)
    }

    pub fn check_rights(&self, id: AccountId, needed: AccessRights) -> bool {
        self.get(id)
            .is_some_and(|account| account.rights.contains(needed))
    }

    pub fn root(&self, id: AccountId) -> Option<&str> {
        self.get(id).map(Account::root)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
