use std::collections::HashMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::commands::CommandError;

pub const DEFAULT_USER: &str = "default";

/// One ACL user. Passwords are stored as lowercase hex SHA-256 digests, the
/// way Redis keeps them.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub flags: Vec<String>,
    pub passwords: Vec<String>,
}

impl User {
    fn default_user() -> Self {
        Self {
            username: DEFAULT_USER.to_string(),
            flags: vec!["on".to_string(), "nopass".to_string()],
            passwords: Vec::new(),
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|candidate| candidate == flag)
    }
}

/// User table backing AUTH and the ACL subcommands. Reads dominate, so a
/// plain RwLock map is enough; no await happens under the lock.
#[derive(Debug)]
pub struct AclStore {
    users: RwLock<HashMap<String, User>>,
}

impl Default for AclStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AclStore {
    /// Starts with the `default` user enabled and passwordless.
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(DEFAULT_USER.to_string(), User::default_user());

        Self {
            users: RwLock::new(users),
        }
    }

    /// Verifies a username/password pair. Unknown users and wrong passwords
    /// both collapse into the same WRONGPASS reply.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), CommandError> {
        let users = self.users.read().unwrap();
        let Some(user) = users.get(username) else {
            return Err(CommandError::WrongPass);
        };

        if user.has_flag("nopass") {
            return Ok(());
        }

        let hash = hash_password(password);
        if user.passwords.contains(&hash) {
            Ok(())
        } else {
            Err(CommandError::WrongPass)
        }
    }

    pub fn get_user(&self, username: &str) -> Option<User> {
        self.users.read().unwrap().get(username).cloned()
    }

    /// Appends a password hash to the user, dropping the nopass flag.
    pub fn set_user_password(&self, username: &str, password: &str) -> Result<(), CommandError> {
        let mut users = self.users.write().unwrap();
        let Some(user) = users.get_mut(username) else {
            return Err(CommandError::UserNotFound);
        };

        user.passwords.push(hash_password(password));
        user.flags.retain(|flag| flag != "nopass");

        Ok(())
    }
}

fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_authenticates_without_password() {
        let acl = AclStore::new();

        assert_eq!(acl.authenticate(DEFAULT_USER, "anything"), Ok(()));
        assert_eq!(
            acl.authenticate("nobody", "pass"),
            Err(CommandError::WrongPass)
        );
    }

    #[test]
    fn test_set_password_disables_nopass() {
        let acl = AclStore::new();

        acl.set_user_password(DEFAULT_USER, "s3cret").unwrap();

        assert_eq!(acl.authenticate(DEFAULT_USER, "s3cret"), Ok(()));
        assert_eq!(
            acl.authenticate(DEFAULT_USER, "wrong"),
            Err(CommandError::WrongPass)
        );

        let user = acl.get_user(DEFAULT_USER).unwrap();
        assert!(!user.flags.contains(&"nopass".to_string()));
        assert_eq!(user.passwords.len(), 1);
    }

    #[test]
    fn test_set_password_for_unknown_user() {
        let acl = AclStore::new();

        assert_eq!(
            acl.set_user_password("ghost", "pass"),
            Err(CommandError::UserNotFound)
        );
    }

    #[test]
    fn test_password_hash_is_sha256_hex() {
        // sha256("password")
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }
}
