//! # User Repository
//!
//! Accounts, password hashing and permission flags.
//!
//! ## Passwords
//! ```text
//! NewUser.password ("secret-1")
//!      │  argon2id, random salt
//!      ▼
//! User.password ("$argon2id$v=19$m=19456,t=2,p=1$...")
//!      │
//!      └── authenticate(username, "secret-1") → verify, active users only
//! ```
//! The hash is skipped when a `User` is serialized, so sync payloads never
//! carry it.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use tracing::{debug, info, warn};

use dukan_core::validation::validate_password;
use dukan_core::{new_id, NewUser, Permission, PermissionSet, User, UserUpdate, ValidationError};

use super::{Insertable, Patch, Repository};
use crate::error::{DbError, DbResult};
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::UserField;

/// Hashes a password for storage.
pub fn hash_password(plain: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

impl Insertable for NewUser {
    type Row = User;

    fn validate(&self) -> Result<(), ValidationError> {
        NewUser::validate(self)
    }

    fn into_row(self) -> DbResult<User> {
        let now = Utc::now();
        let mut user = User {
            id: new_id(),
            username: self.username,
            password: hash_password(&self.password)?,
            name: self.name,
            role: self.role,
            is_active: self.is_active,
            can_create_bill: false,
            can_edit_bill: false,
            can_delete_bill: false,
            can_void_bill: false,
            can_apply_discount: false,
            can_view_reports: false,
            can_export_reports: false,
            can_manage_products: false,
            can_manage_categories: false,
            can_manage_inventory: false,
            can_view_cost_price: false,
            can_manage_customers: false,
            can_manage_users: false,
            can_manage_settings: false,
            can_manage_printers: false,
            can_import_data: false,
            max_discount: self.max_discount,
            created_at: now,
            updated_at: now,
        };
        user.set_permissions(&self.permissions);
        Ok(user)
    }
}

/// One assignment per permission flag, set from `permissions`.
fn permission_assignments(permissions: &PermissionSet) -> Vec<Assignment<UserField>> {
    Permission::all()
        .map(|p| Assignment::set(UserField::for_permission(p), permissions.contains(p)))
        .collect()
}

impl Patch for UserUpdate {
    type Row = User;

    fn validate(&self) -> Result<(), ValidationError> {
        UserUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<UserField>> {
        let mut out = Vec::new();
        if let Some(username) = self.username {
            out.push(Assignment::set(UserField::Username, username));
        }
        if let Some(name) = self.name {
            out.push(Assignment::set(UserField::Name, name));
        }
        if let Some(role) = self.role {
            out.push(Assignment::set(UserField::Role, role));
        }
        if let Some(is_active) = self.is_active {
            out.push(Assignment::set(UserField::IsActive, is_active));
        }
        if let Some(permissions) = &self.permissions {
            out.extend(permission_assignments(permissions));
        }
        if let Some(update) = self.max_discount {
            out.push(Assignment::from_update(UserField::MaxDiscount, update));
        }
        out
    }
}

impl<'c> Repository<'c, User> {
    pub async fn get_by_username(&mut self, username: &str) -> DbResult<Option<User>> {
        self.find_first(FindMany::from(Filter::eq(UserField::Username, username)))
            .await
    }

    /// Returns the user when `username` is active and `password` matches.
    ///
    /// Unknown user, inactive user and wrong password all give `Ok(None)`.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> DbResult<Option<User>> {
        let Some(user) = self.get_by_username(username).await? else {
            debug!(username, "Login for unknown user");
            return Ok(None);
        };

        if !user.is_active {
            warn!(username, "Login attempt for inactive user");
            return Ok(None);
        }

        if !verify_password(password, &user.password) {
            warn!(username, "Login failed: wrong password");
            return Ok(None);
        }

        info!(username, "User authenticated");
        Ok(Some(user))
    }

    pub async fn change_password(&mut self, id: &str, new_password: &str) -> DbResult<User> {
        validate_password(new_password)?;
        let hash = hash_password(new_password)?;
        let user = self
            .update_fields(id, &[Assignment::set(UserField::Password, hash)])
            .await?;
        info!(username = %user.username, "Password changed");
        Ok(user)
    }

    /// Replaces all 16 flags.
    pub async fn set_permissions(&mut self, id: &str, permissions: &PermissionSet) -> DbResult<User> {
        debug!(id, permissions = %permissions, "Setting permissions");
        self.update_fields(id, &permission_assignments(permissions)).await
    }

    /// Adds or removes one permission, keeping the others.
    pub async fn set_permission(&mut self, id: &str, permission: Permission, granted: bool) -> DbResult<User> {
        self.update_fields(
            id,
            &[Assignment::set(UserField::for_permission(permission), granted)],
        )
        .await
    }

    pub async fn deactivate(&mut self, id: &str) -> DbResult<User> {
        info!(id, "Deactivating user");
        self.update_fields(id, &[Assignment::set(UserField::IsActive, false)])
            .await
    }

    pub async fn list(&mut self) -> DbResult<Vec<User>> {
        self.find_many(FindMany::new().order_by(OrderBy::asc(UserField::Username)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{FieldUpdate, NewUser, Permission, PermissionSet, UserUpdate};

    use crate::query::Filter;
    use crate::repository::fixtures;
    use crate::schema::SyncQueueField;

    #[tokio::test]
    async fn test_create_hashes_password_and_sets_flags() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;

        assert!(user.password.starts_with("$argon2"));
        assert_ne!(user.password, "secret-1");
        assert!(user.can_create_bill);
        assert!(!user.can_manage_users);
        assert_eq!(user.role, "cashier");
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;

        assert!(db.users().authenticate("ravi", "secret-1").await.unwrap().is_some());
        assert!(db.users().authenticate("ravi", "wrong").await.unwrap().is_none());
        assert!(db.users().authenticate("nobody", "secret-1").await.unwrap().is_none());

        db.users().deactivate(&user.id).await.unwrap();
        assert!(db.users().authenticate("ravi", "secret-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;

        assert!(db.users().change_password(&user.id, "123").await.is_err());
        db.users().change_password(&user.id, "new-secret").await.unwrap();
        assert!(db.users().authenticate("ravi", "secret-1").await.unwrap().is_none());
        assert!(db.users().authenticate("ravi", "new-secret").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_permission_updates() {
        let db = fixtures::db().await;
        let user = fixtures::cashier(&db).await;

        let set: PermissionSet = [Permission::ViewReports, Permission::ManageUsers]
            .into_iter()
            .collect();
        let updated = db.users().set_permissions(&user.id, &set).await.unwrap();
        assert_eq!(updated.permissions(), set);
        assert!(!updated.can_create_bill);

        let updated = db
            .users()
            .set_permission(&user.id, Permission::VoidBill, true)
            .await
            .unwrap();
        assert_eq!(updated.permissions().len(), 3);

        let updated = db
            .users()
            .update(
                &user.id,
                UserUpdate {
                    name: Some("Ravi K".to_string()),
                    max_discount: Some(FieldUpdate::Set(15.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ravi K");
        assert_eq!(updated.max_discount, 15.0);
        assert_eq!(updated.permissions().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = fixtures::db().await;
        fixtures::cashier(&db).await;
        let err = db
            .users()
            .create(NewUser::new("ravi", "secret-2", "Other Ravi"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unique constraint failed on username");
    }

    #[tokio::test]
    async fn test_captured_user_has_no_password() {
        let db = fixtures::db().await;
        fixtures::cashier(&db).await;

        let entries = db
            .sync_queue()
            .find_many(Filter::eq(SyncQueueField::Model, "User").into())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let payload = entries[0].payload().unwrap();
        assert!(payload.get("password").is_none());
        assert_eq!(payload["username"], "ravi");
    }
}
