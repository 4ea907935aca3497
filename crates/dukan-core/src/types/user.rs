//! Users and their permission flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::permissions::{Permission, PermissionSet};
use crate::types::default_true;
use crate::update::FieldUpdate;
use crate::validation::{validate_amount, validate_password, validate_text, validate_username};
use crate::DEFAULT_ROLE;

// =============================================================================
// User
// =============================================================================

/// A till operator or back-office account.
///
/// Permissions are stored as one boolean column each. Use
/// [`permissions`](User::permissions) rather than reading the flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "camelCase"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    /// Login name, unique.
    pub username: String,

    /// Argon2 PHC string. Never serialized, so it never leaves the device
    /// through the sync queue.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password: String,

    /// Display name printed on bills.
    pub name: String,

    /// Free-text role label (`admin`, `cashier`, ...). Carries no
    /// permissions of its own.
    pub role: String,

    pub is_active: bool,

    pub can_create_bill: bool,
    pub can_edit_bill: bool,
    pub can_delete_bill: bool,
    pub can_void_bill: bool,
    pub can_apply_discount: bool,
    pub can_view_reports: bool,
    pub can_export_reports: bool,
    pub can_manage_products: bool,
    pub can_manage_categories: bool,
    pub can_manage_inventory: bool,
    pub can_view_cost_price: bool,
    pub can_manage_customers: bool,
    pub can_manage_users: bool,
    pub can_manage_settings: bool,
    pub can_manage_printers: bool,
    pub can_import_data: bool,

    /// Stored only; no discount limit is enforced from it.
    pub max_discount: f64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Reads one flag column.
    pub fn flag(&self, permission: Permission) -> bool {
        match permission {
            Permission::CreateBill => self.can_create_bill,
            Permission::EditBill => self.can_edit_bill,
            Permission::DeleteBill => self.can_delete_bill,
            Permission::VoidBill => self.can_void_bill,
            Permission::ApplyDiscount => self.can_apply_discount,
            Permission::ViewReports => self.can_view_reports,
            Permission::ExportReports => self.can_export_reports,
            Permission::ManageProducts => self.can_manage_products,
            Permission::ManageCategories => self.can_manage_categories,
            Permission::ManageInventory => self.can_manage_inventory,
            Permission::ViewCostPrice => self.can_view_cost_price,
            Permission::ManageCustomers => self.can_manage_customers,
            Permission::ManageUsers => self.can_manage_users,
            Permission::ManageSettings => self.can_manage_settings,
            Permission::ManagePrinters => self.can_manage_printers,
            Permission::ImportData => self.can_import_data,
        }
    }

    /// Writes one flag column.
    pub fn set_flag(&mut self, permission: Permission, granted: bool) {
        let flag = match permission {
            Permission::CreateBill => &mut self.can_create_bill,
            Permission::EditBill => &mut self.can_edit_bill,
            Permission::DeleteBill => &mut self.can_delete_bill,
            Permission::VoidBill => &mut self.can_void_bill,
            Permission::ApplyDiscount => &mut self.can_apply_discount,
            Permission::ViewReports => &mut self.can_view_reports,
            Permission::ExportReports => &mut self.can_export_reports,
            Permission::ManageProducts => &mut self.can_manage_products,
            Permission::ManageCategories => &mut self.can_manage_categories,
            Permission::ManageInventory => &mut self.can_manage_inventory,
            Permission::ViewCostPrice => &mut self.can_view_cost_price,
            Permission::ManageCustomers => &mut self.can_manage_customers,
            Permission::ManageUsers => &mut self.can_manage_users,
            Permission::ManageSettings => &mut self.can_manage_settings,
            Permission::ManagePrinters => &mut self.can_manage_printers,
            Permission::ImportData => &mut self.can_import_data,
        };
        *flag = granted;
    }

    /// Sets every flag from `permissions`; flags not in the set are cleared.
    pub fn set_permissions(&mut self, permissions: &PermissionSet) {
        for p in Permission::all() {
            self.set_flag(p, permissions.contains(p));
        }
    }

    /// The granted permissions as a set.
    pub fn permissions(&self) -> PermissionSet {
        Permission::all().filter(|p| self.flag(*p)).collect()
    }

    /// True when the user is active and holds `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_active && self.flag(permission)
    }

    /// Like [`has_permission`](Self::has_permission) but returns the reason
    /// on failure.
    pub fn require(&self, permission: Permission) -> CoreResult<()> {
        if !self.is_active {
            return Err(CoreError::InactiveUser(self.username.clone()));
        }
        if !self.flag(permission) {
            return Err(CoreError::PermissionDenied {
                username: self.username.clone(),
                permission: permission.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Inputs
// =============================================================================

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Input for creating a user. `password` is plain text and is hashed by the
/// repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub max_discount: f64,
}

impl NewUser {
    /// A cashier with no permissions.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        NewUser {
            username: username.into(),
            password: password.into(),
            name: name.into(),
            role: default_role(),
            is_active: true,
            permissions: PermissionSet::new(),
            max_discount: 0.0,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_text("name", &self.name, 100)?;
        validate_text("role", &self.role, 50)?;
        validate_amount("maxDiscount", self.max_discount)?;
        Ok(())
    }
}

/// Patch for a user. Passwords change through the repository's
/// `change_password`, never through a patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces all 16 flags when present.
    pub permissions: Option<PermissionSet>,
    pub max_discount: Option<FieldUpdate<f64>>,
}

impl UserUpdate {
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(name) = &self.name {
            validate_text("name", name, 100)?;
        }
        if let Some(role) = &self.role {
            validate_text("role", role, 50)?;
        }
        if let Some(update) = &self.max_discount {
            update.validate_non_negative("maxDiscount")?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: "u1".to_string(),
            username: "ravi".to_string(),
            password: "$argon2id$v=19$...".to_string(),
            name: "Ravi".to_string(),
            role: "cashier".to_string(),
            is_active: true,
            can_create_bill: true,
            can_edit_bill: false,
            can_delete_bill: false,
            can_void_bill: false,
            can_apply_discount: true,
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
            max_discount: 10.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_permissions_from_flags() {
        let u = user();
        let set = u.permissions();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Permission::CreateBill));
        assert!(set.contains(Permission::ApplyDiscount));
        assert!(u.has_permission(Permission::CreateBill));
        assert!(!u.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_set_permissions_replaces_all_flags() {
        let mut u = user();
        let set: PermissionSet = [Permission::ManageUsers].into_iter().collect();
        u.set_permissions(&set);
        assert_eq!(u.permissions(), set);
        assert!(!u.can_create_bill);
        assert!(u.can_manage_users);
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let mut u = user();
        u.is_active = false;
        assert!(!u.has_permission(Permission::CreateBill));
        assert!(matches!(
            u.require(Permission::CreateBill),
            Err(CoreError::InactiveUser(_))
        ));
    }

    #[test]
    fn test_require_reports_missing_permission() {
        let err = user().require(Permission::VoidBill).unwrap_err();
        assert_eq!(err.to_string(), "User ravi lacks permission void_bill");
    }

    #[test]
    fn test_password_is_not_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["canCreateBill"], true);
        assert_eq!(json["maxDiscount"], 10.0);
    }

    #[test]
    fn test_new_user_defaults() {
        let input: NewUser = serde_json::from_str(
            r#"{"username":"asha","password":"secret1","name":"Asha"}"#,
        )
        .unwrap();
        assert_eq!(input.role, "cashier");
        assert!(input.is_active);
        assert!(input.permissions.is_empty());
        assert!(input.validate().is_ok());

        let bad = NewUser::new("as", "secret1", "Asha");
        assert!(bad.validate().is_err());
    }
}
