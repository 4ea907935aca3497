//! # Permissions
//!
//! The `User` table stores one boolean column per permission
//! (`canCreateBill`, `canManageUsers`, ...). Code never touches those columns
//! by name; it goes through [`Permission`] and [`PermissionSet`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User row (storage)                 API                                 │
//! │  ─────────────────────              ────────────────────────────────    │
//! │  canCreateBill      = 1    ──►      PermissionSet {                     │
//! │  canViewReports     = 1    ──►          CreateBill,                     │
//! │  canManageUsers     = 0                 ViewReports,                    │
//! │  ... (16 columns)                   }                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Permission
// =============================================================================

/// A single capability that can be granted to a user.
///
/// Displayed and parsed in snake_case (`manage_products`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    CreateBill,
    EditBill,
    DeleteBill,
    VoidBill,
    ApplyDiscount,
    ViewReports,
    ExportReports,
    ManageProducts,
    ManageCategories,
    ManageInventory,
    ViewCostPrice,
    ManageCustomers,
    ManageUsers,
    ManageSettings,
    ManagePrinters,
    ImportData,
}

impl Permission {
    /// The `User` column that stores this permission.
    pub const fn column(&self) -> &'static str {
        match self {
            Permission::CreateBill => "canCreateBill",
            Permission::EditBill => "canEditBill",
            Permission::DeleteBill => "canDeleteBill",
            Permission::VoidBill => "canVoidBill",
            Permission::ApplyDiscount => "canApplyDiscount",
            Permission::ViewReports => "canViewReports",
            Permission::ExportReports => "canExportReports",
            Permission::ManageProducts => "canManageProducts",
            Permission::ManageCategories => "canManageCategories",
            Permission::ManageInventory => "canManageInventory",
            Permission::ViewCostPrice => "canViewCostPrice",
            Permission::ManageCustomers => "canManageCustomers",
            Permission::ManageUsers => "canManageUsers",
            Permission::ManageSettings => "canManageSettings",
            Permission::ManagePrinters => "canManagePrinters",
            Permission::ImportData => "canImportData",
        }
    }

    /// Parses a permission name, accepting either `manage_users` or the
    /// column name `canManageUsers`.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        let name = name.trim();
        if let Ok(p) = Permission::from_str(name) {
            return Ok(p);
        }
        Permission::iter()
            .find(|p| p.column().eq_ignore_ascii_case(name))
            .ok_or_else(|| CoreError::UnknownPermission(name.to_string()))
    }

    /// All permissions in declaration order.
    pub fn all() -> impl Iterator<Item = Permission> {
        Permission::iter()
    }
}

// =============================================================================
// Permission Set
// =============================================================================

/// An ordered set of permissions.
///
/// Serializes as a list of snake_case names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// The empty set.
    pub fn new() -> Self {
        PermissionSet(BTreeSet::new())
    }

    /// Every permission.
    pub fn full() -> Self {
        Permission::all().collect()
    }

    /// Parses a comma separated list (`"create_bill, view_reports"`).
    pub fn parse_list(list: &str) -> Result<Self, CoreError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Permission::parse)
            .collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn remove(&mut self, permission: Permission) -> bool {
        self.0.remove(&permission)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Column name / flag value pairs for all 16 columns.
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        Permission::all().map(move |p| (p.column(), self.contains(p)))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        PermissionSet(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.iter().map(|p| p.into()).collect();
        write!(f, "{}", names.join(","))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
