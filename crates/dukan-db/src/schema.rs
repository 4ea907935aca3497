//! # Schema
//!
//! Binds each `dukan-core` model to its table: name, column enum and the
//! values written on insert.
//!
//! ```text
//! ┌──────────────────┬───────────────────────┬────────────────────────────┐
//! │ Model            │ Table                 │ Column enum                │
//! ├──────────────────┼───────────────────────┼────────────────────────────┤
//! │ User             │ "User"                │ UserField                  │
//! │ Category         │ "Category"            │ CategoryField              │
//! │ Product          │ "Product"             │ ProductField               │
//! │ ProductVariant   │ "ProductVariant"      │ ProductVariantField        │
//! │ Customer         │ "Customer"            │ CustomerField              │
//! │ Sale             │ "Sale"                │ SaleField                  │
//! │ SaleItem         │ "SaleItem"            │ SaleItemField              │
//! │ AuditLog         │ "AuditLog"            │ AuditLogField              │
//! │ InventoryMovement│ "InventoryMovement"   │ InventoryMovementField     │
//! │ Setting          │ "Setting"             │ SettingField               │
//! │ PrinterConfig    │ "PrinterConfig"       │ PrinterConfigField         │
//! │ SyncQueueEntry   │ "SyncQueue"           │ SyncQueueField             │
//! └──────────────────┴───────────────────────┴────────────────────────────┘
//! ```

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use dukan_core::{
    AuditLog, Category, Customer, InventoryMovement, Permission, PrinterConfig, Product,
    ProductVariant, Sale, SaleItem, Setting, SyncQueueEntry, User,
};

use crate::query::{columns, Column, Value};

/// A model stored in its own table.
pub trait Table: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Sync + Unpin + 'static {
    /// Table name as stored.
    const NAME: &'static str;

    /// Bumped to `now` on every update, when the table has one.
    const UPDATED_AT: Option<&'static str> = Some("updatedAt");

    /// Whether writes are recorded in the sync queue.
    const CAPTURED: bool = true;

    type Field: Column;

    /// The primary key column.
    fn id_field() -> Self::Field;

    fn id(&self) -> &str;

    /// Every column with its value, in table order.
    fn values(&self) -> Vec<(Self::Field, Value)>;
}

// =============================================================================
// User
// =============================================================================

columns! {
    pub enum UserField {
        Id => ("id", Text),
        Username => ("username", Text),
        Password => ("password", Text),
        Name => ("name", Text),
        Role => ("role", Text),
        IsActive => ("isActive", Bool),
        CanCreateBill => ("canCreateBill", Bool),
        CanEditBill => ("canEditBill", Bool),
        CanDeleteBill => ("canDeleteBill", Bool),
        CanVoidBill => ("canVoidBill", Bool),
        CanApplyDiscount => ("canApplyDiscount", Bool),
        CanViewReports => ("canViewReports", Bool),
        CanExportReports => ("canExportReports", Bool),
        CanManageProducts => ("canManageProducts", Bool),
        CanManageCategories => ("canManageCategories", Bool),
        CanManageInventory => ("canManageInventory", Bool),
        CanViewCostPrice => ("canViewCostPrice", Bool),
        CanManageCustomers => ("canManageCustomers", Bool),
        CanManageUsers => ("canManageUsers", Bool),
        CanManageSettings => ("canManageSettings", Bool),
        CanManagePrinters => ("canManagePrinters", Bool),
        CanImportData => ("canImportData", Bool),
        MaxDiscount => ("maxDiscount", Float),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl UserField {
    /// The flag column holding `permission`.
    pub fn for_permission(permission: Permission) -> Self {
        match permission {
            Permission::CreateBill => UserField::CanCreateBill,
            Permission::EditBill => UserField::CanEditBill,
            Permission::DeleteBill => UserField::CanDeleteBill,
            Permission::VoidBill => UserField::CanVoidBill,
            Permission::ApplyDiscount => UserField::CanApplyDiscount,
            Permission::ViewReports => UserField::CanViewReports,
            Permission::ExportReports => UserField::CanExportReports,
            Permission::ManageProducts => UserField::CanManageProducts,
            Permission::ManageCategories => UserField::CanManageCategories,
            Permission::ManageInventory => UserField::CanManageInventory,
            Permission::ViewCostPrice => UserField::CanViewCostPrice,
            Permission::ManageCustomers => UserField::CanManageCustomers,
            Permission::ManageUsers => UserField::CanManageUsers,
            Permission::ManageSettings => UserField::CanManageSettings,
            Permission::ManagePrinters => UserField::CanManagePrinters,
            Permission::ImportData => UserField::CanImportData,
        }
    }
}

impl Table for User {
    const NAME: &'static str = "User";
    type Field = UserField;

    fn id_field() -> UserField {
        UserField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(UserField, Value)> {
        let mut values = vec![
            (UserField::Id, self.id.as_str().into()),
            (UserField::Username, self.username.as_str().into()),
            (UserField::Password, self.password.as_str().into()),
            (UserField::Name, self.name.as_str().into()),
            (UserField::Role, self.role.as_str().into()),
            (UserField::IsActive, self.is_active.into()),
        ];
        values.extend(
            Permission::all().map(|p| (UserField::for_permission(p), self.flag(p).into())),
        );
        values.extend([
            (UserField::MaxDiscount, self.max_discount.into()),
            (UserField::CreatedAt, self.created_at.into()),
            (UserField::UpdatedAt, self.updated_at.into()),
        ]);
        values
    }
}

// =============================================================================
// Category
// =============================================================================

columns! {
    pub enum CategoryField {
        Id => ("id", Text),
        Name => ("name", Text),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for Category {
    const NAME: &'static str = "Category";
    type Field = CategoryField;

    fn id_field() -> CategoryField {
        CategoryField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(CategoryField, Value)> {
        vec![
            (CategoryField::Id, self.id.as_str().into()),
            (CategoryField::Name, self.name.as_str().into()),
            (CategoryField::CreatedAt, self.created_at.into()),
            (CategoryField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Product
// =============================================================================

columns! {
    pub enum ProductField {
        Id => ("id", Text),
        Name => ("name", Text),
        Description => ("description", Text),
        CategoryId => ("categoryId", Text),
        Hsn => ("hsn", Text),
        TaxRate => ("taxRate", Float),
        IsActive => ("isActive", Bool),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for Product {
    const NAME: &'static str = "Product";
    type Field = ProductField;

    fn id_field() -> ProductField {
        ProductField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(ProductField, Value)> {
        vec![
            (ProductField::Id, self.id.as_str().into()),
            (ProductField::Name, self.name.as_str().into()),
            (ProductField::Description, self.description.clone().into()),
            (ProductField::CategoryId, self.category_id.as_str().into()),
            (ProductField::Hsn, self.hsn.clone().into()),
            (ProductField::TaxRate, self.tax_rate.into()),
            (ProductField::IsActive, self.is_active.into()),
            (ProductField::CreatedAt, self.created_at.into()),
            (ProductField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Product Variant
// =============================================================================

columns! {
    pub enum ProductVariantField {
        Id => ("id", Text),
        ProductId => ("productId", Text),
        Sku => ("sku", Text),
        Barcode => ("barcode", Text),
        Size => ("size", Text),
        Color => ("color", Text),
        Mrp => ("mrp", Float),
        SellingPrice => ("sellingPrice", Float),
        CostPrice => ("costPrice", Float),
        Stock => ("stock", Int),
        MinStock => ("minStock", Int),
        IsActive => ("isActive", Bool),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for ProductVariant {
    const NAME: &'static str = "ProductVariant";
    type Field = ProductVariantField;

    fn id_field() -> ProductVariantField {
        ProductVariantField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(ProductVariantField, Value)> {
        vec![
            (ProductVariantField::Id, self.id.as_str().into()),
            (ProductVariantField::ProductId, self.product_id.as_str().into()),
            (ProductVariantField::Sku, self.sku.as_str().into()),
            (ProductVariantField::Barcode, self.barcode.as_str().into()),
            (ProductVariantField::Size, self.size.clone().into()),
            (ProductVariantField::Color, self.color.clone().into()),
            (ProductVariantField::Mrp, self.mrp.into()),
            (ProductVariantField::SellingPrice, self.selling_price.into()),
            (ProductVariantField::CostPrice, self.cost_price.into()),
            (ProductVariantField::Stock, self.stock.into()),
            (ProductVariantField::MinStock, self.min_stock.into()),
            (ProductVariantField::IsActive, self.is_active.into()),
            (ProductVariantField::CreatedAt, self.created_at.into()),
            (ProductVariantField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Customer
// =============================================================================

columns! {
    pub enum CustomerField {
        Id => ("id", Text),
        Name => ("name", Text),
        Phone => ("phone", Text),
        Email => ("email", Text),
        Address => ("address", Text),
        Gstin => ("gstin", Text),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for Customer {
    const NAME: &'static str = "Customer";
    type Field = CustomerField;

    fn id_field() -> CustomerField {
        CustomerField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(CustomerField, Value)> {
        vec![
            (CustomerField::Id, self.id.as_str().into()),
            (CustomerField::Name, self.name.as_str().into()),
            (CustomerField::Phone, self.phone.clone().into()),
            (CustomerField::Email, self.email.clone().into()),
            (CustomerField::Address, self.address.clone().into()),
            (CustomerField::Gstin, self.gstin.clone().into()),
            (CustomerField::CreatedAt, self.created_at.into()),
            (CustomerField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Sale
// =============================================================================

columns! {
    pub enum SaleField {
        Id => ("id", Text),
        BillNo => ("billNo", Int),
        UserId => ("userId", Text),
        CustomerName => ("customerName", Text),
        CustomerPhone => ("customerPhone", Text),
        Subtotal => ("subtotal", Float),
        Discount => ("discount", Float),
        DiscountPercent => ("discountPercent", Float),
        TaxAmount => ("taxAmount", Float),
        Cgst => ("cgst", Float),
        Sgst => ("sgst", Float),
        GrandTotal => ("grandTotal", Float),
        PaymentMethod => ("paymentMethod", Text),
        PaidAmount => ("paidAmount", Float),
        ChangeAmount => ("changeAmount", Float),
        Status => ("status", Text),
        Remarks => ("remarks", Text),
        IsHistorical => ("isHistorical", Bool),
        ImportedFrom => ("importedFrom", Text),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for Sale {
    const NAME: &'static str = "Sale";
    type Field = SaleField;

    fn id_field() -> SaleField {
        SaleField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(SaleField, Value)> {
        vec![
            (SaleField::Id, self.id.as_str().into()),
            (SaleField::BillNo, self.bill_no.into()),
            (SaleField::UserId, self.user_id.as_str().into()),
            (SaleField::CustomerName, self.customer_name.clone().into()),
            (SaleField::CustomerPhone, self.customer_phone.clone().into()),
            (SaleField::Subtotal, self.subtotal.into()),
            (SaleField::Discount, self.discount.into()),
            (SaleField::DiscountPercent, self.discount_percent.into()),
            (SaleField::TaxAmount, self.tax_amount.into()),
            (SaleField::Cgst, self.cgst.into()),
            (SaleField::Sgst, self.sgst.into()),
            (SaleField::GrandTotal, self.grand_total.into()),
            (SaleField::PaymentMethod, self.payment_method.as_str().into()),
            (SaleField::PaidAmount, self.paid_amount.into()),
            (SaleField::ChangeAmount, self.change_amount.into()),
            (SaleField::Status, self.status.as_str().into()),
            (SaleField::Remarks, self.remarks.clone().into()),
            (SaleField::IsHistorical, self.is_historical.into()),
            (SaleField::ImportedFrom, self.imported_from.clone().into()),
            (SaleField::CreatedAt, self.created_at.into()),
            (SaleField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Sale Item
// =============================================================================

columns! {
    pub enum SaleItemField {
        Id => ("id", Text),
        SaleId => ("saleId", Text),
        VariantId => ("variantId", Text),
        ProductName => ("productName", Text),
        VariantInfo => ("variantInfo", Text),
        Quantity => ("quantity", Int),
        Mrp => ("mrp", Float),
        SellingPrice => ("sellingPrice", Float),
        Discount => ("discount", Float),
        TaxRate => ("taxRate", Float),
        TaxAmount => ("taxAmount", Float),
        Total => ("total", Float),
        CreatedAt => ("createdAt", DateTime),
    }
}

impl Table for SaleItem {
    const NAME: &'static str = "SaleItem";
    const UPDATED_AT: Option<&'static str> = None;
    type Field = SaleItemField;

    fn id_field() -> SaleItemField {
        SaleItemField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(SaleItemField, Value)> {
        vec![
            (SaleItemField::Id, self.id.as_str().into()),
            (SaleItemField::SaleId, self.sale_id.as_str().into()),
            (SaleItemField::VariantId, self.variant_id.as_str().into()),
            (SaleItemField::ProductName, self.product_name.as_str().into()),
            (SaleItemField::VariantInfo, self.variant_info.clone().into()),
            (SaleItemField::Quantity, self.quantity.into()),
            (SaleItemField::Mrp, self.mrp.into()),
            (SaleItemField::SellingPrice, self.selling_price.into()),
            (SaleItemField::Discount, self.discount.into()),
            (SaleItemField::TaxRate, self.tax_rate.into()),
            (SaleItemField::TaxAmount, self.tax_amount.into()),
            (SaleItemField::Total, self.total.into()),
            (SaleItemField::CreatedAt, self.created_at.into()),
        ]
    }
}

// =============================================================================
// Audit Log
// =============================================================================

columns! {
    pub enum AuditLogField {
        Id => ("id", Text),
        Action => ("action", Text),
        Details => ("details", Text),
        UserId => ("userId", Text),
        CreatedAt => ("createdAt", DateTime),
    }
}

impl Table for AuditLog {
    const NAME: &'static str = "AuditLog";
    const UPDATED_AT: Option<&'static str> = None;
    type Field = AuditLogField;

    fn id_field() -> AuditLogField {
        AuditLogField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(AuditLogField, Value)> {
        vec![
            (AuditLogField::Id, self.id.as_str().into()),
            (AuditLogField::Action, self.action.as_str().into()),
            (AuditLogField::Details, self.details.as_str().into()),
            (AuditLogField::UserId, self.user_id.clone().into()),
            (AuditLogField::CreatedAt, self.created_at.into()),
        ]
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

columns! {
    pub enum InventoryMovementField {
        Id => ("id", Text),
        VariantId => ("variantId", Text),
        Type => ("type", Text),
        Quantity => ("quantity", Int),
        Reason => ("reason", Text),
        Reference => ("reference", Text),
        CreatedBy => ("createdBy", Text),
        CreatedAt => ("createdAt", DateTime),
    }
}

impl Table for InventoryMovement {
    const NAME: &'static str = "InventoryMovement";
    const UPDATED_AT: Option<&'static str> = None;
    type Field = InventoryMovementField;

    fn id_field() -> InventoryMovementField {
        InventoryMovementField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(InventoryMovementField, Value)> {
        vec![
            (InventoryMovementField::Id, self.id.as_str().into()),
            (InventoryMovementField::VariantId, self.variant_id.as_str().into()),
            (InventoryMovementField::Type, self.movement_type.as_str().into()),
            (InventoryMovementField::Quantity, self.quantity.into()),
            (InventoryMovementField::Reason, self.reason.clone().into()),
            (InventoryMovementField::Reference, self.reference.clone().into()),
            (InventoryMovementField::CreatedBy, self.created_by.as_str().into()),
            (InventoryMovementField::CreatedAt, self.created_at.into()),
        ]
    }
}

// =============================================================================
// Setting
// =============================================================================

columns! {
    pub enum SettingField {
        Id => ("id", Text),
        Key => ("key", Text),
        Value => ("value", Text),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for Setting {
    const NAME: &'static str = "Setting";
    type Field = SettingField;

    fn id_field() -> SettingField {
        SettingField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(SettingField, Value)> {
        vec![
            (SettingField::Id, self.id.as_str().into()),
            (SettingField::Key, self.key.as_str().into()),
            (SettingField::Value, self.value.as_str().into()),
            (SettingField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Printer Config
// =============================================================================

columns! {
    pub enum PrinterConfigField {
        Id => ("id", Text),
        Type => ("type", Text),
        PrinterName => ("printerName", Text),
        Port => ("port", Text),
        Width => ("width", Int),
        Settings => ("settings", Text),
        IsActive => ("isActive", Bool),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for PrinterConfig {
    const NAME: &'static str = "PrinterConfig";
    type Field = PrinterConfigField;

    fn id_field() -> PrinterConfigField {
        PrinterConfigField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(PrinterConfigField, Value)> {
        vec![
            (PrinterConfigField::Id, self.id.as_str().into()),
            (PrinterConfigField::Type, self.printer_type.as_str().into()),
            (PrinterConfigField::PrinterName, self.printer_name.as_str().into()),
            (PrinterConfigField::Port, self.port.clone().into()),
            (PrinterConfigField::Width, self.width.into()),
            (PrinterConfigField::Settings, self.settings.clone().into()),
            (PrinterConfigField::IsActive, self.is_active.into()),
            (PrinterConfigField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

// =============================================================================
// Sync Queue
// =============================================================================

columns! {
    pub enum SyncQueueField {
        Id => ("id", Text),
        Action => ("action", Text),
        Model => ("model", Text),
        Data => ("data", Text),
        Status => ("status", Text),
        RetryCount => ("retryCount", Int),
        Error => ("error", Text),
        CreatedAt => ("createdAt", DateTime),
        UpdatedAt => ("updatedAt", DateTime),
    }
}

impl Table for SyncQueueEntry {
    const NAME: &'static str = "SyncQueue";
    const CAPTURED: bool = false;
    type Field = SyncQueueField;

    fn id_field() -> SyncQueueField {
        SyncQueueField::Id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn values(&self) -> Vec<(SyncQueueField, Value)> {
        vec![
            (SyncQueueField::Id, self.id.as_str().into()),
            (SyncQueueField::Action, self.action.into()),
            (SyncQueueField::Model, self.model.as_str().into()),
            (SyncQueueField::Data, self.data.as_str().into()),
            (SyncQueueField::Status, self.status.into()),
            (SyncQueueField::RetryCount, self.retry_count.into()),
            (SyncQueueField::Error, self.error.clone().into()),
            (SyncQueueField::CreatedAt, self.created_at.into()),
            (SyncQueueField::UpdatedAt, self.updated_at.into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<F: Column>() -> Vec<&'static str> {
        F::all().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn test_user_has_sixteen_flag_columns() {
        let flags = names::<UserField>()
            .into_iter()
            .filter(|n| n.starts_with("can"))
            .count();
        assert_eq!(flags, 16);
        for p in Permission::all() {
            assert_eq!(UserField::for_permission(p).name(), p.column());
        }
    }

    #[test]
    fn test_type_columns_keep_stored_name() {
        assert_eq!(InventoryMovementField::Type.name(), "type");
        assert_eq!(PrinterConfigField::parse("type"), Some(PrinterConfigField::Type));
    }

    #[test]
    fn test_sync_queue_is_not_captured() {
        assert!(!<SyncQueueEntry as Table>::CAPTURED);
        assert!(<Sale as Table>::CAPTURED);
        assert_eq!(<SaleItem as Table>::UPDATED_AT, None);
    }
}
