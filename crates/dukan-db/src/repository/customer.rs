//! Customer repository.

use chrono::Utc;
use tracing::debug;

use dukan_core::validation::validate_search_query;
use dukan_core::{new_id, Customer, CustomerUpdate, NewCustomer, ValidationError};

use super::{Insertable, Patch, Repository};
use crate::error::DbResult;
use crate::query::{Assignment, Filter, FindMany, OrderBy};
use crate::schema::CustomerField;

impl Insertable for NewCustomer {
    type Row = Customer;

    fn validate(&self) -> Result<(), ValidationError> {
        NewCustomer::validate(self)
    }

    fn into_row(self) -> DbResult<Customer> {
        let now = Utc::now();
        Ok(Customer {
            id: new_id(),
            name: self.name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            gstin: self.gstin,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Patch for CustomerUpdate {
    type Row = Customer;

    fn validate(&self) -> Result<(), ValidationError> {
        CustomerUpdate::validate(self)
    }

    fn into_assignments(self) -> Vec<Assignment<CustomerField>> {
        let mut out = Vec::new();
        if let Some(name) = self.name {
            out.push(Assignment::set(CustomerField::Name, name));
        }
        if let Some(phone) = self.phone {
            out.push(Assignment::set(CustomerField::Phone, phone));
        }
        if let Some(email) = self.email {
            out.push(Assignment::set(CustomerField::Email, email));
        }
        if let Some(address) = self.address {
            out.push(Assignment::set(CustomerField::Address, address));
        }
        if let Some(gstin) = self.gstin {
            out.push(Assignment::set(CustomerField::Gstin, gstin));
        }
        out
    }
}

impl<'c> Repository<'c, Customer> {
    pub async fn get_by_phone(&mut self, phone: &str) -> DbResult<Option<Customer>> {
        self.find_first(FindMany::from(Filter::eq(CustomerField::Phone, phone.trim())))
            .await
    }

    /// Customers whose name or phone contains `query`, by name.
    pub async fn search(&mut self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        debug!(query = %query, limit, "Searching customers");

        let mut args = FindMany::new()
            .order_by(OrderBy::asc(CustomerField::Name))
            .take(limit);
        if !query.is_empty() {
            args = args.filter(
                Filter::contains(CustomerField::Name, query.as_str())
                    .or(Filter::contains(CustomerField::Phone, query.as_str())),
            );
        }
        self.find_many(args).await
    }
}

#[cfg(test)]
mod tests {
    use dukan_core::{CustomerUpdate, NewCustomer};

    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_phone_is_unique_but_optional() {
        let db = fixtures::db().await;
        db.customers()
            .create(NewCustomer::new("Meena").with_phone("9820012345"))
            .await
            .unwrap();
        db.customers().create(NewCustomer::new("Walk-in A")).await.unwrap();
        db.customers().create(NewCustomer::new("Walk-in B")).await.unwrap();

        let err = db
            .customers()
            .create(NewCustomer::new("Other").with_phone("9820012345"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unique constraint failed on phone");

        let found = db.customers().get_by_phone("9820012345").await.unwrap().unwrap();
        assert_eq!(found.name, "Meena");
    }

    #[tokio::test]
    async fn test_search_and_clear_phone() {
        let db = fixtures::db().await;
        let meena = db
            .customers()
            .create(NewCustomer::new("Meena Traders").with_phone("9820012345"))
            .await
            .unwrap();
        db.customers().create(NewCustomer::new("Arjun")).await.unwrap();

        assert_eq!(db.customers().search("meena", 10).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("98200", 10).await.unwrap().len(), 1);
        assert_eq!(db.customers().search("", 10).await.unwrap().len(), 2);

        let cleared = db
            .customers()
            .update(
                &meena.id,
                CustomerUpdate {
                    phone: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.phone, None);
    }
}
