use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Server collections mirrored into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Categories,
    Products,
    Orders,
    Deals,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Categories,
        Collection::Products,
        Collection::Orders,
        Collection::Deals,
    ];

    pub fn store_name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Categories => "categories",
            Collection::Products => "products",
            Collection::Orders => "orders",
            Collection::Deals => "deal",
        }
    }

    /// Singular noun used in user-facing notices.
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Users => "staff",
            Collection::Categories => "category",
            Collection::Products => "product",
            Collection::Orders => "order",
            Collection::Deals => "deal",
        }
    }

    pub fn server_id_field(&self) -> &'static str {
        match self {
            Collection::Users => "_id",
            Collection::Categories => "categoryId",
            Collection::Products => "productId",
            Collection::Orders => "orderId",
            Collection::Deals => "dealId",
        }
    }

    /// Payload field naming the staff member that owns a record, for collections
    /// that unprivileged roles only see partially.
    pub fn owner_field(&self) -> Option<&'static str> {
        match self {
            Collection::Orders => Some("waiterId"),
            _ => None,
        }
    }

    pub fn offline_writable(&self) -> bool {
        matches!(self, Collection::Orders | Collection::Users)
    }

    /// Offline writes for these collections are replayed through the pending
    /// mutation queue rather than the coordinator's push phase.
    pub fn mutation_queue(&self) -> Option<&'static str> {
        match self {
            Collection::Users => Some(PENDING_STAFF_QUEUE),
            _ => None,
        }
    }

    pub fn uses_mutation_queue(&self) -> bool {
        self.mutation_queue().is_some()
    }
}

pub const PENDING_STAFF_QUEUE: &str = "pending_staff";

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.store_name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.store_name() == s)
            .ok_or_else(|| format!("Unknown collection: {s}"))
    }
}
