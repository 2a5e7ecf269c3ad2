use crate::domain::value_objects::Collection;
use serde_json::Value;

pub(super) const LOGIN: &str = "/login";
pub(super) const UPDATE_ORDER_STATUS: &str = "/updateOrderStatus";
pub(super) const FINANCE: &str = "/getFinance";

/// Staff are split server-side into two role families with separate routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StaffFamily {
    Manager,
    Waiter,
}

impl StaffFamily {
    pub(super) const ALL: [StaffFamily; 2] = [StaffFamily::Manager, StaffFamily::Waiter];

    pub(super) fn from_payload(payload: &Value) -> Self {
        match payload.get("role").and_then(Value::as_str) {
            Some(role) if role.eq_ignore_ascii_case("manager") => StaffFamily::Manager,
            _ => StaffFamily::Waiter,
        }
    }

    pub(super) fn role(&self) -> &'static str {
        match self {
            StaffFamily::Manager => "manager",
            StaffFamily::Waiter => "waiter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Routes {
    pub fetch: &'static str,
    pub create: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

pub(super) fn staff_routes(family: StaffFamily) -> Routes {
    match family {
        StaffFamily::Manager => Routes {
            fetch: "/allManager",
            create: "/addManager",
            update: "/updateManager",
            delete: "/deleteManager",
        },
        StaffFamily::Waiter => Routes {
            fetch: "/allWaiters",
            create: "/addWaiter",
            update: "/updateWaiter",
            delete: "/deleteWaiter",
        },
    }
}

/// Routes for `collection`; `payload` only matters for staff.
pub(super) fn routes(collection: Collection, payload: &Value) -> Routes {
    match collection {
        Collection::Users => staff_routes(StaffFamily::from_payload(payload)),
        Collection::Categories => Routes {
            fetch: "/getAllCategories",
            create: "/addCategory",
            update: "/updateCategory",
            delete: "/deleteCategory",
        },
        Collection::Products => Routes {
            fetch: "/getAllProducts",
            create: "/addProduct",
            update: "/updateProduct",
            delete: "/deleteProduct",
        },
        Collection::Orders => Routes {
            fetch: "/getAllOrders",
            create: "/addOrder",
            update: "/updateOrder",
            delete: "/deleteOrder",
        },
        Collection::Deals => Routes {
            fetch: "/deals",
            create: "/addDeal",
            update: "/updateDeal",
            delete: "/deleteDeal",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn staff_routes_follow_role() {
        let manager = routes(Collection::Users, &json!({"role": "Manager"}));
        assert_eq!(manager.create, "/addManager");
        let waiter = routes(Collection::Users, &json!({"role": "waiter"}));
        assert_eq!(waiter.update, "/updateWaiter");
        let unknown = routes(Collection::Users, &Value::Null);
        assert_eq!(unknown.delete, "/deleteWaiter");
    }

    #[test]
    fn catalog_routes_ignore_payload() {
        assert_eq!(
            routes(Collection::Deals, &json!({"role": "manager"})).fetch,
            "/deals"
        );
        assert_eq!(routes(Collection::Orders, &Value::Null).create, "/addOrder");
    }
}
