//! Role-gated navigation.
//!
//! The sidebar is a fixed, ordered list of entries, each naming the roles
//! allowed to see it. What a session sees is recomputed from the live
//! session store on every call; nothing is cached.

pub mod router;
pub mod routes;

pub use router::{Navigator, Router};
pub use routes::Screen;

use crate::auth::store::SessionStore;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_DELIVERY: &str = "delivery";

const EVERYONE: &[&str] = &[ROLE_ADMIN, ROLE_CUSTOMER, ROLE_DELIVERY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub label: &'static str,
    pub href: &'static str,
    /// Holding any one of these roles makes the entry visible.
    pub roles: &'static [&'static str],
}

pub const SIDEBAR: &[NavEntry] = &[
    NavEntry {
        label: "Dashboard",
        href: routes::DASHBOARD,
        roles: EVERYONE,
    },
    NavEntry {
        label: "Orders",
        href: routes::ORDERS,
        roles: EVERYONE,
    },
    NavEntry {
        label: "Chat",
        href: routes::CHAT,
        roles: EVERYONE,
    },
    NavEntry {
        label: "Admin Menu",
        href: routes::MAINTENANCE,
        roles: &[ROLE_ADMIN],
    },
    NavEntry {
        label: "Settings",
        href: routes::SETTINGS,
        roles: EVERYONE,
    },
];

/// Entries of the maintenance (admin) menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuLink {
    pub label: &'static str,
    pub href: &'static str,
    pub description: &'static str,
}

pub const MAINTENANCE_MENU: &[MenuLink] = &[
    MenuLink {
        label: "Users",
        href: routes::ADMIN_USERS,
        description: "Manage system users and their roles",
    },
    MenuLink {
        label: "Condominiums",
        href: routes::ADMIN_CONDOMINIUMS,
        description: "Manage residential complexes and their configurations",
    },
    MenuLink {
        label: "Delivery Windows",
        href: routes::ADMIN_DELIVERY_WINDOWS,
        description: "Configure delivery schedules and time slots",
    },
    MenuLink {
        label: "Payment Methods",
        href: routes::ADMIN_PAYMENT_METHODS,
        description: "Manage available payment options",
    },
    MenuLink {
        label: "Egg Sizes",
        href: routes::ADMIN_EGG_SIZES,
        description: "Configure product sizes and pricing",
    },
];

/// The entries whose role set intersects the roles the session holds, in
/// source order.
pub fn visible_entries<'a>(entries: &'a [NavEntry], store: &SessionStore) -> Vec<&'a NavEntry> {
    entries
        .iter()
        .filter(|entry| entry.roles.iter().any(|role| store.has_role(role)))
        .collect()
}
