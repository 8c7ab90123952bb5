//! Route table of the client.

pub const HOME: &str = "/";
pub const DASHBOARD: &str = "/dashboard";
pub const ORDERS: &str = "/orders";
pub const CHAT: &str = "/chat";
pub const SETTINGS: &str = "/settings";
pub const MAINTENANCE: &str = "/maintenance";
pub const ADMIN_USERS: &str = "/admin/users";
pub const ADMIN_CONDOMINIUMS: &str = "/admin/condominiums";
pub const ADMIN_DELIVERY_WINDOWS: &str = "/admin/delivery-windows";
pub const ADMIN_PAYMENT_METHODS: &str = "/admin/payment-methods";
pub const ADMIN_EGG_SIZES: &str = "/admin/egg-sizes";

/// Landing route after a sign-in transition.
pub const AUTHENTICATED_LANDING: &str = DASHBOARD;
/// Landing route after a sign-out transition.
pub const PUBLIC_LANDING: &str = HOME;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Auth,
    Dashboard,
    Orders,
    Chat,
    Settings,
    Maintenance,
    AdminUsers,
    AdminCondominiums,
    AdminDeliveryWindows,
    AdminPaymentMethods,
    AdminEggSizes,
}

impl Screen {
    pub const ALL: [Screen; 11] = [
        Screen::Auth,
        Screen::Dashboard,
        Screen::Orders,
        Screen::Chat,
        Screen::Settings,
        Screen::Maintenance,
        Screen::AdminUsers,
        Screen::AdminCondominiums,
        Screen::AdminDeliveryWindows,
        Screen::AdminPaymentMethods,
        Screen::AdminEggSizes,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Screen::Auth => HOME,
            Screen::Dashboard => DASHBOARD,
            Screen::Orders => ORDERS,
            Screen::Chat => CHAT,
            Screen::Settings => SETTINGS,
            Screen::Maintenance => MAINTENANCE,
            Screen::AdminUsers => ADMIN_USERS,
            Screen::AdminCondominiums => ADMIN_CONDOMINIUMS,
            Screen::AdminDeliveryWindows => ADMIN_DELIVERY_WINDOWS,
            Screen::AdminPaymentMethods => ADMIN_PAYMENT_METHODS,
            Screen::AdminEggSizes => ADMIN_EGG_SIZES,
        }
    }

    /// Matches a path, ignoring one trailing slash.
    pub fn from_path(path: &str) -> Option<Screen> {
        let path = if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };
        Screen::ALL.into_iter().find(|s| s.path() == path)
    }

    pub fn is_admin(self) -> bool {
        matches!(
            self,
            Screen::Maintenance
                | Screen::AdminUsers
                | Screen::AdminCondominiums
                | Screen::AdminDeliveryWindows
                | Screen::AdminPaymentMethods
                | Screen::AdminEggSizes
        )
    }

    pub fn is_public(self) -> bool {
        self == Screen::Auth
    }
}
