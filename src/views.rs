use crate::role::Role;

/// RouteGuard
///
/// The static access rule attached to a protected view: the set of roles allowed to
/// render it. Guards are compile-time constants and never change at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    pub allowed_roles: &'static [Role],
}

impl RouteGuard {
    pub const fn new(allowed_roles: &'static [Role]) -> Self {
        Self { allowed_roles }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

const LANDLORD_ONLY: RouteGuard = RouteGuard::new(&[Role::Landlord]);
const MANAGER_ONLY: RouteGuard = RouteGuard::new(&[Role::Manager]);
const TENANT_ONLY: RouteGuard = RouteGuard::new(&[Role::Tenant]);
const LANDLORD_OR_MANAGER: RouteGuard = RouteGuard::new(&[Role::Landlord, Role::Manager]);
const ANY_ROLE: RouteGuard = RouteGuard::new(&Role::ALL);

/// View
///
/// Every page the portal serves. The role-to-view permissions are an exhaustive match
/// in [`View::guard`], so adding a view without deciding who may see it does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    AcceptInvite,
    Dashboard,
    ManagerHome,
    TenantHome,
    Properties,
    Units,
    Invites,
    InviteManager,
    Leases,
    Maintenance,
    Profile,
}

impl View {
    pub const PROTECTED: [View; 10] = [
        View::Dashboard,
        View::ManagerHome,
        View::TenantHome,
        View::Properties,
        View::Units,
        View::Invites,
        View::InviteManager,
        View::Leases,
        View::Maintenance,
        View::Profile,
    ];

    /// Canonical path. `AcceptInvite` is parameterised; its path is the route prefix.
    pub fn path(self) -> &'static str {
        match self {
            View::Login => "/login",
            View::AcceptInvite => "/invite",
            View::Dashboard => "/dashboard",
            View::ManagerHome => "/manager",
            View::TenantHome => "/tenant",
            View::Properties => "/properties/new",
            View::Units => "/units/new",
            View::Invites => "/invites/new",
            View::InviteManager => "/managers/invite",
            View::Leases => "/leases/new",
            View::Maintenance => "/maintenance/new",
            View::Profile => "/profile",
        }
    }

    /// guard
    ///
    /// `None` marks a public view. Every other view declares exactly which roles may
    /// render it.
    pub fn guard(self) -> Option<RouteGuard> {
        match self {
            View::Login | View::AcceptInvite => None,
            View::Dashboard => Some(LANDLORD_ONLY),
            View::ManagerHome => Some(MANAGER_ONLY),
            View::TenantHome => Some(TENANT_ONLY),
            View::Properties => Some(LANDLORD_ONLY),
            View::Units => Some(LANDLORD_ONLY),
            View::Invites => Some(LANDLORD_OR_MANAGER),
            View::InviteManager => Some(LANDLORD_ONLY),
            View::Leases => Some(LANDLORD_OR_MANAGER),
            View::Maintenance => Some(TENANT_ONLY),
            View::Profile => Some(ANY_ROLE),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Login => "Sign in",
            View::AcceptInvite => "Accept Invite",
            View::Dashboard | View::ManagerHome | View::TenantHome => "Dashboard",
            View::Properties => "Properties",
            View::Units => "Units",
            View::Invites => "Invites",
            View::InviteManager => "Invite Manager",
            View::Leases => "Leases",
            View::Maintenance => "Maintenance",
            View::Profile => "Profile",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            View::Login => "Sign in to manage your rentals",
            View::AcceptInvite => "Complete your registration",
            View::Dashboard => "Landlord view",
            View::ManagerHome => "Manager view",
            View::TenantHome => "Tenant view",
            View::Properties => "Create and manage your portfolio",
            View::Units => "Manage available units",
            View::Invites => "Invite and onboard tenants",
            View::InviteManager => "Assign management access",
            View::Leases => "Create and track leases",
            View::Maintenance => "Report a new issue",
            View::Profile => "Manage your account settings",
        }
    }

    /// Dashboards greet the user instead of showing a static title.
    pub fn is_home(self) -> bool {
        matches!(self, View::Dashboard | View::ManagerHome | View::TenantHome)
    }
}
