/// Router Module Index
///
/// Pages are split by access: `public` needs no session, `protected` wraps every route
/// in the gate of the view it renders.

/// Login, logout, theme, invite acceptance and the JSON endpoints.
pub mod public;

/// Role-scoped pages. Each route carries its view's `RouteGuard` as a route layer.
pub mod protected;
