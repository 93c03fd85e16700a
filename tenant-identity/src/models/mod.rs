pub mod auth;
pub mod permission;
pub mod session;
pub mod tenant;

pub use auth::ChallengeChannel;
pub use permission::{Entitlements, PermissionEntry, PermissionRequirement, RolePermissions};
pub use session::{Session, SessionScope, SessionStatus, SessionTokens, SessionUser, TenantMembership};
pub use tenant::{BootstrapStatus, ResolutionSource, TenantContext, TenantStatus};
