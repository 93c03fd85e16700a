pub mod api_client;
pub mod permissions;
pub mod session_manager;
pub mod session_storage;
pub mod tenant_bootstrap;
pub mod tenant_context;
pub mod tenant_resolver;

pub use api_client::{HttpIdentityApi, IdentityApi, TenantScope};
pub use permissions::{EntitlementService, PermissionService};
pub use session_manager::SessionManager;
pub use session_storage::SessionStorage;
pub use tenant_bootstrap::TenantBootstrap;
pub use tenant_context::TenantContextStore;
pub use tenant_resolver::{is_valid_slug, LocationSource, TenantResolver, UrlLocation};
