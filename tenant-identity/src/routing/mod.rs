pub mod navigator;
pub mod post_login;
pub mod return_url;

pub use navigator::{LoggingNavigator, Navigator};
pub use post_login::PostLoginRouter;
pub use return_url::{login_url, sanitize_return_url};
