pub mod controller;
pub mod cooldown;
pub mod mask;
pub mod state;

pub use controller::AuthFlowController;
pub use cooldown::CooldownTimer;
pub use mask::mask_identifier;
pub use state::{AuthEvent, AuthFlowState, Challenge};
