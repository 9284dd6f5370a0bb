pub mod controller;
pub mod dispatcher;
pub mod executor;
pub mod plan;
pub mod replan;
pub mod state;

pub use controller::{Controller, ControllerResult};
pub use dispatcher::Dispatcher;
pub use replan::Act;
pub use state::PlanState;
