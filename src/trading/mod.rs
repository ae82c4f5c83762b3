//! Trading logic: policy building, stake sizing, position tracking.

mod builder;
mod engine;
mod sizer;
mod tracker;

pub use builder::{AllowAll, Authorizer, PolicyBuilder, SessionContext};
pub use engine::CopyEngine;
pub use sizer::PositionSizer;
pub use tracker::PositionTracker;
