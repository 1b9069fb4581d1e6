//! Off-screen targets and the effects built on them.

pub mod postprocess;
pub mod render_target;
