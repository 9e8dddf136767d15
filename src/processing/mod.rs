//! Pose filtering stages applied between backend samples and rendered poses

pub mod smoother;
pub mod interpolator;

pub use smoother::PoseSmoother;
pub use interpolator::PoseInterpolator;
