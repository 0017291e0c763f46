mod clear;
mod link;
mod postinstall;

pub use clear::clear;
pub use link::link;
pub use postinstall::postinstall;
