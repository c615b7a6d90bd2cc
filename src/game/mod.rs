pub mod chart;
pub mod judgment;
pub mod note;
pub mod parsing;
pub mod projection;
pub mod session;
pub mod timing;
pub mod timing_windows;
