pub mod clock;
pub mod space;
