pub mod common;
pub mod discount;
pub mod item;
pub mod negotiate;
pub mod sweep;
