pub mod allocator;
pub mod catalog;
pub mod layout;
pub mod pricing;
