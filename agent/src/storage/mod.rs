//! On-disk storage layout

pub mod layout;
