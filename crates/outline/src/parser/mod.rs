//! PDF container access and layout analysis: turns raw PDF bytes into the
//! [`Document`](crate::model::Document) model the outline core consumes.

pub mod backend;
pub mod layout;
