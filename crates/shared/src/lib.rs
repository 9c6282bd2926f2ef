//! Wire and domain types shared between the recall client core and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
