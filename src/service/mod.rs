//! Portal behaviour on top of the backend ports.
//!
//! - `publish.rs`: upload-and-publish with compensation for image-backed rows
//! - `banners.rs`: viewport classing and the admin banner board
//! - `carousel.rs`: slide rotation state and its timer stream
//! - `catalog.rs`: read-only listings
//! - `session.rs`: role lookup and the sign-out-on-denial rule

pub mod banners;
pub mod carousel;
pub mod catalog;
pub mod publish;
pub mod session;
