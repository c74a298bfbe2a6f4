//! Core module
//!
//! Everything between the distribution index and a running game.

pub mod asset;
pub mod assetexec;
pub mod auth;
pub mod distro;
pub mod integrity;
pub mod java;
pub mod landing;
pub mod launch;
pub mod library;
pub mod news;
pub mod report;
pub mod status;
pub mod version;
