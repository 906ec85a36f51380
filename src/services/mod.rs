//! Service layer: the drive's tree rules and the payload storage backends.

pub mod drive_service;
pub mod media_service;
