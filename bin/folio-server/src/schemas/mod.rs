//! Request / response DTOs, grouped by API version.

pub mod v1;
