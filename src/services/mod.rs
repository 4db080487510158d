pub mod capture;
pub mod face;
pub mod feed;
pub mod geocode;
