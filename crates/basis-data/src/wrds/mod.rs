//! WRDS (Wharton Research Data Services) access.
//!
//! WRDS exposes its libraries over PostgreSQL; the Markit CDS tables and
//! CRSP header table used here are queried directly.

pub mod client;
pub mod crsp_link;
pub mod markit;

pub use client::WrdsClient;
pub use crsp_link::{link_red_to_crsp, pull_red_crsp_link, subset_cds_to_crsp};
pub use markit::{pull_cds_data, pull_red_isin_mapping};
