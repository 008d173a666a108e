pub mod credits;
pub mod detail;
pub mod distributor;
pub mod listing;
pub mod query;
pub mod reviews;

pub use credits::parse_company_credits;
pub use detail::parse_detail;
pub use listing::parse_listing;
pub use reviews::parse_reviews;
