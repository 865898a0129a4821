pub mod subcategory;
pub mod booking;
pub mod venue;

pub use subcategory::{ReimbursementRuleChoice, Subcategory};
pub use booking::Booking;
pub use venue::{PricingPointLink, Venue, VenueError};
