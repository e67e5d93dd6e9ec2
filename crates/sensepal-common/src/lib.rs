pub mod card;
pub mod discovery;
pub mod error;
pub mod location;
pub mod map;
pub mod model;
pub mod places;
pub mod search_bar;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
