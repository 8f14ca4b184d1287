pub mod booking;
pub mod error;
pub mod inventory;
pub mod planner;
pub mod schedule;

#[cfg(test)]
pub mod testutil;
