//! End-to-end tests at the table level.
//!
//! Each test file covers a specific scenario, driving a real table file in a
//! temporary directory through the public engine operations.

#![cfg(test)]

mod test_alice_scenario;
mod test_delete_then_get;
mod test_header_overflow;
mod test_page_overflow;
mod test_persistence;
mod test_randomized_model;
mod test_uniqueness;
mod test_update;
