//! Integration tests

mod band_test;
mod e2e_test;
