pub mod utils;

mod consolidate_tests;
