pub mod common;

mod crawl_tests;
mod session_tests;
