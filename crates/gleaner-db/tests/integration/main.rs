mod common;
mod config_tests;
mod posting_tests;
