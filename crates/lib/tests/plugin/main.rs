mod common;

mod build_tests;
mod merge_tests;
mod shared_tests;
