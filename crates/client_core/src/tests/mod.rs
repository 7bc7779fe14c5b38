mod combinator_tests;
mod flash_tests;
