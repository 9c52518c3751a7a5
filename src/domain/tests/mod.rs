//! Domain parsing and filtering tests

mod parser_tests;
