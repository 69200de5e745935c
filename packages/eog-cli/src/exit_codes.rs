pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
/// Bad arguments, unreadable inputs or invalid archives; clap also exits with 2.
pub const INPUT_ERROR: i32 = 2;
/// Some batch inputs failed while others succeeded.
pub const PARTIAL_FAILURE: i32 = 3;
