#![allow(dead_code, unused_imports)]

pub use provrun_test_utils::{builders, init_tracing, processes, with_timeout};
