pub mod business_now;
pub mod daily;
pub mod schedule;
