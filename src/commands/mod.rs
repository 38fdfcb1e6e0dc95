pub mod run;
pub mod units;
