pub mod run;
pub mod workflow;
