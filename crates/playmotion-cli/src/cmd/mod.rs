pub mod lifecycle;
pub mod motion;
pub mod run;
pub mod serve;
