pub mod cli;
pub mod fetch;
pub mod google;
pub mod report;
pub mod sink;
