pub mod raw_forecast;
pub mod records;
pub mod region_code;
pub mod run_summary;
