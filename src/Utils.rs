/// Species and reaction tables from CSV files
pub mod load_from_file;
/// Trajectory with species names: series access, tables, CSV export, conversion report
pub mod results_output;
