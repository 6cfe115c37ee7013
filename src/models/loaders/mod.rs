pub mod toml_loader;

pub use toml_loader::{archive_case_file, load_all_case_files, load_case_file};
