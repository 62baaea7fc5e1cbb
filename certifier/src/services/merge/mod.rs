mod generate;

pub use generate::{distinct_names, ensure_output_dir, generate_certificates};
