pub mod ids;
pub mod json_canonical;
