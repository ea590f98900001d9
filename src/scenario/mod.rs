pub mod codegen;
pub mod scenario_model;
