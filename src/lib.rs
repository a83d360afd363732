pub mod boxes;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod heatmap;
pub mod model;
pub mod pipeline;
pub mod types;
pub mod visualize;
