use anyhow::Result;
use gaze_follow::config::ModelConfig;
use gaze_follow::model::{build_session, check_contract};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: inspect_onnx <path_to_model.onnx>");
        return Ok(());
    }

    let model_path = &args[1];
    println!("Inspecting model: {}", model_path);

    let session = build_session(Path::new(model_path), 1)?;

    println!("\n--- Inputs ---");
    for (i, input) in session.inputs.iter().enumerate() {
        println!("#{}: Name: {}", i, input.name);
        println!("    Type: {:?}", input.input_type);
    }

    println!("\n--- Outputs ---");
    for (i, output) in session.outputs.iter().enumerate() {
        println!("#{}: Name: {}", i, output.name);
        println!("    Type: {:?}", output.output_type);
    }

    let config = ModelConfig::default();
    match check_contract(session.inputs.len(), session.outputs.len(), &config) {
        Ok(()) => println!(
            "\nOK: heatmap at output #{}, in/out logit at output #{}",
            config.heatmap_output, config.inout_output
        ),
        Err(e) => println!("\nNot a spatial gaze model: {}", e),
    }

    Ok(())
}
