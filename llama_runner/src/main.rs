use anyhow::Result;
use llama_runner::{LlamaConfig, LlamaRunner, TextGenerator};

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let model_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "model/MMedS-Llama-3-8B.Q8_0.gguf".to_string());

    let mut runner = LlamaRunner::new(LlamaConfig::new().with_model_path(model_path));
    runner.load_model()?;
    println!("Model loaded successfully!\n");

    let prompt = "<|begin_of_text|><|start_header_id|>user<|end_header_id|>\n\nWhat is the treatment for diabetes?<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n";
    let full_text = runner.generate(prompt)?;
    println!("---- Full output ----\n{full_text}\n");

    Ok(())
}
