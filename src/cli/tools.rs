use crate::cli::{load_config, ToolsArgs};

pub fn execute(args: ToolsArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;

    if config.tools.is_empty() {
        println!("No tools configured in {}", args.config.display());
        return Ok(());
    }

    println!("\n=== Configured Tools ===\n");
    for tool in &config.tools {
        let status = if tool.enabled { "" } else { " [DISABLED]" };
        println!("  - {} ({}) -> {}{}", tool.id, tool.kind, tool.name, status);
    }
    println!();

    Ok(())
}
