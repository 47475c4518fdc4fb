use rust_decimal::Decimal;

use optcycle_core::{BridgeConfig, RuntimeKind};
use optcycle_strategy::bridge_from_config;

/// Evaluates `function(args)` through the configured bridge and prints the result.
pub fn compute(
    function: &str,
    args: &[Decimal],
    runtime: &str,
    module: &str,
) -> anyhow::Result<()> {
    let runtime = parse_runtime(runtime)?;
    let bridge = bridge_from_config(&BridgeConfig {
        runtime,
        module: module.to_string(),
    })?;

    let value = bridge.invoke(function, args)?;
    tracing::info!(runtime = bridge.runtime_name(), function, %value, "Computed");
    println!("{value}");
    Ok(())
}

fn parse_runtime(name: &str) -> anyhow::Result<RuntimeKind> {
    match name.to_lowercase().as_str() {
        "builtin" => Ok(RuntimeKind::Builtin),
        "python" => Ok(RuntimeKind::Python),
        other => anyhow::bail!("Unknown runtime: '{other}'. Available: builtin, python"),
    }
}
