//! Schema command implementation.

use feedsift_expr::Environment;

use super::{CommandContext, Result};
use crate::output;

/// Prints the variables, `Item` fields and functions available to expressions.
pub fn execute(ctx: &CommandContext) -> Result<()> {
    let env = Environment::new()?;

    if ctx.json_output {
        println!("{}", output::format_schema_json(&env)?);
    } else if !ctx.quiet {
        print!("{}", output::format_schema_table(&env, ctx.use_colors));
    }

    Ok(())
}
