use crate::commands::CommandContext;
use crate::error::Result;
use crate::output::{CommandInputs, ResultBuilder, print_result};

pub fn execute(ctx: &CommandContext) -> Result<()> {
	let config = ctx.load_config(None)?;
	let result = ResultBuilder::new("config")
		.inputs(CommandInputs {
			config: ctx.config_path.clone(),
			..Default::default()
		})
		.data(config)
		.build();
	print_result(&result, ctx.format);
	Ok(())
}
