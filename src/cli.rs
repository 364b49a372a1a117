/// Command line interface: `ligpyro run --task task.json` or `ligpyro simulate ...`
pub mod cli_main;
