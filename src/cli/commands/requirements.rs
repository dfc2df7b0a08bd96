//! The `revive requirements` command.

use crate::cli::args::RequirementsArgs;
use crate::error::Result;
use crate::install::Requirements;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Lists the modules a script would get before its first pass.
pub struct RequirementsCommand {
    args: RequirementsArgs,
}

impl RequirementsCommand {
    pub fn new(args: RequirementsArgs) -> Self {
        Self { args }
    }
}

impl Command for RequirementsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let requirements = Requirements::load(&self.args.script, true)?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&requirements).map_err(anyhow::Error::from)?;
            ui.raw(&json);
            return Ok(CommandResult::success());
        }

        ui.show_header(&self.args.script.display().to_string());
        ui.key_value("declared", &list_or_none(&requirements.declared));
        ui.key_value("imported", &list_or_none(&requirements.scanned));
        if requirements.is_empty() {
            ui.message("nothing to pre-install");
        }
        Ok(CommandResult::success())
    }
}

fn list_or_none(modules: &[String]) -> String {
    if modules.is_empty() {
        "(none)".to_string()
    } else {
        modules.join(", ")
    }
}
