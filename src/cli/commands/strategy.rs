//! The `revive strategy` command.
//!
//! Shows the host facts and the first install strategy the selector would
//! pick for a module, without installing anything.

use crate::cli::args::StrategyArgs;
use crate::config::RunnerConfig;
use crate::error::Result;
use crate::install::{top_level, StrategySelector};
use crate::runner::RunOptions;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

pub struct StrategyCommand {
    args: StrategyArgs,
    config: RunnerConfig,
}

impl StrategyCommand {
    pub fn new(args: StrategyArgs, config: RunnerConfig) -> Self {
        Self { args, config }
    }

    fn options(&self) -> Result<RunOptions> {
        let mut config = self.config.clone();
        if self.args.elevated {
            config.running_elevated = Some(true);
        } else if self.args.not_elevated {
            config.running_elevated = Some(false);
        }
        RunOptions::from_config(&config)
    }
}

impl Command for StrategyCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let options = self.options()?;
        let module = self.args.module.trim();
        self.show(ui, &options, module);
        Ok(CommandResult::success())
    }
}

impl StrategyCommand {
    fn show(&self, ui: &mut dyn UserInterface, options: &RunOptions, module: &str) {
        let host = &options.host;
        ui.show_header("Host");
        ui.key_value("elevated", yes_no(host.elevated));
        ui.key_value("debian family", yes_no(host.debian_family));
        ui.key_value("externally managed", yes_no(host.externally_managed));
        ui.key_value("virtualenv", yes_no(host.in_venv));
        ui.key_value("auto install", yes_no(options.allow_auto_install));
        ui.key_value("pip policy", &options.pip_policy.to_string());

        let selector = StrategySelector::new(
            options.host,
            options.pip_policy,
            options.allow_auto_install,
            &options.apt_packages,
        );

        ui.show_header(&format!("Module {}", module));
        ui.key_value("top level", top_level(module));
        ui.key_value("pip candidates", &options.pip_aliases.candidates(module).join(", "));
        ui.key_value(
            "apt package",
            options
                .apt_packages
                .package_for(module)
                .as_deref()
                .unwrap_or("(unmapped)"),
        );
        ui.key_value("first strategy", &selector.select(module, &[]).to_string());
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::BreakSystemPackagesPolicy;
    use crate::ui::MockUI;

    fn run(module: &str, config: RunnerConfig, elevated: bool) -> MockUI {
        let args = StrategyArgs {
            module: module.to_string(),
            elevated,
            not_elevated: !elevated,
        };
        let mut ui = MockUI::new();
        let result = StrategyCommand::new(args, config).execute(&mut ui).unwrap();
        assert!(result.success);
        ui
    }

    #[test]
    fn proactive_policy_picks_break_system_packages() {
        let config = RunnerConfig {
            pip_policy: BreakSystemPackagesPolicy::Proactive,
            ..RunnerConfig::default()
        };
        let ui = run("yaml", config, false);

        assert_eq!(ui.value_of("elevated"), Some("no"));
        assert_eq!(ui.value_of("pip policy"), Some("proactive"));
        assert_eq!(
            ui.value_of("first strategy"),
            Some("pip-break-system-packages")
        );
        assert!(ui.value_of("pip candidates").unwrap().contains("PyYAML"));
    }

    #[test]
    fn reactive_policy_picks_plain_pip() {
        let config = RunnerConfig {
            pip_policy: BreakSystemPackagesPolicy::Reactive,
            ..RunnerConfig::default()
        };
        let ui = run("requests", config, true);

        assert_eq!(ui.value_of("elevated"), Some("yes"));
        assert_eq!(ui.value_of("first strategy"), Some("pip"));
    }

    #[test]
    fn disabled_auto_install_is_reported() {
        let config = RunnerConfig {
            allow_auto_install: false,
            ..RunnerConfig::default()
        };
        let ui = run("requests", config, false);

        assert_eq!(ui.value_of("auto install"), Some("no"));
        assert!(ui
            .value_of("first strategy")
            .unwrap()
            .starts_with("none available"));
    }

    #[test]
    fn shows_apt_mapping_and_top_level() {
        let mut config = RunnerConfig::default();
        config
            .apt_packages
            .insert("custom".to_string(), "python3-custom".to_string());
        let ui = run("custom.sub", config, false);

        assert_eq!(ui.value_of("top level"), Some("custom"));
        assert_eq!(ui.value_of("apt package"), Some("python3-custom"));
    }

    #[test]
    fn unmapped_module() {
        let ui = run("nothing_maps_this", RunnerConfig::default(), false);
        assert_eq!(ui.value_of("apt package"), Some("(unmapped)"));
    }
}
