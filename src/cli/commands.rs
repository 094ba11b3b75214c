//! Command dispatch
//!
//! Each command loads the snapshot, runs one core operation and prints the
//! outcome. Commands that change results only persist with `--write`.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::debug;

use crate::application::{Outcome, Propagation};
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{flatten_with_depth, CalculatorId, CalculatorTree};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::{label, RenderOptions, TreeNodeConvert};

/// Run the parsed command; returns the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let command = cli
        .command
        .as_ref()
        .ok_or_else(|| CliError::Usage("no command given, see --help".into()))?;

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(exitcode::OK);
    }

    let local_dir = cli
        .file
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok());
    let settings = Settings::load(local_dir.as_deref())?;
    let snapshot = cli.file.clone().unwrap_or_else(|| settings.snapshot.clone());
    debug!("snapshot: {}", snapshot.display());

    let container = ServiceContainer::new(settings);
    let ctx = Context {
        container: &container,
        snapshot,
    };

    match command {
        Commands::Tree => ctx.tree(),
        Commands::List => ctx.list(),
        Commands::Scope { calculator_id } => ctx.scope(*calculator_id),
        Commands::Eval { calculator_id } => ctx.eval(*calculator_id),
        Commands::Set {
            calculator_id,
            variable_id,
            value,
            write,
        } => ctx.set(*calculator_id, *variable_id, *value, *write),
        Commands::Expr {
            calculator_id,
            expression,
            write,
        } => ctx.expr(*calculator_id, expression.clone(), *write),
        Commands::Recalc { write } => ctx.recalc(*write),
        Commands::Config => ctx.config(),
        Commands::Completion { .. } => Ok(exitcode::OK),
    }
}

struct Context<'a> {
    container: &'a ServiceContainer,
    snapshot: PathBuf,
}

impl Context<'_> {
    fn options(&self) -> RenderOptions {
        RenderOptions {
            precision: self.container.settings.precision,
            show_ids: self.container.settings.show_ids,
        }
    }

    fn load(&self) -> CliResult<CalculatorTree> {
        Ok(self.container.snapshots.load(&self.snapshot)?)
    }

    fn tree(&self) -> CliResult<i32> {
        let tree = self.load()?;
        output::info(&tree.to_tree_string(self.options()));
        Ok(exitcode::OK)
    }

    fn list(&self) -> CliResult<i32> {
        let tree = self.load()?;
        for (depth, node) in flatten_with_depth(&tree) {
            output::info(&format!("{}{}", "  ".repeat(depth), label(node, self.options())));
        }
        Ok(exitcode::OK)
    }

    fn scope(&self, calculator_id: CalculatorId) -> CliResult<i32> {
        let tree = self.load()?;
        let scope = self.container.calculators.scope(&tree, calculator_id)?;
        let node = tree.find_by_id(calculator_id)?;
        output::header(&format!("scope of {}", node));
        for (name, value) in scope.iter() {
            output::detail(&format!(
                "{} = {}",
                name,
                output::format_value(value, self.container.settings.precision)
            ));
        }
        Ok(exitcode::OK)
    }

    fn eval(&self, calculator_id: CalculatorId) -> CliResult<i32> {
        let tree = self.load()?;
        match self.container.calculators.evaluate_node(&tree, calculator_id)? {
            Ok(Outcome::Value(value)) => {
                output::info(&output::format_value(value, self.container.settings.precision));
                Ok(exitcode::OK)
            }
            Ok(Outcome::NoResult) => {
                output::warning(&format!("calculator {} has no expression", calculator_id));
                Ok(exitcode::OK)
            }
            Err(e) => {
                output::error(&e);
                Ok(exitcode::EVALERR)
            }
        }
    }

    fn set(&self, calculator_id: CalculatorId, variable_id: i64, value: f64, write: bool) -> CliResult<i32> {
        let tree = self.load()?;
        let propagation = self
            .container
            .calculators
            .apply_variable_change(&tree, calculator_id, variable_id, value)?;
        self.report(&tree, &propagation, write)
    }

    fn expr(&self, calculator_id: CalculatorId, expression: Option<String>, write: bool) -> CliResult<i32> {
        let tree = self.load()?;
        let propagation = self
            .container
            .calculators
            .apply_expression_change(&tree, calculator_id, expression)?;
        self.report(&tree, &propagation, write)
    }

    fn recalc(&self, write: bool) -> CliResult<i32> {
        let tree = self.load()?;
        let propagation = self.container.calculators.recalculate(&tree)?;
        self.report(&tree, &propagation, write)
    }

    fn config(&self) -> CliResult<i32> {
        output::info(&self.container.settings.to_toml()?);
        Ok(exitcode::OK)
    }

    /// Print before/after results of every visited calculator and the errors.
    fn report(&self, before: &CalculatorTree, propagation: &Propagation, write: bool) -> CliResult<i32> {
        let precision = self.container.settings.precision;
        output::header(&format!(
            "recomputed: {}",
            propagation
                .visited
                .iter()
                .filter_map(|&id| propagation.tree.get(id))
                .map(|n| n.name.as_str())
                .join(" → ")
        ));
        for &id in &propagation.visited {
            let Some(after) = propagation.tree.get(id) else {
                continue;
            };
            let old = before.get(id).and_then(|n| n.result);
            output::change(
                &after.to_string(),
                &output::format_result(old, precision),
                &output::format_result(after.result, precision),
            );
        }
        for error in &propagation.errors {
            output::failure(error);
        }

        if write {
            self.container.snapshots.save(&self.snapshot, &propagation.tree)?;
            output::success(&format!("saved {}", self.snapshot.display()));
        }

        Ok(if propagation.is_clean() {
            exitcode::OK
        } else {
            exitcode::EVALERR
        })
    }
}
