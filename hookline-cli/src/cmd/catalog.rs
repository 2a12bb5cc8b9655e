use hookline_core::Catalog;

use crate::commands::CatalogCommand;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::load_catalog;
use crate::{EngineArgs, OutputArgs};

/// Reads the host catalog only; no store is needed.
pub async fn catalog_cmd(command: CatalogCommand, engine: EngineArgs, output: OutputArgs) -> i32 {
    let catalog = match load_catalog(engine.catalog.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };

    let names = match command {
        CatalogCommand::Functions => catalog.functions(),
        CatalogCommand::Methods => catalog.methods(),
        CatalogCommand::Services => catalog.services(),
    };

    if output.format == OutputFormat::Text && !output.quiet {
        for name in &names {
            println!("{name}");
        }
    } else {
        print_result(output.format, output.quiet, &names);
    }
    exit_codes::SUCCESS
}
