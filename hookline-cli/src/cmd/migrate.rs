use serde::Serialize;

use hookline_store::{run_migrations, PostgresStore};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{database_url, redact_url_password};
use crate::{OutputArgs, StoreArgs};

#[derive(Serialize)]
struct MigrateResult {
    success: bool,
    message: String,
}

pub async fn migrate_cmd(store: StoreArgs, output: OutputArgs) -> i32 {
    let Some(url) = database_url(&store) else {
        print_error(
            output.format,
            output.quiet,
            "missing database url (use --store or set HOOKLINE_DATABASE_URL / DATABASE_URL)",
        );
        return exit_codes::RUNTIME_ERROR;
    };

    let pg = match PostgresStore::connect(&url, store.max_connections).await {
        Ok(s) => s,
        Err(e) => {
            let safe_url = redact_url_password(&url);
            print_error(
                output.format,
                output.quiet,
                &format!("failed to connect to postgres at {safe_url}: {e}"),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    match run_migrations(pg.pool()).await {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: migrations applied");
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &MigrateResult {
                        success: true,
                        message: "migrations applied".to_string(),
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &format!("migration failed: {e}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}
