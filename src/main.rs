// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::PathBuf;

use homeledger::{cli, commands, db, utils};

fn main() -> Result<()> {
    utils::init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let (mut conn, path) = match matches.get_one::<String>("db") {
        Some(p) => {
            let path = PathBuf::from(p.trim());
            (db::open_at(&path)?, path)
        }
        None => (db::open_or_init()?, db::db_path()?),
    };
    let explicit = matches.get_one::<String>("workspace").map(|s| s.as_str());

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("workspace", sub)) => commands::workspaces::handle(&mut conn, explicit, sub)?,
        Some((name, sub)) => {
            let ws = utils::resolve_workspace(&conn, explicit)?;
            match name {
                "account" => commands::accounts::handle(&mut conn, ws, sub)?,
                "category" => commands::categories::handle(&mut conn, ws, sub)?,
                "tx" => commands::transactions::handle(&mut conn, ws, sub)?,
                "budget" => commands::budgets::handle(&conn, ws, sub)?,
                "report" => commands::reports::handle(&conn, ws, sub)?,
                "export" => commands::exporter::handle(&conn, ws, sub)?,
                "doctor" => commands::doctor::handle(&mut conn, ws, sub)?,
                _ => {
                    cli::build_cli().print_help()?;
                    println!();
                }
            }
        }
        None => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
