// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, arg, value_parser};

const TX_TYPES: [&str; 4] = ["income", "expense", "refund", "transfer"];

fn json_flags(cmd: Command) -> Command {
    cmd.arg(arg!(--json "Print as pretty JSON").action(ArgAction::SetTrue))
        .arg(
            arg!(--jsonl "Print as JSON lines")
                .action(ArgAction::SetTrue)
                .conflicts_with("json"),
        )
}

fn yes_flag() -> Arg {
    arg!(--yes "Also delete dependent transactions").action(ArgAction::SetTrue)
}

fn tx_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(arg!(--date <DATE> "YYYY-MM-DD").required(false))
        .arg(
            Arg::new("type")
                .long("type")
                .value_name("TYPE")
                .help("Transaction type")
                .value_parser(TX_TYPES),
        )
        .arg(arg!(--amount <AMOUNT> "Positive amount").required(required))
        .arg(arg!(--who <NAME> "Merchant, or payer for income").required(false))
        .arg(arg!(--account <ACCOUNT> "Sending account").required(false))
        .arg(arg!(--to <ACCOUNT> "Receiving account (transfer)").required(false))
        .arg(arg!(--category <CATEGORY>).required(false))
        .arg(arg!(--note <NOTE>).required(false))
        .arg(arg!(--receipt <FILE> "Attach a receipt image").required(false))
        .arg(arg!(--ocr <TEXT> "Text recognised on the receipt").required(false))
}

pub fn build_cli() -> Command {
    Command::new("homeledger")
        .about("Household budgeting ledger: accounts, categories, transactions and budgets")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            arg!(--db <PATH> "Database file")
                .global(true)
                .required(false)
                .env(crate::db::DB_ENV),
        )
        .arg(
            arg!(-w --workspace <NAME> "Workspace to act on instead of the active one")
                .global(true)
                .required(false),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("workspace")
                .about("Manage workspaces")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(<NAME>).id("name"))
                        .about("Create a workspace and make it active"),
                )
                .subcommand(Command::new("list"))
                .subcommand(Command::new("use").arg(arg!(<NAME>).id("name")))
                .subcommand(
                    Command::new("rename")
                        .arg(arg!(<NAME>).id("name"))
                        .arg(arg!(<NEW_NAME>).id("new_name")),
                )
                .subcommand(Command::new("rm").arg(arg!(<NAME>).id("name")))
                .subcommand(Command::new("share").about("Hand the active workspace to the sharing transport")),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(<NAME>).id("name"))
                        .arg(
                            arg!(--balance <AMOUNT> "Opening balance")
                                .required(false)
                                .default_value("0"),
                        )
                        .arg(arg!(--credit "Credit account").action(ArgAction::SetTrue))
                        .arg(arg!(--last4 <DIGITS>).required(false)),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(arg!(<NAME>).id("name"))
                        .arg(arg!(--rename <NEW_NAME>).required(false))
                        .arg(arg!(--last4 <DIGITS>).required(false)),
                )
                .subcommand(Command::new("rm").arg(arg!(<NAME>).id("name")).arg(yes_flag())),
        )
        .subcommand(
            Command::new("category")
                .about("Manage budget categories")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(<NAME>).id("name"))
                        .arg(
                            arg!(--budget <AMOUNT> "Monthly budget")
                                .required(false)
                                .default_value("0"),
                        )
                        .arg(arg!(--income "Income category").action(ArgAction::SetTrue)),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("edit")
                        .arg(arg!(<NAME>).id("name"))
                        .arg(arg!(--rename <NEW_NAME>).required(false))
                        .arg(arg!(--budget <AMOUNT>).required(false)),
                )
                .subcommand(Command::new("rm").arg(arg!(<NAME>).id("name")).arg(yes_flag())),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and browse transactions")
                .subcommand(tx_fields(Command::new("add"), true))
                .subcommand(
                    tx_fields(Command::new("edit"), false)
                        .arg(arg!(<ID>).id("id").value_parser(value_parser!(i64)))
                        .arg(
                            arg!(--"drop-receipt" "Remove the attached receipt")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("receipt"),
                        ),
                )
                .subcommand(
                    Command::new("rm").arg(
                        arg!(<ID>)
                            .id("ids")
                            .num_args(1..)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(arg!(--search <TERMS> "Comma-separated terms, >N and <N compare amounts").required(false))
                        .arg(
                            arg!(--any "Match any term instead of all")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            arg!(--category <CATEGORY> "Only this category")
                                .required(false)
                                .conflicts_with("search"),
                        )
                        .arg(arg!(--month <YYYY_MM>).required(false))
                        .arg(
                            arg!(--limit <N>)
                                .required(false)
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(arg!(--grouped "Group by day").action(ArgAction::SetTrue)),
                )),
        )
        .subcommand(json_flags(
            Command::new("budget")
                .about("Budget versus actual for a month")
                .arg(arg!(--month <YYYY_MM>).required(false)),
        ))
        .subcommand(json_flags(
            Command::new("report")
                .about("Transactions between two dates, inclusive")
                .arg(arg!(--from <DATE>).required(true))
                .arg(arg!(--to <DATE>).required(true)),
        ))
        .subcommand(
            Command::new("export")
                .about("Export a date range")
                .arg(arg!(--from <DATE>).required(true))
                .arg(arg!(--to <DATE>).required(true))
                .arg(
                    arg!(--format <FMT>)
                        .required(false)
                        .value_parser(["csv", "json"])
                        .default_value("csv"),
                )
                .arg(arg!(--out <PATH>).required(true)),
        )
        .subcommand(
            Command::new("doctor")
                .about("Compare running totals with transaction history")
                .arg(
                    arg!(--audit "Put mismatched totals on hold")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--repair "Rebuild totals from history and lift holds")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("audit"),
                ),
        )
}
