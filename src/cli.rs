// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Command, arg};

pub fn build_cli() -> Command {
    Command::new("pocketsync")
        .about("Live-sync, optimistic deletes, and derived analytics for personal-finance views")
        .version(clap::crate_version!())
        .subcommand(
            Command::new("report")
                .about("Aggregate a records file into totals, breakdowns, buckets, and trends")
                .arg(arg!(--records <FILE> "JSON array of records").required(true))
                .arg(arg!(--categories <FILE> "JSON array of categories").required(false))
                .arg(arg!(--start <DATE> "Start date, YYYY-MM-DD inclusive").required(false))
                .arg(arg!(--end <DATE> "End date, YYYY-MM-DD inclusive").required(false))
                .arg(
                    arg!(--category <ID> "Category id filter, repeatable")
                        .required(false)
                        .action(clap::ArgAction::Append),
                )
                .arg(arg!(--query <TEXT> "Free-text filter").required(false))
                .arg(arg!(--min <AMOUNT> "Minimum amount").required(false))
                .arg(arg!(--max <AMOUNT> "Maximum amount").required(false))
                .arg(
                    arg!(--sparkline <ID> "Also print a per-day series for this category id")
                        .required(false),
                )
                .arg(arg!(--days <N> "Sparkline length in days (default 30)").required(false))
                .arg(arg!(--today <DATE> "Sparkline end date (default: today)").required(false))
                .arg(arg!(--json "Print JSON instead of tables"))
                .arg(arg!(--jsonl "Print JSON lines instead of tables")),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a recorded event script through a sync session")
                .arg(arg!(--script <FILE> "JSON event script").required(true))
                .arg(
                    arg!(--collection <NAME> "Collection to view: expenses or trades")
                        .required(false),
                )
                .arg(
                    arg!(--grace <SECONDS> "Undo grace window in seconds (default 5)")
                        .required(false),
                )
                .arg(arg!(--json "Print JSON instead of tables"))
                .arg(arg!(--jsonl "Print JSON lines instead of tables")),
        )
}
