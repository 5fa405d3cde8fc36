use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Arg, ArgMatches, Command};
use futures::{future, stream::TryStreamExt};
use itertools::Itertools;
use store_ledger::entry::{Entry, FinalizedEntry};
use store_ledger::lookup::{filter, scoped};
use store_ledger::master::{MasterData, SupplierKey};
use store_ledger::sequence::EntrySequence;
use store_ledger::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[async_std::main]
async fn main() -> Result<()> {
    init_logging();
    let matches = Command::new("Store Ledger")
        .version("0.1.0")
        .author("Luke Nimtz <luke.nimtz@gmail.com>")
        .about("Store purchase, distribution and journal ledgers")
        .arg(
            Arg::new("entries")
                .short('e')
                .long("entries")
                .help("Sets directory or file of entries or '-' for stdin ")
                .value_name("DIR")
                .default_value("./")
                .takes_value(true),
        )
        .subcommand(Command::new("show").about("Shows every entry with its rows and totals"))
        .subcommand(Command::new("totals").about("Shows one line per entry with its total"))
        .subcommand(
            Command::new("validate").about("Checks entries against the submission rules"),
        )
        .subcommand(
            Command::new("export")
                .about("Exports finalized entries")
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .help("Output format")
                        .value_name("FORMAT")
                        .possible_values(["json", "yaml"])
                        .default_value("json")
                        .takes_value(true),
                ),
        )
        .subcommand(Command::new("parties").about("Shows gross totals by supplier or recipient"))
        .subcommand(
            Command::new("search")
                .about("Searches master data the way the entry forms autocomplete")
                .arg(
                    Arg::new("master")
                        .short('m')
                        .long("master")
                        .help("Master data file")
                        .value_name("FILE")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("kind")
                        .short('k')
                        .long("kind")
                        .help("Which master list to search")
                        .value_name("KIND")
                        .possible_values([
                            "books",
                            "suppliers",
                            "units",
                            "standards",
                            "heads",
                            "accounts",
                            "districts",
                            "students",
                            "invoices",
                        ])
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("by")
                        .long("by")
                        .help("Supplier field to match")
                        .value_name("FIELD")
                        .possible_values(["code", "name"])
                        .default_value("name")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("within")
                        .short('w')
                        .long("within")
                        .help("Parent to scope to: standard for books and students, state for districts, supplier code for invoices")
                        .value_name("PARENT")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("term")
                        .help("Search term, blank lists everything")
                        .value_name("TERM")
                        .default_value("")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("next-number")
                .about("Issues the next entry number for the fiscal year")
                .arg(
                    Arg::new("state")
                        .short('s')
                        .long("state")
                        .help("Sequence state file, created if missing")
                        .value_name("FILE")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("prefix")
                        .short('p')
                        .long("prefix")
                        .help("Number prefix")
                        .value_name("PREFIX")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("width")
                        .short('w')
                        .long("width")
                        .help("Digits the number is zero padded to")
                        .value_name("DIGITS")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("date")
                        .short('d')
                        .long("date")
                        .help("Entry date, defaults to today")
                        .value_name("YYYY-MM-DD")
                        .takes_value(true),
                ),
        )
        .get_matches();

    if let Some(search) = matches.subcommand_matches("search") {
        return search_master(search).await;
    }
    if let Some(next) = matches.subcommand_matches("next-number") {
        return next_number(next).await;
    }

    if let Some(entries_arg) = matches.value_of("entries") {
        let book = if entries_arg == "-" {
            StoreBook::new(None)
        } else {
            StoreBook::new(Some(entries_arg))
        };
        if matches.subcommand_matches("show").is_some() {
            book.entries()
                .try_for_each(|entry| {
                    println!("{entry}");
                    future::ready(Ok(()))
                })
                .await?;
        } else if matches.subcommand_matches("totals").is_some() {
            book.entries()
                .try_for_each(|entry| {
                    println!("{}", total_line(&entry));
                    future::ready(Ok(()))
                })
                .await?;
        } else if matches.subcommand_matches("validate").is_some() {
            let (checked, failed) = book
                .entries()
                .try_fold((0usize, 0usize), |(checked, failed), entry| {
                    let failed = match entry.validate() {
                        Ok(()) => failed,
                        Err(err) => {
                            eprintln!("ERROR: {}: {err}", entry.id());
                            failed + 1
                        }
                    };
                    future::ready(Ok((checked + 1, failed)))
                })
                .await?;
            info!(checked, failed, "validation finished");
            if failed > 0 {
                bail!("{} of {} entries failed validation", failed, checked);
            }
            println!("{checked} entries valid");
        } else if let Some(export) = matches.subcommand_matches("export") {
            let finalized: Vec<FinalizedEntry> = book
                .entries()
                .and_then(|entry| future::ready(entry.finalize()))
                .try_collect()
                .await?;
            match export.value_of("format") {
                Some("yaml") => print!("{}", serde_yaml::to_string(&finalized)?),
                _ => println!("{}", serde_json::to_string_pretty(&finalized)?),
            }
        } else if matches.subcommand_matches("parties").is_some() {
            let totals = book.totals_by_party().await?;
            totals
                .iter()
                .sorted_by(|a, b| a.0.cmp(b.0))
                .for_each(|(party, total)| {
                    println!("{:30} | {:>14}", party, total.to_currency_string())
                });
        }
    };
    Ok(())
}

fn total_line(entry: &Entry) -> String {
    let date = entry.date.map(|d| d.to_string()).unwrap_or_default();
    let balanced = match entry.is_balanced() {
        Some(true) => " | balanced",
        Some(false) => " | NOT balanced",
        None => "",
    };
    format!(
        "{:10} | {:10} | {:12} | {:30} | {:>14}{}",
        entry.id(),
        date,
        entry.r#type,
        entry.party_name(),
        entry.total().to_currency_string(),
        balanced
    )
}

async fn search_master(args: &ArgMatches) -> Result<()> {
    let master = MasterData::from_file(args.value_of("master").unwrap_or_default()).await?;
    let term = args.value_of("term").unwrap_or_default();
    let within = args.value_of("within").unwrap_or_default();
    let lines: Vec<String> = match args.value_of("kind").unwrap_or_default() {
        "books" => filter(scoped(&master.books, within), term, ())
            .into_iter()
            .map(|b| {
                let rate = b.amount.unwrap_or_default();
                format!("{} | {} | {} | {}", b.code, b.name, b.standard, rate)
            })
            .collect(),
        "suppliers" => {
            let key = match args.value_of("by") {
                Some("code") => SupplierKey::Code,
                _ => SupplierKey::Name,
            };
            filter(&master.suppliers, term, key)
                .into_iter()
                .map(|s| format!("{} | {}", s.code, s.name))
                .collect()
        }
        "units" => filter(&master.units, term, ())
            .into_iter()
            .map(|u| u.name.clone())
            .collect(),
        "standards" => filter(&master.standards, term, ())
            .into_iter()
            .map(|s| s.name.clone())
            .collect(),
        "heads" => filter(&master.category_heads, term, ())
            .into_iter()
            .map(|h| format!("{} | {}", h.category, h.account_head))
            .collect(),
        "accounts" => filter(&master.account_heads, term, ())
            .into_iter()
            .map(|h| h.name.clone())
            .collect(),
        "districts" => filter(scoped(&master.districts, within), term, ())
            .into_iter()
            .map(|d| format!("{} | {}", d.state, d.name))
            .collect(),
        "students" => filter(scoped(&master.students, within), term, ())
            .into_iter()
            .sorted_by(|a, b| a.admission_number.cmp(&b.admission_number))
            .map(|s| format!("{} | {} | {} {}", s.admission_number, s.name, s.standard, s.section))
            .collect(),
        "invoices" => filter(scoped(&master.outstanding_invoices, within), term, ())
            .into_iter()
            .map(|inv| {
                let due = inv.due_date.map(|d| d.to_string()).unwrap_or_default();
                format!("{} | {} | {} | {}", inv.number, due, inv.amount, inv.balance)
            })
            .collect(),
        kind => bail!("Unknown master list {}", kind),
    };
    lines.iter().for_each(|line| println!("{line}"));
    Ok(())
}

async fn next_number(args: &ArgMatches) -> Result<()> {
    let state = args.value_of("state").unwrap_or_default();
    let date: NaiveDate = match args.value_of("date") {
        Some(date) => date.parse()?,
        None => Local::now().date_naive(),
    };
    let width: Option<usize> = args.value_of("width").map(str::parse).transpose()?;
    let prefix = args.value_of("prefix");
    let mut sequence =
        EntrySequence::load(state, prefix.unwrap_or("ENT"), width.unwrap_or(2)).await?;
    if let Some(prefix) = prefix {
        prefix.clone_into(&mut sequence.prefix);
    }
    if let Some(width) = width {
        sequence.width = width;
    }
    let number = sequence.next(date);
    sequence.save(state).await?;
    println!("{number}");
    Ok(())
}
