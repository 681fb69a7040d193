mod cache;
mod cli;
mod config;
mod coordinator;
mod error;
mod fallback;
mod model;
mod normalize;
mod output;
mod process;
mod provider;
mod retry;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::AppConfig;
use coordinator::{ConsoleNotifier, SearchCoordinator};
use model::{Filters, SortOption};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "shopscout=debug"
    } else {
        "shopscout=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load(
        cli.country,
        cli.language,
        cli.no_cache,
        cli.timeout,
        cli.provider,
        cli.debug,
    )?;

    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted.");
        std::process::exit(130);
    })
    .context("Failed to set Ctrl+C handler")?;

    match cli.command {
        Commands::Search {
            query,
            page,
            sort,
            min_price,
            max_price,
            min_rating,
            brand,
            store,
            refresh,
            diagnostics,
        } => {
            let filters = Filters {
                min_price,
                max_price,
                min_rating,
                brands: brand,
                sources: store,
                sort: SortOption::from_str(&sort),
            };
            cmd_search(&config, &query, page, filters, refresh, diagnostics).await?;
        }
        Commands::Shell => cmd_shell(&config).await?,
    }

    Ok(())
}

async fn cmd_search(
    config: &AppConfig,
    query: &str,
    page: u32,
    filters: Filters,
    refresh: bool,
    diagnostics: bool,
) -> Result<()> {
    let mut coordinator =
        SearchCoordinator::from_config(config).with_notifier(Box::new(ConsoleNotifier));

    coordinator.set_filters(filters);
    coordinator.submit_search_opts(query, refresh).await;
    if page > 1 {
        coordinator.go_to_page(page).await;
    }

    print!("{}", output::format_session(coordinator.state()));
    if diagnostics {
        print!("{}", output::format_diagnostics(&coordinator.diagnostics()));
    }
    Ok(())
}

async fn cmd_shell(config: &AppConfig) -> Result<()> {
    let mut coordinator =
        SearchCoordinator::from_config(config).with_notifier(Box::new(ConsoleNotifier));

    println!("shopscout interactive session. Type 'help' for commands, 'quit' to leave.");
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "quit" | "exit" | "q" => break,
            "help" => print_shell_help(),
            "search" | "s" => {
                if rest.is_empty() {
                    eprintln!("usage: search <query>");
                    continue;
                }
                coordinator.submit_search(rest).await;
                render(&coordinator);
            }
            "page" | "p" => match rest.parse::<u32>() {
                Ok(n) => {
                    coordinator.go_to_page(n).await;
                    render(&coordinator);
                }
                Err(_) => eprintln!("usage: page <number>"),
            },
            "next" | "n" => {
                let target = coordinator.state().current_page + 1;
                coordinator.go_to_page(target).await;
                render(&coordinator);
            }
            "prev" => {
                let target = coordinator.state().current_page.saturating_sub(1).max(1);
                coordinator.go_to_page(target).await;
                render(&coordinator);
            }
            "sort" => {
                let mut filters = coordinator.state().filters.clone();
                filters.sort = SortOption::from_str(rest);
                println!("sort: {}", filters.sort.as_str());
                coordinator.set_filters(filters);
                render(&coordinator);
            }
            "min-price" | "max-price" | "min-rating" => {
                let value = if rest.is_empty() {
                    None
                } else {
                    match rest.parse::<f64>() {
                        Ok(v) => Some(v),
                        Err(_) => {
                            eprintln!("usage: {} <number>", command);
                            continue;
                        }
                    }
                };
                let mut filters = coordinator.state().filters.clone();
                match command {
                    "min-price" => filters.min_price = value,
                    "max-price" => filters.max_price = value,
                    _ => filters.min_rating = value,
                }
                coordinator.set_filters(filters);
                render(&coordinator);
            }
            "brand" | "store" => {
                let mut filters = coordinator.state().filters.clone();
                let values = if rest.is_empty() {
                    Vec::new()
                } else {
                    vec![rest.to_string()]
                };
                if command == "brand" {
                    filters.brands = values;
                } else {
                    filters.sources = values;
                }
                coordinator.set_filters(filters);
                render(&coordinator);
            }
            "clear-filters" => {
                coordinator.set_filters(Filters::default());
                render(&coordinator);
            }
            "country" => {
                if let Err(e) = AppConfig::validate_country(rest) {
                    eprintln!("{}", e);
                    continue;
                }
                let language = coordinator.state().last_query.as_ref().map_or_else(
                    || config.language.clone(),
                    |q| q.language.clone(),
                );
                coordinator.set_market(rest, &language).await;
                render(&coordinator);
            }
            "retry" => {
                coordinator.retry_last_search().await;
                render(&coordinator);
            }
            "clear-cache" => {
                let dropped = coordinator.clear_cache();
                println!("Cache cleared ({} entries dropped).", dropped);
            }
            "diag" => print!("{}", output::format_diagnostics(&coordinator.diagnostics())),
            _ => eprintln!("Unknown command '{}'. Type 'help' for a list.", command),
        }
    }

    Ok(())
}

fn render(coordinator: &SearchCoordinator) {
    print!("{}", output::format_session(coordinator.state()));
}

fn print_shell_help() {
    println!(
        "Commands:\n\
         \x20 search <query>      run a new search\n\
         \x20 page <n>            jump to a page (clamped to range)\n\
         \x20 next, prev          step through pages\n\
         \x20 sort <order>        none, price_asc, price_desc, rating_desc\n\
         \x20 min-price [n]       set or clear the price floor\n\
         \x20 max-price [n]       set or clear the price ceiling\n\
         \x20 min-rating [n]      set or clear the rating floor\n\
         \x20 brand [text]        filter brands by substring; empty to clear\n\
         \x20 store [text]        filter stores by substring; empty to clear\n\
         \x20 clear-filters       drop all filters and sorting\n\
         \x20 country <code>      switch market and refetch\n\
         \x20 retry               rerun the last search, bypassing caches\n\
         \x20 clear-cache         wipe the response cache\n\
         \x20 diag                show cache and provider diagnostics\n\
         \x20 quit                leave the session"
    );
}
