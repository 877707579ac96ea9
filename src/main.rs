use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use trialdash::api::{self, HttpTransport, Transport};
use trialdash::config::{self, DashConfig};
use trialdash::output::{json as json_out, table};
use trialdash::page::{Page, PageContext};
use trialdash::summary::{FixedAdvance, SummaryCard};
use trialdash::table::{Outcome, SortKey, TableRequest, ViewKind};
use trialdash::view::{ControlName, Input};

#[derive(Parser)]
#[command(name = "trialdash", version, about = "Trials dashboard — rankings, trials and performance from the trials tracker API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// API base URL (default: $TRIALDASH_URL, then config, then the public tracker)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path to config file (default: ~/.trialdash/config.toml)
    #[arg(long, global = true, env = "TRIALDASH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sponsor rankings
    Rankings {
        /// Page query string, e.g. "min_total=5&is_industry_sponsor=true" or a full URL
        query: Option<String>,

        /// Snapshot date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Page number, starting at 1
        #[arg(long)]
        page: Option<usize>,

        /// Sort column, e.g. "due:desc" (repeatable)
        #[arg(long)]
        sort: Vec<String>,
    },

    /// Trials across all sponsors
    Trials {
        /// Page query string, e.g. "status=overdue&status=reported"
        query: Option<String>,

        #[arg(long)]
        page: Option<usize>,

        #[arg(long)]
        sort: Vec<String>,
    },

    /// One sponsor's trials
    Sponsor {
        /// Sponsor slug
        slug: String,

        query: Option<String>,

        #[arg(long)]
        page: Option<usize>,

        #[arg(long)]
        sort: Vec<String>,
    },

    /// Performance summary card
    Performance {
        query: Option<String>,

        /// Scope to one sponsor
        #[arg(long)]
        sponsor: Option<String>,

        /// Viewport width used to fit the card text (px)
        #[arg(long)]
        viewport: Option<u32>,
    },

    /// Download the unpaginated CSV for a view
    Export {
        /// rankings or trials
        view: ViewKind,

        query: Option<String>,

        #[arg(long)]
        sponsor: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive session: edit filters, page, sort, go back and forward
    Browse {
        view: ViewKind,

        query: Option<String>,

        #[arg(long)]
        sponsor: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the request and download URLs for a page without fetching
    Url {
        view: ViewKind,

        query: Option<String>,

        #[arg(long)]
        sponsor: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        page: Option<usize>,

        #[arg(long)]
        sort: Vec<String>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented config template
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let config_path = match cli.config {
        Some(p) => p,
        None => config::config_path()?,
    };
    let cfg = DashConfig::load_from(&config_path)?;
    let base_url = config::resolve_base_url(cli.base_url.as_deref(), "TRIALDASH_URL", &cfg);

    let connect = || -> Result<HttpTransport> {
        HttpTransport::new(&base_url, Duration::from_secs(cfg.timeout_secs))
            .with_context(|| format!("Invalid base URL: {base_url}"))
    };

    match cli.command {
        Commands::Rankings {
            query,
            date,
            page,
            sort,
        } => {
            let ctx = PageContext::rankings(date).with_page_length(cfg.page_length);
            show_page(&connect()?, ctx, query.as_deref(), page, &sort, json_output)?;
        }

        Commands::Trials { query, page, sort } => {
            let ctx = PageContext::trials().with_page_length(cfg.page_length);
            show_page(&connect()?, ctx, query.as_deref(), page, &sort, json_output)?;
        }

        Commands::Sponsor {
            slug,
            query,
            page,
            sort,
        } => {
            let ctx = PageContext::sponsor(&slug).with_page_length(cfg.page_length);
            show_page(&connect()?, ctx, query.as_deref(), page, &sort, json_output)?;
        }

        Commands::Performance {
            query,
            sponsor,
            viewport,
        } => {
            let ctx = match sponsor {
                Some(ref slug) => PageContext::sponsor(slug),
                None => PageContext::trials(),
            };
            let (page, _) = Page::load(ctx, query_part(query.as_deref()));
            let perf = api::fetch_performance(&connect()?, &page.performance_query())
                .context("Failed to fetch performance summary")?;
            let mut card = SummaryCard::from_performance(&perf);
            card.resize(
                viewport.unwrap_or(cfg.viewport_width),
                &[],
                cfg.font_bounds(),
                &FixedAdvance::default(),
            );
            if json_output {
                json_out::print_json(&card)?;
            } else {
                table::print_summary(&card);
            }
        }

        Commands::Export {
            view,
            query,
            sponsor,
            date,
            output,
        } => {
            let ctx = context_for(view, sponsor.as_deref(), date);
            let (page, _) = Page::load(ctx, query_part(query.as_deref()));
            let csv = connect()?
                .get_text(view.csv_path(), &page.table().export_query())
                .with_context(|| format!("Failed to download {} CSV", view.name()))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote {} bytes to {}", csv.len(), path.display());
                }
                None => print!("{csv}"),
            }
        }

        Commands::Browse {
            view,
            query,
            sponsor,
            date,
        } => {
            let ctx = context_for(view, sponsor.as_deref(), date).with_page_length(cfg.page_length);
            browse(&connect()?, ctx, query_part(query.as_deref()), json_output)?;
        }

        Commands::Url {
            view,
            query,
            sponsor,
            date,
            page,
            sort,
        } => {
            let ctx = context_for(view, sponsor.as_deref(), date).with_page_length(cfg.page_length);
            let (mut p, request) = Page::load(ctx, query_part(query.as_deref()));
            let request = adjust(&mut p, request, page, &sort)?;
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "location": p.location(),
                    "request": format!("{base_url}{}?{}", request.path, request.query),
                    "download": format!("{base_url}{}", p.table().export_link()),
                }))?;
            } else {
                println!("Location: {}", p.location());
                table::print_request(&base_url, &request, &p.table().export_link());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                if config::init_config(&config_path)? {
                    println!("Created {}", config_path.display());
                } else {
                    println!("Config already exists: {}", config_path.display());
                }
            }
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", cfg.display(&base_url));
            }
        },
    }

    Ok(())
}

/// Accept a bare query, a `?query`, or a full URL.
fn query_part(arg: Option<&str>) -> &str {
    match arg {
        Some(s) => s.split_once('?').map(|(_, q)| q).unwrap_or(s),
        None => "",
    }
}

fn context_for(view: ViewKind, sponsor: Option<&str>, date: Option<NaiveDate>) -> PageContext {
    match (view, sponsor) {
        (ViewKind::Trials, Some(slug)) => PageContext::sponsor(slug),
        (ViewKind::Trials, None) => PageContext::trials(),
        (ViewKind::Rankings, _) => PageContext::rankings(date),
    }
}

fn parse_sorts(view: ViewKind, args: &[String]) -> Result<Vec<SortKey>> {
    args
        .iter()
        .map(|s| {
            SortKey::parse(view, s).with_context(|| {
                let names: Vec<&str> = view.columns().iter().map(|c| c.data).collect();
                format!("Unknown sort: {s}. Use one of {} with optional :asc/:desc", names.join(", "))
            })
        })
        .collect()
}

/// Apply `--sort` and `--page` on top of the initial request.
fn adjust(page: &mut Page, mut request: TableRequest, page_no: Option<usize>, sort: &[String]) -> Result<TableRequest> {
    if !sort.is_empty() {
        let keys = parse_sorts(page.table().view(), sort)?;
        request = page.sort_by(keys);
    }
    if let Some(n) = page_no {
        if n == 0 {
            bail!("Pages start at 1");
        }
        request = page.goto_page(n - 1);
    }
    Ok(request)
}

fn show_page(
    transport: &dyn Transport,
    ctx: PageContext,
    query: Option<&str>,
    page_no: Option<usize>,
    sort: &[String],
    json_output: bool,
) -> Result<()> {
    let (mut page, request) = Page::load(ctx, query_part(query));
    let request = adjust(&mut page, request, page_no, sort)?;
    if page.fetch(transport, &request) == Outcome::Failed {
        bail!("Failed to fetch {} (run with RUST_LOG=debug for details)", page.table().view().name());
    }
    if json_output {
        json_out::print_json(&page.snapshot())?;
    } else {
        table::print_page(&page);
    }
    Ok(())
}

const BROWSE_HELP: &str = "\
Commands:
  check <status> | uncheck <status>   toggle a status filter
  min <n> | min -                     minimum total trials
  industry <true|false|any>           sponsor type
  due <true|false|any>                only sponsors with trials due
  search [text]                       search, or clear it
  page <n>                            go to page n (from 1)
  sort <column[:asc|desc]>            sort by a column
  back | forward                      walk history
  url                                 show the current address
  quit";

fn browse(transport: &dyn Transport, ctx: PageContext, query: &str, json_output: bool) -> Result<()> {
    let (mut page, request) = Page::load(ctx, query);
    render(transport, &mut page, &request, json_output)?;

    let stdin = std::io::stdin();
    loop {
        eprint!("{}> ", page.location());
        std::io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let rest: Vec<&str> = words.collect();
        let arg = rest.join(" ");

        let request = match cmd {
            "quit" | "exit" => break,
            "help" => {
                eprintln!("{BROWSE_HELP}");
                continue;
            }
            "url" => {
                println!("{}", page.location());
                continue;
            }
            "check" | "uncheck" => page.input(
                ControlName::Status,
                Input::Toggle {
                    value: arg,
                    checked: cmd == "check",
                },
            ),
            "min" => page.input(
                ControlName::MinTotal,
                Input::Text(if arg == "-" { String::new() } else { arg }),
            ),
            "industry" => page.input(ControlName::IndustrySponsor, Input::Select(choice(&arg))),
            "due" => page.input(ControlName::TrialsDue, Input::Select(choice(&arg))),
            "search" => page.input(ControlName::Search, Input::Text(arg)),
            "page" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Some(page.goto_page(n - 1)),
                _ => {
                    eprintln!("page needs a number from 1");
                    continue;
                }
            },
            "sort" => match SortKey::parse(page.table().view(), &arg) {
                Some(key) => Some(page.sort_by(vec![key])),
                None => {
                    eprintln!("unknown sort: {arg}");
                    continue;
                }
            },
            "back" => page.back(),
            "forward" => page.forward(),
            other => {
                eprintln!("unknown command: {other} (try help)");
                continue;
            }
        };

        match request {
            Some(request) => render(transport, &mut page, &request, json_output)?,
            None => eprintln!("(no change)"),
        }
    }
    Ok(())
}

fn choice(arg: &str) -> Option<String> {
    match arg {
        "" | "any" => None,
        other => Some(other.to_string()),
    }
}

/// Fetch and print. A failed fetch keeps the previous rows on screen.
fn render(transport: &dyn Transport, page: &mut Page, request: &TableRequest, json_output: bool) -> Result<()> {
    if page.fetch(transport, request) == Outcome::Failed {
        eprintln!("Fetch failed; showing previous results.");
    }
    if json_output {
        json_out::print_json(&page.snapshot())?;
    } else {
        table::print_page(page);
    }
    Ok(())
}
