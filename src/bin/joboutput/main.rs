use anyhow::Result;
use colored::*;

use joboutput::{Event, EventSource, HttpTransport, OutputConfig, PageQuery};

mod args;
use args::{CliArgs, Selection};

#[tokio::main]
async fn main() -> Result<()> {
    joboutput::init_logging();

    let cli = CliArgs::parse()?;
    let config = OutputConfig::load()?;

    let transport = HttpTransport::new(&config.http)?;
    let source = EventSource::new(transport).with_max_page_size(config.paging.max_page_size);
    let mut params = PageQuery::new(config.paging.page_size, &config.paging.order_by);
    for (key, value) in &cli.filters {
        params = params.with_filter(key, value);
    }
    source.init(&cli.endpoint, params);

    let result = match cli.selection {
        Selection::First => source.get_first().await,
        Selection::Last => source.fetch().await,
        Selection::Page(number) => {
            // Page bounds come from the total count, which the first fetch reports.
            source.get_first().await?;
            source.get_page(number).await
        }
        Selection::Range(range) => source.get_range(Some(range)).await,
    };

    let mut events = match result {
        Ok(events) => events,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
            std::process::exit(1);
        }
    };
    events.sort_by_key(|e| e.counter);

    for event in &events {
        print_event(event, cli.json_output)?;
    }

    if !cli.json_output {
        eprintln!(
            "{}",
            format!(
                "● {} events | count {} | max counter {}",
                events.len(),
                source.get_count(),
                source.get_max_counter()
            )
            .dimmed()
        );
    }

    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let stdout = event.stdout.as_deref().unwrap_or_default();
    if stdout.is_empty() {
        return Ok(());
    }
    for line in stdout.split("\r\n") {
        println!("{} {}", format!("{:>6}", event.counter).dimmed(), line);
    }
    Ok(())
}
