use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gamefinder_core::{codec, ClientPager, Facet, Game, PageRequest, SearchPage, TagCatalog};
use gamefinder_engine::elastic::DEFAULT_GAME_INDEX;
use gamefinder_engine::{ElasticEngine, SearchEngine};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "gamefinder")]
#[command(about = "Board game catalog search client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Page through /api/search with URL-style filters, e.g. "sort=rating&players=4".
    Search {
        #[arg(default_value = "")]
        filters: String,
        #[arg(long, default_value = "http://localhost:8080")]
        api: String,
        /// Stop after this many pages even if more results exist.
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the mechanics and themes vocabularies.
    Tags {
        #[arg(long, default_value = "http://localhost:8080")]
        api: String,
    },
    /// Run a raw query_string search directly against Elasticsearch.
    Query {
        query: String,
        #[arg(long, env = "ELASTICSEARCH_ENDPOINT")]
        connection: String,
        #[arg(long, default_value = DEFAULT_GAME_INDEX)]
        index: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn api_url(api: &str, path: &str) -> Result<url::Url> {
    let base = url::Url::parse(api).with_context(|| format!("invalid api url {:?}", api))?;
    Ok(base.join(path)?)
}

async fn fetch_page(
    client: &reqwest::Client,
    api: &str,
    req: &PageRequest,
) -> Result<SearchPage<Game>> {
    let mut url = api_url(api, "/api/search")?;
    let query = req.query_string();
    url.set_query((!query.is_empty()).then_some(query.as_str()));
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("search failed with {}: {}", status, body);
    }
    Ok(resp.json().await?)
}

async fn search(filters: &str, api: &str, pages: usize, json: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut pager: ClientPager<Game> = ClientPager::new(codec::decode(filters));
    let mut request = Some(pager.start());
    let mut loaded = 0;
    while let Some(req) = request.take() {
        let result = fetch_page(&client, api, &req).await;
        pager.complete(req.generation, result.map_err(|e| format!("{:#}", e)));
        if let Some(err) = pager.last_error() {
            bail!("{}", err);
        }
        loaded += 1;
        if loaded < pages {
            request = pager.load_more();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(pager.hits())?);
        return Ok(());
    }
    let total = pager.total().map(|t| t.value).unwrap_or_default();
    for (i, game) in pager.hits().iter().enumerate() {
        let weight = game
            .weight
            .map(|w| format!("{:.2}", w))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}/{} #{:<6} {:<40} rating {:.2}  weight {}",
            i + 1,
            total,
            game.rank,
            game.name,
            game.rating,
            weight
        );
    }
    if !pager.cursor().is_empty() {
        eprintln!("state: {:?}, cursor: {}", pager.state(), pager.cursor().join(","));
    }
    Ok(())
}

async fn tags(api: &str) -> Result<()> {
    let resp = reqwest::get(api_url(api, "/api/tags")?).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("tags failed with {}", status);
    }
    let catalog: TagCatalog = resp.json().await?;
    for facet in Facet::ALL {
        let tags = catalog.get(facet);
        println!("{} ({}):", facet, tags.len());
        for tag in tags {
            println!("\t{}\t{}", tag.id, tag.name);
        }
    }
    Ok(())
}

async fn query(query: &str, connection: &str, index: &str, offset: usize, limit: usize) -> Result<()> {
    let engine = ElasticEngine::new(connection, index, Duration::from_secs(30))?;
    let page = engine.query_string(query, offset, limit).await?;
    for (i, hit) in page.hits.iter().enumerate() {
        if i != 0 {
            println!();
        }
        println!("Hit {}/{}:", i + 1 + offset, page.total.value);
        if let serde_json::Value::Object(fields) = serde_json::to_value(&hit.game)? {
            for (key, value) in fields {
                println!("\t{}: {}", key, value);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Search {
            filters,
            api,
            pages,
            json,
        } => search(&filters, &api, pages.max(1), json).await,
        Cmd::Tags { api } => tags(&api).await,
        Cmd::Query {
            query: q,
            connection,
            index,
            offset,
            limit,
        } => query(&q, &connection, &index, offset, limit).await,
    }
}
