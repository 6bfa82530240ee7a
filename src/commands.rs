//! Command handlers
//!
//! Each handler receives an explicit [`Context`] and an output sink. Reads go
//! through the response cache when it is enabled; a response is cached only
//! after it decoded and passed the handler's check.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api::models::{
    ConstantsResponse, EditsResponse, PageResponse, SearchResponse, TypeaheadResponse,
};
use crate::api::{decode, ApiCall, ApiClient, ApiError, RequestExecutor, RetryPolicy};
use crate::cache::{CacheError, CacheStore};
use crate::cli::{
    Cli, Command, ConstantsArgs, ConstantsFormat, EditsArgs, EditsBySlugArgs, PageArgs,
    PageFormat, SearchArgs, SearchFormat, TableFormat, TypeaheadArgs, TypeaheadFormat,
};
use crate::config::Config;
use crate::render;

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Generic {
            status: None,
            message: err.to_string(),
        }
    }
}

/// Everything a command needs, built once per process
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    /// `None` when caching is disabled
    pub cache: Option<CacheStore>,
    pub client: ApiClient,
    /// Whether table headers are styled
    pub color: bool,
}

impl Context {
    /// Builds the HTTP client and cache store described by `config`
    pub fn from_config(config: Config, color: bool) -> Result<Self, ApiError> {
        let policy = RetryPolicy::default().with_max_retry_delay(config.max_retry_delay());
        let executor = RequestExecutor::new(&config.api.url)?.with_policy(policy);
        let client = ApiClient::new(executor, config.timeout());
        Ok(Self::new(config, client, color))
    }

    /// Uses a prepared client, e.g. one with a recording sleeper
    pub fn new(config: Config, client: ApiClient, color: bool) -> Self {
        let cache = if config.cache_enabled() {
            Some(CacheStore::new(config.cache_dir(), config.cache_ttl()))
        } else {
            None
        };
        Self {
            config,
            cache,
            client,
            color,
        }
    }

    /// Serves `call` from the cache or the network.
    ///
    /// A cached payload that no longer decodes is dropped and refetched. A
    /// fresh payload is stored only when `keep` accepts it; store failures are
    /// logged and otherwise ignored.
    pub async fn fetch_cached<T, F>(&self, call: &ApiCall, keep: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let key = call.cache_key();

        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(&key) {
                match decode::<T>(call, &bytes) {
                    Ok(value) => {
                        debug!(key = %key, path = call.path, "cache hit");
                        return Ok(value);
                    }
                    Err(err) => {
                        warn!(key = %key, error = %err, "discarding undecodable cache entry");
                        cache.delete(&key);
                    }
                }
            } else {
                debug!(key = %key, path = call.path, "cache miss");
            }
        }

        let body = self.client.fetch_raw(call).await?;
        let value = decode::<T>(call, &body)?;

        if let Some(cache) = &self.cache {
            if keep(&value) {
                if let Err(err) = cache.set(&key, &body) {
                    warn!(key = %key, error = %err, "failed to write cache entry");
                }
            }
        }
        Ok(value)
    }
}

/// Runs the parsed command
pub async fn run(ctx: &Context, command: &Command, out: &mut impl Write) -> Result<(), ApiError> {
    match command {
        Command::Search(args) => search(ctx, args, out).await,
        Command::Page(args) => page(ctx, args, out).await,
        Command::Edits(args) => edits(ctx, args, out).await,
        Command::EditsBySlug(args) => edits_by_slug(ctx, args, out).await,
        Command::Typeahead(args) => typeahead(ctx, args, out).await,
        Command::Constants(args) => constants(ctx, args, out).await,
        Command::Cache { .. } => cache_clear(&ctx.config, out),
        Command::Completion { shell } => completion(*shell, out),
    }
}

pub async fn search(ctx: &Context, args: &SearchArgs, out: &mut impl Write) -> Result<(), ApiError> {
    let defaults = &ctx.config.commands.search;
    let limit = args.limit.unwrap_or(defaults.limit);
    let offset = args.offset.unwrap_or(defaults.offset);

    let call = ApiCall::search(&args.query, limit, offset);
    let results: SearchResponse = ctx.fetch_cached(&call, |_| true).await?;
    info!(query = %args.query, count = results.results.len(), "search complete");

    match args.format {
        SearchFormat::Json => render::write_json(out, &results)?,
        SearchFormat::Markdown => render::search_markdown(out, &results)?,
        SearchFormat::Table => render::search_table(out, &results, ctx.color)?,
    }
    Ok(())
}

pub async fn page(ctx: &Context, args: &PageArgs, out: &mut impl Write) -> Result<(), ApiError> {
    let call = ApiCall::page(&args.slug, args.content, !args.no_links);
    let response: PageResponse = ctx.fetch_cached(&call, |p: &PageResponse| p.found).await?;

    if !response.found {
        return Err(ApiError::not_found(call.resource));
    }

    match args.format {
        PageFormat::Json => render::write_json(out, &response)?,
        PageFormat::Markdown => render::page_markdown(out, &response, args.content)?,
        PageFormat::Plain => render::page_plain(out, &response, args.content)?,
    }
    Ok(())
}

pub async fn edits(ctx: &Context, args: &EditsArgs, out: &mut impl Write) -> Result<(), ApiError> {
    let limit = args.limit.unwrap_or(ctx.config.commands.edits.limit);
    let statuses = args.statuses()?;
    let include_counts = !args.no_counts;

    let call = ApiCall::edits(limit, &statuses, &args.exclude_users, include_counts);
    let results: EditsResponse = ctx.fetch_cached(&call, |_| true).await?;

    match args.format {
        TableFormat::Json => render::write_json(out, &results)?,
        TableFormat::Table => render::edits_table(out, &results, true, include_counts, ctx.color)?,
    }
    Ok(())
}

pub async fn edits_by_slug(
    ctx: &Context,
    args: &EditsBySlugArgs,
    out: &mut impl Write,
) -> Result<(), ApiError> {
    let limit = args.limit.unwrap_or(ctx.config.commands.edits.limit);
    let call = ApiCall::edits_by_slug(&args.slug, limit, args.offset);
    let results: EditsResponse = ctx.fetch_cached(&call, |_| true).await?;

    match args.format {
        TableFormat::Json => render::write_json(out, &results)?,
        TableFormat::Table => render::edits_table(out, &results, false, true, ctx.color)?,
    }
    Ok(())
}

pub async fn typeahead(
    ctx: &Context,
    args: &TypeaheadArgs,
    out: &mut impl Write,
) -> Result<(), ApiError> {
    let call = ApiCall::typeahead(&args.query, args.limit);
    let results: TypeaheadResponse = ctx.fetch_cached(&call, |_| true).await?;

    match args.format {
        TypeaheadFormat::Json => render::write_json(out, &results)?,
        TypeaheadFormat::List => render::typeahead_list(out, &results)?,
    }
    Ok(())
}

pub async fn constants(
    ctx: &Context,
    args: &ConstantsArgs,
    out: &mut impl Write,
) -> Result<(), ApiError> {
    let call = ApiCall::constants();
    let mut results: ConstantsResponse = ctx.fetch_cached(&call, |_| true).await?;

    if let Some(key) = &args.key {
        let value = results
            .remove(key)
            .ok_or_else(|| ApiError::not_found(format!("constant '{}'", key)))?;
        results = ConstantsResponse::from([(key.clone(), value)]);
    }

    match args.format {
        ConstantsFormat::Json => render::write_json(out, &results)?,
        ConstantsFormat::Yaml => render::write_yaml(out, &results)?,
        ConstantsFormat::Table => render::constants_table(out, &results, ctx.color)?,
    }
    Ok(())
}

/// Empties the configured cache directory, even when caching is disabled
pub fn cache_clear(config: &Config, out: &mut impl Write) -> Result<(), ApiError> {
    let dir = config.cache_dir();
    CacheStore::new(&dir, config.cache_ttl()).clear()?;
    info!(dir = %dir.display(), "cache cleared");
    writeln!(out, "Cache cleared: {}", dir.display())?;
    Ok(())
}

pub fn completion(shell: Shell, out: &mut impl Write) -> Result<(), ApiError> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "grokipedia", out);
    Ok(())
}
