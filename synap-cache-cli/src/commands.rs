use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;
use synap_cache::{Deleter, FileCache, Getter, Setter, mget as batch_get};

type Store = FileCache<String, String>;

fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}

pub fn get(cache: &Store, key: &str) -> Result<String> {
    let value = cache
        .get(&key.to_string())
        .with_context(|| format!("GET {} failed", key))?;
    Ok(match value {
        Some(v) => quoted(&v),
        None => "(nil)".dimmed().to_string(),
    })
}

pub fn set(cache: &Store, key: String, value: String, ttl: Duration) -> Result<String> {
    cache
        .set(key.clone(), value, ttl)
        .with_context(|| format!("SET {} failed", key))?;
    Ok("OK".green().to_string())
}

pub fn mget(cache: &Store, keys: &[String]) -> Result<String> {
    let result = batch_get(cache, keys).context("MGET failed")?;

    let mut lines = Vec::with_capacity(result.len());
    for (i, (_, value)) in result.iter().enumerate() {
        let rendered = match value {
            Some(v) => quoted(v),
            None => "(nil)".dimmed().to_string(),
        };
        lines.push(format!("{}) {}", i + 1, rendered));
    }
    let (hits, misses) = result.hit_miss_keys();
    lines.push(format!("{} hits, {} misses", hits.len(), misses.len()));
    Ok(lines.join("\n"))
}

pub fn del(cache: &Store, keys: &[String]) -> Result<String> {
    cache.delete(keys).context("DEL failed")?;
    Ok("OK".green().to_string())
}

pub fn sweep(cache: &Store) -> Result<String> {
    let removed = cache.sweep_now().context("Sweep failed")?;
    Ok(format!("{} records removed", removed))
}

pub fn purge(cache: &Store) -> Result<String> {
    let removed = cache.purge().context("Purge failed")?;
    Ok(format!("{} records purged", removed).yellow().to_string())
}

pub fn path(cache: &Store, key: &str) -> String {
    cache.path_for(&key.to_string()).display().to_string()
}
