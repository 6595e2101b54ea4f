use anyhow::Result;
use spindle::HubCache;
use spindle::common::hf_token_from_env;
use std::io::Write;

use super::util::{dir_size, format_bytes};

pub async fn download(model: &str, force: bool, token: Option<String>) -> Result<()> {
    let cache = HubCache::from_env()?.with_auth_token(token.or_else(hf_token_from_env));

    if !force && cache.is_cached(model) {
        println!("Model '{}' is already downloaded.", model);
        println!("  Path: {}", cache.model_dir(model).display());
        println!("Use --force to download it again.");
        return Ok(());
    }

    println!("Cache: {}", cache.root().display());
    println!("Downloading {}...", model);

    let path = cache.get_model(model, force).await?;
    let size = dir_size(&path)?;

    println!();
    println!("✓ Downloaded {} ({})", model, format_bytes(size));
    println!("  Path: {}", path.display());
    println!();
    println!("Run it with:");
    println!("  spindle run -m {} -p \"Hello\"", model);

    Ok(())
}

pub fn list() -> Result<()> {
    let cache = HubCache::from_env()?;
    let models = cache.list_cached()?;

    println!();
    println!("Cache: {}", cache.root().display());

    if models.is_empty() {
        println!("No models cached. Download one with: spindle download -m <org/repo>");
        println!();
        return Ok(());
    }

    println!("Models: {}", models.len());
    println!("{}", "-".repeat(60));

    for model in &models {
        let path = cache.model_dir(model);
        let size = dir_size(&path)?;
        println!("  {:<40} {:>10}", model, format_bytes(size));
    }

    println!();
    Ok(())
}

pub fn delete(model: &str, yes: bool) -> Result<()> {
    let cache = HubCache::from_env()?;
    let model_path = cache.model_dir(model);

    if !model_path.exists() {
        println!("Model '{}' is not downloaded.", model);
        return Ok(());
    }

    let size = dir_size(&model_path)?;
    println!();
    println!("This will delete:");
    println!("  Model: {}", model);
    println!("  Path:  {}", model_path.display());
    println!("  Size:  {}", format_bytes(size));
    println!();

    if !yes {
        print!("Are you sure? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "y" {
            println!("Cancelled.");
            return Ok(());
        }
    }

    cache.delete(model)?;
    println!("✓ Removed {}", model);
    Ok(())
}
