use anyhow::Result;
use log::info;
use spindle::common::hf_token_from_env;
use spindle::hub::is_repo_id;
use spindle::{Engine, GenerationOverrides, HubCache, ModelResolver};
use spindle_cli::{RunArgs, sampling_enabled};
use std::path::Path;

use super::util::{print_generation, resolve_input};

pub async fn run(args: RunArgs) -> Result<()> {
    let prompt = resolve_input(args.prompt.as_deref())?;

    let token = args.token.clone().or_else(hf_token_from_env);
    let cache = HubCache::from_env()?.with_auth_token(token);
    let resolver = ModelResolver::new(cache);

    if !args.quiet {
        let needs_download = is_repo_id(&args.model)
            && !Path::new(&args.model).exists()
            && (args.force_download || !resolver.is_available(&args.model));
        if needs_download {
            eprintln!(
                "Downloading '{}' into {}...",
                args.model,
                resolver.cache().root().display()
            );
        }
        eprintln!("Loading model '{}'...", args.model);
    }
    let model_config = resolver.resolve(&args.model, args.force_download).await?;

    let mut engine = Engine::new();
    engine.load_model(&model_config)?;

    if let Some(model) = engine.model_info() {
        info!(
            "Loaded {} ({}, vocab {}, context {})",
            model.name, model.format, model.vocab_size, model.context_length
        );
    }

    let config = engine.generation_config(&runtime_overrides(&args))?;
    print_generation(&engine, &prompt, &config, args.stream, args.quiet)
}

/// Command-line values always win over the model's `generation_config.json`.
fn runtime_overrides(args: &RunArgs) -> GenerationOverrides {
    GenerationOverrides {
        temperature: Some(args.temperature),
        top_k: Some(args.top_k),
        top_p: Some(args.top_p),
        max_new_tokens: Some(args.max_tokens),
        do_sample: Some(sampling_enabled(args.temperature, args.greedy)),
        seed: u64::try_from(args.seed).ok(),
        stop_sequence: args.stop.clone(),
    }
}
