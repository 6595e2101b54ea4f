use anyhow::Result;
use spindle::{Engine, GenerationOverrides};
use spindle_cli::{MockArgs, sampling_enabled};

use super::util::{print_generation, resolve_input};

pub fn run(args: MockArgs) -> Result<()> {
    let prompt = resolve_input(args.prompt.as_deref())?;
    let seed = u64::try_from(args.seed).ok();

    let engine = match seed {
        Some(seed) => Engine::mock_seeded(args.vocab_size, args.context_length, seed),
        None => Engine::mock(args.vocab_size, args.context_length),
    };

    let overrides = GenerationOverrides {
        temperature: Some(args.temperature),
        max_new_tokens: Some(args.max_tokens),
        do_sample: Some(sampling_enabled(args.temperature, false)),
        seed,
        ..Default::default()
    };
    let config = engine.generation_config(&overrides)?;

    if !args.quiet {
        eprintln!(
            "Mock model: vocab {}, context {}",
            args.vocab_size, args.context_length
        );
    }
    print_generation(&engine, &prompt, &config, args.stream, args.quiet)
}
