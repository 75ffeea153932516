//! `reverie status`: show the saved session state.

use reverie_agent::{BehaviorState, describe};
use reverie_config::AppConfig;
use reverie_memory::{BeliefTable, StateFile};

/// Beliefs listed in the status output.
const SHOWN_BELIEFS: usize = 5;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state_file = StateFile::new(config.memory.state_path());

    println!("Reverie Status");
    println!("==============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  State file:   {}", state_file.path().display());
    println!("  Generator:    {} ({})", config.generator.url, config.generator.model);
    println!(
        "  Reflection:   {}",
        if config.reflection.enabled {
            format!("every {}s", config.reflection.interval_secs)
        } else {
            "disabled".to_string()
        }
    );

    let state = match state_file.load() {
        Ok(Some(state)) => state,
        Ok(None) => {
            println!("\n  ⚠️  No saved session yet. Run `reverie run` first.");
            return Ok(());
        }
        Err(e) => {
            println!("\n  ⚠️  Saved session is unreadable: {e}");
            println!("     The next `reverie run` will start fresh.");
            return Ok(());
        }
    };

    let mood = state.mood_vector;
    let beliefs = BeliefTable::from_entries(
        state.belief_table.clone(),
        config.memory.max_beliefs,
        config.memory.belief_threshold,
    );

    println!("\n  Session:      {}", state.session_id);
    println!("  Started:      {}", state.session_start.to_rfc3339());
    if let Some(saved) = state.saved_at {
        println!("  Saved:        {}", saved.to_rfc3339());
    }
    println!("  Cycles:       {}", state.processed_cycles);
    println!(
        "  Mood:         valence {:+.2}, arousal {:+.2}, clarity {:+.2}",
        mood.valence, mood.arousal, mood.clarity
    );
    println!("  Feeling:      {}", describe(&mood));
    println!("  Behaviour:    {}", BehaviorState::from_mood(&mood));
    println!("  Identity:     {}", state.self_model.identity_summary());
    println!("  Observations: {}", state.observations.len());
    match state.last_reflection_timestamp {
        Some(at) => println!("  Reflected:    {}", at.to_rfc3339()),
        None => println!("  Reflected:    never"),
    }

    let strongest = beliefs.strongest(SHOWN_BELIEFS);
    if strongest.is_empty() {
        println!("\n  No beliefs formed yet.");
    } else {
        println!("\n  Strongest beliefs:");
        for (motif, strength) in strongest {
            println!("    {strength:.2}  {motif}");
        }
    }

    Ok(())
}
