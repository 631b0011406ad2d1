//! Terminal viewer: prints the leaderboard and the current match on every snapshot.

use clash_back::client::{CommandClient, MirrorState, SnapshotMirror, run_sync};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = CommandClient::from_env();
    let mirror = SnapshotMirror::new();
    println!("watching {}", client.base_url());

    let sync = tokio::spawn(run_sync(client, mirror.clone()));
    let mut updates = WatchStream::new(mirror.subscribe());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.next() => match update {
                Some(state) => render(&state),
                None => break,
            },
        }
    }

    sync.abort();
    Ok(())
}

fn render(state: &MirrorState) {
    let status = if state.connected { "connected" } else { "offline" };
    let Some(snapshot) = state.snapshot.as_deref() else {
        println!("[{status}] waiting for the first snapshot");
        return;
    };

    println!();
    println!("[{status}] leaderboard");
    for (rank, team) in state.sorted_leaderboard().iter().enumerate() {
        println!("{:>2}. {:<28} {:>3}", rank + 1, team.name, team.score);
    }

    let name = |team: &Option<clash_back::state::tournament::Team>| {
        team.as_ref().map_or("TBD".to_string(), |team| team.name.clone())
    };
    match state.current_match() {
        Some(game) => println!(
            "now playing {}: {} {} - {} {} (round {} of {})",
            game.label.as_deref().unwrap_or(&game.id),
            name(&game.team_a),
            game.score.team_a,
            game.score.team_b,
            name(&game.team_b),
            game.score.current_challenge,
            game.score.best_of,
        ),
        None => match state.next_match_to_start() {
            Some(game) => println!("up next: {}", game.label.as_deref().unwrap_or(&game.id)),
            None => println!("no match on screen"),
        },
    }

    if let Some((challenge, seconds)) = state.current_challenge() {
        println!("challenge ({}, {seconds}s): {}", challenge.theme, challenge.prompt);
    }

    if state.is_complete() {
        let champion = snapshot
            .champion_id
            .as_deref()
            .and_then(|id| snapshot.leaderboard.iter().find(|team| team.id == id))
            .map_or("unknown", |team| team.name.as_str());
        println!("tournament complete; champion: {champion}");
    }
    if let Some(cue) = &state.last_sfx {
        println!("last cue #{}: {}", cue.sequence, cue.event);
    }
}
