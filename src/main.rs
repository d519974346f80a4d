use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use swarm_duel::game::constants::TEAM_COUNT;
use swarm_duel::game::events::{FlashEvent, FlashSpeed};
use swarm_duel::util::vec2::Vec2;
use swarm_duel::{Battle, FrameBuffer, MatchConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Swarm Duel v{}", env!("CARGO_PKG_VERSION"));

    let config = MatchConfig::load_or_default();
    info!(
        "Configuration loaded: logic={}Hz render={}Hz cap={} seed={:?}",
        config.logic_hz, config.render_hz, config.swarm.population_cap, config.seed
    );

    // Flash effects are drained off the logic thread
    let (effects_tx, effects_rx) = crossbeam_channel::unbounded::<FlashEvent>();
    let effects_thread = thread::Builder::new()
        .name("effects".into())
        .spawn(move || {
            let (mut slow, mut fast) = (0usize, 0usize);
            for event in effects_rx {
                match event.speed {
                    FlashSpeed::Slow => slow += 1,
                    FlashSpeed::Fast => fast += 1,
                }
            }
            (slow, fast)
        })?;

    let mut battle = Battle::new(&config, effects_tx)?;
    for team in 0..TEAM_COUNT {
        // Bring the homes toward each other so the swarms meet
        let home = config.teams[team].home;
        battle.set_destination(team, Vec2::new(home.x * 0.3, home.y));
    }

    let frames = FrameBuffer::new();
    let mut logic = tokio::time::interval(Duration::from_secs_f64(1.0 / config.logic_hz as f64));
    let mut render = tokio::time::interval(Duration::from_secs_f64(1.0 / config.render_hz as f64));
    let status_every = u64::from(config.logic_hz.max(1));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = logic.tick() => {
                let report = battle.tick();
                if report.tick % status_every == 0 {
                    let [red, blue] = battle.populations();
                    info!(
                        "tick {}: populations {} / {}, losses {} / {}",
                        report.tick,
                        red,
                        blue,
                        battle.losses(0),
                        battle.losses(1)
                    );
                }
                if let Some(team) = battle.eliminated() {
                    info!("{} has no particles left", config.teams[team].name);
                    break;
                }
                if config.max_ticks.is_some_and(|max| report.tick >= max) {
                    info!("Tick limit reached");
                    break;
                }
            }
            _ = render.tick() => {
                frames.publish(battle.frame());
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    frames.publish(battle.frame());
    match battle.leader() {
        Some(team) => info!("{} leads after {} ticks", config.teams[team].name, battle.tick_count()),
        None => info!("Draw after {} ticks", battle.tick_count()),
    }
    for team in 0..TEAM_COUNT {
        info!("{} lost {} particles", config.teams[team].name, battle.losses(team));
    }

    // Dropping the battle closes the effects channel
    drop(battle);
    match effects_thread.join() {
        Ok((slow, fast)) => info!("Flashes: {} slow, {} fast", slow, fast),
        Err(_) => warn!("Effects thread panicked"),
    }

    Ok(())
}
