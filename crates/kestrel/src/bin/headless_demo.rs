//! # Headless Demo
//!
//! Builds a settings menu from TOML, drives it for two seconds of simulated
//! frames with scripted pointer input and a remote config reply, then
//! prints the resulting state and frame statistics.
//!
//! Run with: `cargo run --bin headless_demo [engine.toml]`

use std::collections::HashMap;
use std::process::ExitCode;

use kestrel::shared::Vec2;
use kestrel::ui::{Color, Handlers, Hsv, NodeId, NodeKind, PointerId, RectArea, SceneDescription};
use kestrel::{
    Engine, EngineConfig, EngineResult, MemorySpriteRepository, StaticRemoteConfig, Value,
};

const MENU: &str = r#"
[[nodes]]
name = "settings"
kind = "container"
flow = "top_to_bottom"
spacing = 4.0
sorting_order = 10

[[nodes.children]]
name = "music"
kind = "toggle"
sprite = "switch"
toggled = true
size = { x = 120.0, y = 40.0 }

[[nodes.children]]
name = "effects"
kind = "toggle"
sprite = "switch"
size = { x = 120.0, y = 40.0 }

[[nodes.children]]
name = "vibration"
kind = "toggle"
sprite = "switch_large"
size = { x = 120.0, y = 40.0 }

[[nodes.children.animations]]
duration = 0.4
easing = "back_out"
property = "scale"
from = { x = 0.0, y = 0.0 }
to = { x = 1.0, y = 1.0 }
"#;

const FRAMES: u64 = 120;
const DT: f32 = 1.0 / 60.0;

fn run(config: EngineConfig) -> EngineResult<()> {
    // "switch_large" is deliberately absent.
    let sprites = MemorySpriteRepository::new().with("switch");
    let mut engine = Engine::new(config)?.with_sprites(sprites);
    engine.on_failure(|error| println!("  collaborator failure: {error}"));
    engine.on_remote_config(|scene, values| {
        let Some(accent) = values.get("accent_hue").and_then(Value::as_f64) else {
            return Ok(());
        };
        let color = Hsv::new(accent as f32, 0.6, 0.9, 1.0).to_rgb();
        for root in scene.roots().to_vec() {
            scene.set_color(root, color)?;
        }
        Ok(())
    });

    let description = SceneDescription::from_toml_str(MENU)?;
    let roots = engine.build(None, &description)?;
    let toggles: Vec<NodeId> = roots
        .iter()
        .flat_map(|root| engine.scene().children(*root).map(<[NodeId]>::to_vec))
        .flatten()
        .filter(|id| engine.scene().node(*id).is_some_and(|n| n.kind() == NodeKind::Toggle))
        .collect();
    for id in &toggles {
        engine.register(*id, RectArea::new(), Handlers::toggle())?;
    }

    let remote = StaticRemoteConfig::new(HashMap::from([(
        "accent_hue".to_owned(),
        Value::Float(200.0),
    )]));
    engine.fetch_remote_config(&remote, &["accent_hue".to_owned()]);

    let pointer = PointerId::PRIMARY;
    for frame in 0..FRAMES {
        match frame {
            // Click "effects".
            30 => {
                let at = engine.scene().world_position(toggles[1])?;
                engine.pointer_down(pointer, at)?;
                engine.pointer_up(pointer, at)?;
            }
            // Drag across "music": no toggle.
            60 => {
                let at = engine.scene().world_position(toggles[0])?;
                engine.pointer_down(pointer, at)?;
                engine.pointer_move(pointer, at + Vec2::new(40.0, 0.0))?;
            }
            61 => {
                let at = engine.scene().world_position(toggles[0])?;
                engine.pointer_up(pointer, at + Vec2::new(40.0, 0.0))?;
            }
            _ => {}
        }
        engine.frame(DT)?;
    }

    println!();
    println!("┌─ SCENE ─────────────────────────────────────────────────────────┐");
    for id in engine.scene().iter_dfs() {
        let Some(node) = engine.scene().node(id) else {
            continue;
        };
        let sprite = node
            .sprite()
            .map_or("-".to_owned(), |s| match s.handle {
                Some(h) => format!("{} ({})", s.name, h.0),
                None => format!("{} (unresolved)", s.name),
            });
        println!(
            "│ {:<10} {:?} toggled={} order={} sprite={}",
            node.name(),
            node.kind(),
            node.is_toggled(),
            node.effective_sorting_order(),
            sprite
        );
    }
    println!("└─────────────────────────────────────────────────────────────────┘");

    let tint: Color = engine
        .scene()
        .node(roots[0])
        .map(|n| n.color())
        .unwrap_or_default();
    let stats = engine.stats();
    println!();
    println!("┌─ FRAMES ────────────────────────────────────────────────────────┐");
    println!("│ Frames:        {}", stats.frames_recorded);
    println!("│ Fixed steps:   {}", stats.fixed_steps);
    println!("│ Average frame: {:.3} ms", stats.avg_frame_ms());
    println!("│ Over budget:   {:.1}%", stats.over_budget_ratio() * 100.0);
    println!("│ Menu tint:     {tint:?}");
    println!("└─────────────────────────────────────────────────────────────────┘");
    Ok(())
}

fn main() -> ExitCode {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                     KESTREL HEADLESS DEMO                        ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path),
        None => Ok(EngineConfig::default()),
    };
    match config.and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("headless demo failed: {error}");
            ExitCode::FAILURE
        }
    }
}
