use glam::Vec2;
use judgeline::config::{self, CONFIG_PATH};
use judgeline::core::clock::{Clock, ManualClock, WallClock};
use judgeline::core::space::Viewport;
use judgeline::game::chart::Chart;
use judgeline::game::judgment::{JudgeGrade, TapEvent};
use judgeline::game::parsing::chart_json::load_chart;
use judgeline::game::session::{GameSession, SessionOptions, SessionStatus, Tally};
use judgeline::game::timing::evaluate;
use std::time::{Duration, Instant};

const DEFAULT_CHART_PATH: &str = "chart.json";
// Time the autoplay run keeps going after the last note ends.
const TAIL_S: f32 = 1.0;

/// One perfect tap per note: at its time plus `offset_s`, on the spot where the
/// note meets its line at that moment.
fn autoplay_taps(chart: &Chart, viewport: &Viewport, offset_s: f32) -> Vec<TapEvent> {
    let mut taps: Vec<TapEvent> = chart
        .lines
        .iter()
        .flat_map(|line| {
            line.notes.iter().map(move |note| {
                let time = line.note_time_seconds(note) + offset_s;
                let frame = evaluate(line, time, viewport);
                let local = Vec2::new(note.x_position * viewport.x_scale(), 0.0);
                let p = frame.to_screen(local);
                TapEvent::new(p.x, p.y, time)
            })
        })
        .collect();
    taps.sort_by(|a, b| a.time.total_cmp(&b.time));
    taps
}

/// Feeds taps as the clock reaches them until the session finishes. `tick`
/// moves time forward between frames.
fn run_autoplay<C, F>(mut session: GameSession<C>, taps: Vec<TapEvent>, mut tick: F) -> (Tally, usize)
where
    C: Clock,
    F: FnMut(&mut C),
{
    let sender = session.tap_sender();
    let mut pending = taps.into_iter().peekable();
    let mut frames = 0usize;
    loop {
        let now = session.clock().position_seconds();
        while let Some(tap) = pending.next_if(|t| t.time <= now) {
            sender.send(tap);
        }
        let status = session.update();
        frames += 1;
        for judgment in session.drain_judgments() {
            if judgment.grade() == JudgeGrade::Miss {
                log::debug!("Autoplay missed: {judgment:?}");
            }
        }
        if status == SessionStatus::Finished {
            break;
        }
        tick(session.clock_mut());
    }
    (session.tally(), frames)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let cfg = config::load(CONFIG_PATH);
    log::set_max_level(cfg.log_level.as_level_filter());

    let chart_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CHART_PATH.to_string());
    let chart = match load_chart(&chart_path) {
        Ok(chart) => chart,
        Err(e) => {
            log::error!("Failed to load chart '{chart_path}': {e}");
            return Err(e.into());
        }
    };

    let taps = autoplay_taps(&chart, &cfg.viewport, cfg.autoplay_offset_s);
    let length_s = chart.last_note_seconds() + TAIL_S;
    let options = SessionOptions {
        windows: cfg.windows,
        auto_miss: cfg.auto_miss,
    };
    let step = 1.0 / cfg.frame_rate;

    let started = Instant::now();
    let (tally, frames) = if cfg.realtime {
        log::info!("Autoplay in real time over {length_s:.2}s.");
        let clock = WallClock::start(1.0, Some(Duration::from_secs_f32(length_s)));
        let session = GameSession::new(chart, clock, cfg.viewport, options);
        run_autoplay(session, taps, |_| std::thread::sleep(Duration::from_secs_f32(step)))
    } else {
        let clock = ManualClock::new(length_s);
        log::info!("Autoplay stepped over {:.2}s.", clock.length_seconds());
        let session = GameSession::new(chart, clock, cfg.viewport, options);
        run_autoplay(session, taps, |clock| clock.advance(step))
    };

    log::info!(
        "Autoplay finished in {:.2}ms over {frames} frames. Perfect: {}, Good: {}, Bad: {}, Miss: {}, Unjudged: {}, Empty taps: {}",
        started.elapsed().as_secs_f64() * 1000.0,
        tally.perfect,
        tally.good,
        tally.bad,
        tally.miss,
        tally.unjudged,
        tally.empty_taps
    );
    Ok(())
}
