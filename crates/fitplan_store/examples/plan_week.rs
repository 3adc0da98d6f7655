use chrono::Days;
use fitplan_store::config::Config;
use fitplan_store::utils::{parse_calendar_date, today, week_bounds};
use fitplan_store::{CalendarIndex, Macros, NewExercise, PlanningStore};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure logging from env var `FITPLAN_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("FITPLAN_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();

    // `FITPLAN_DATE` overrides the selected day, e.g. `2024-03-01`.
    let selected = std::env::var("FITPLAN_DATE")
        .ok()
        .and_then(|raw| parse_calendar_date(&raw))
        .unwrap_or_else(today);

    let cfg = Config::from_env()?;
    tracing::info!(data_dir = %cfg.data_dir.display(), "plan_week: opening store");
    let store = PlanningStore::open_with_config(&cfg).await?;

    let split = match store.current_split().await {
        Some(split) => split,
        None => {
            let split = store
                .create_split("Push Pull Legs", "Three day rotation")
                .await?;
            for (name, lifts) in [
                ("Push Day", [("Bench Press", 60.0), ("Overhead Press", 40.0)]),
                ("Pull Day", [("Barbell Row", 55.0), ("Pull Up", 0.0)]),
                ("Leg Day", [("Back Squat", 90.0), ("Romanian Deadlift", 80.0)]),
            ] {
                let workout = store.add_workout(&split.id, name).await?;
                for (lift, weight) in lifts {
                    store
                        .add_exercise(&split.id, &workout.id, NewExercise::new(lift, 4, 8, weight))
                        .await?;
                }
            }
            store.set_current_split(&split.id).await?
        }
    };

    let (monday, _) = week_bounds(selected);
    for (offset, workout) in [0u64, 2, 4].into_iter().zip(&split.workouts) {
        if let Some(date) = monday.checked_add_days(Days::new(offset)) {
            store.schedule_workout(date, &workout.id).await?;
        }
    }
    store
        .add_macro_entry(selected, Macros::new(150.0, 220.0, 60.0, 2020.0))
        .await?;

    let index = CalendarIndex::new(selected).with_palette(cfg.palette.clone());
    println!(
        "week of {} (done={} pending={})",
        index.selected(),
        index.palette().success,
        index.palette().pending
    );
    for (date, marker) in store.workout_calendar(&index).await {
        let name = match store.scheduled_workout(date).await {
            Some(scheduled) => scheduled
                .workout
                .map(|w| w.name)
                .unwrap_or_else(|| "(deleted workout)".to_string()),
            None => "-".to_string(),
        };
        println!(
            "{date} {:<20} marker={:<8} selected={}",
            name,
            marker.marker_color.unwrap_or_default(),
            marker.is_selected
        );
    }
    println!(
        "completed this week: {}",
        store.completed_workouts_in_week(index.selected()).await
    );
    Ok(())
}
