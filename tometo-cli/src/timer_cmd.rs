use anyhow::Result;
use std::io::Write;
use std::time::Duration;
use tometo_core::{PhaseComplete, PomodoroTimer, TimerSettings};

/// Run the timer for `phases` consecutive phases, one tick per second.
/// Ctrl-C stops early and still prints the summary.
pub async fn run(settings: TimerSettings, phases: u32) -> Result<()> {
    let mut timer = PomodoroTimer::new(settings);
    let mut done = 0u32;

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately.
    interval.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    timer.start();
    render(&timer)?;

    while done < phases.max(1) {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                tracing::debug!(phase = %timer.phase(), remaining = timer.remaining_secs(), "timer interrupted");
                break;
            }
            _ = interval.tick() => {
                if let Some(complete) = timer.tick() {
                    done += 1;
                    announce(&complete);
                    if done < phases {
                        timer.start();
                    }
                }
                if timer.is_running() {
                    render(&timer)?;
                }
            }
        }
    }

    println!(
        "{} work session(s) completed, {} focus minute(s)",
        timer.session_count(),
        timer.focus_minutes()
    );
    Ok(())
}

fn render(timer: &PomodoroTimer) -> Result<()> {
    let mut out = std::io::stdout().lock();
    write!(
        out,
        "\r{:<11} {}  {:>3.0}%",
        timer.phase(),
        timer.format_remaining(),
        timer.progress()
    )?;
    out.flush()?;
    Ok(())
}

fn announce(complete: &PhaseComplete) {
    println!();
    if complete.finished.is_break() {
        println!("{} over. Back to work.", complete.finished);
    } else {
        println!(
            "Session {} done. Time for a {}.",
            complete.session_count,
            complete.next.to_string().to_lowercase()
        );
    }
    tracing::info!(
        finished = %complete.finished,
        next = %complete.next,
        sessions = complete.session_count,
        "phase complete"
    );
}
