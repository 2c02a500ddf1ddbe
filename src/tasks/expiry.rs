use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::api::attempts::record_attempt;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::SessionStatus;
use crate::repositories;
use crate::services::grading;

const SWEEP_BATCH: i64 = 100;

/// Closes sessions whose deadline passed and records their drafts as
/// auto-submitted attempts. This is the server-side backstop for students
/// who close the tab instead of submitting.
pub(crate) async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(Duration::from_secs(state.settings().exam().sweep_interval_seconds));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = sweep_once(&state).await {
                    tracing::error!(error = %err, "Session expiry sweep failed");
                }
            }
        }
    }
}

/// One sweep pass. Each overdue session's attempt is recorded before the
/// session is flipped to expired; a failure leaves the session active, so
/// the next pass picks it up again and the attempt insert no-ops on
/// conflict.
pub(crate) async fn sweep_once(state: &AppState) -> anyhow::Result<usize> {
    let now = primitive_now_utc();
    let grace = state.settings().exam().submit_grace_seconds;

    let overdue = repositories::sessions::find_expired(state.db(), now, grace, SWEEP_BATCH).await?;
    let mut swept = 0usize;

    for session in overdue {
        let Some(student) =
            repositories::students::find_by_id(state.db(), &session.student_id).await?
        else {
            tracing::warn!(session_id = %session.id, "Expired session has no student, closing");
            repositories::sessions::claim_for_submit(
                state.db(),
                &session.id,
                SessionStatus::Expired,
                now,
            )
            .await?;
            continue;
        };

        let answers: Vec<grading::SubmittedAnswer> = session
            .answers
            .0
            .iter()
            .map(|(question_id, value)| grading::SubmittedAnswer {
                question_id: question_id.clone(),
                value: value.clone(),
            })
            .collect();

        match record_attempt(state, &session, &student, answers, true, now).await {
            Ok(attempt) => {
                repositories::sessions::claim_for_submit(
                    state.db(),
                    &session.id,
                    SessionStatus::Expired,
                    now,
                )
                .await?;
                swept += 1;
                tracing::info!(
                    session_id = %session.id,
                    attempt_id = %attempt.id,
                    percent = attempt.percent,
                    "Expired session auto-submitted"
                );
            }
            Err(err) => {
                tracing::error!(
                    session_id = %session.id,
                    error = ?err,
                    "Failed to record attempt for expired session, will retry"
                );
            }
        }
    }

    if swept > 0 {
        metrics::counter!("exam_sessions_expired_total").increment(swept as u64);
    }

    Ok(swept)
}
