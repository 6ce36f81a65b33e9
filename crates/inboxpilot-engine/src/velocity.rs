//! Velocity: executed actions per minute over recent history.

use crate::aggregate::ProcessedResult;

/// Default number of recent results averaged over.
pub const DEFAULT_WINDOW: usize = 5;

/// `60 / average action runtime` over the first `window` results, rounded to
/// one decimal.
///
/// `recent` must be ordered most recent first.  Returns 0 when the window is
/// empty or holds no actions.
pub fn velocity<'a, I>(recent: I, window: usize) -> f64
where
    I: IntoIterator<Item = &'a ProcessedResult>,
{
    let (total_secs, count) = recent
        .into_iter()
        .take(window)
        .flat_map(|result| result.executed_actions.iter())
        .fold((0.0_f64, 0_usize), |(secs, n), action| {
            (secs + action.runtime_secs, n + 1)
        });

    if count == 0 || total_secs <= 0.0 {
        return 0.0;
    }

    let average = total_secs / count as f64;
    (60.0 / average * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::aggregate::aggregate;
    use crate::executor::ExecutedAction;
    use crate::matcher::WorkflowMatch;
    use crate::message::Message;
    use crate::workflow::ActionKind;

    fn result_with_runtimes(id: &str, runtimes: &[f64]) -> ProcessedResult {
        let message = Arc::new(Message::new(id, "s", "a@b.c", Utc::now()));
        let matches = vec![WorkflowMatch {
            workflow_id: "wf".into(),
            workflow_name: "WF".into(),
            score: 1,
            max_score: 1,
            autopilot: true,
            sla_minutes: 0,
        }];
        let actions = runtimes
            .iter()
            .map(|secs| ExecutedAction {
                id: Uuid::now_v7(),
                message_id: id.into(),
                workflow_id: "wf".into(),
                kind: ActionKind::Analysis,
                summary: "x".into(),
                detail: String::new(),
                runtime_secs: *secs,
            })
            .collect();
        aggregate(message, matches, actions, Utc::now()).unwrap()
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(velocity(&Vec::<ProcessedResult>::new(), DEFAULT_WINDOW), 0.0);
    }

    #[test]
    fn history_without_actions_is_zero() {
        let history = vec![result_with_runtimes("m-1", &[])];
        assert_eq!(velocity(&history, DEFAULT_WINDOW), 0.0);
    }

    #[test]
    fn averages_across_results() {
        // Average runtime 2.5s -> 24 runs per minute.
        let history = vec![
            result_with_runtimes("m-1", &[2.0, 3.0]),
            result_with_runtimes("m-2", &[2.5]),
        ];
        assert_eq!(velocity(&history, DEFAULT_WINDOW), 24.0);
    }

    #[test]
    fn rounds_to_one_decimal() {
        // 60 / 7 = 8.571...
        let history = vec![result_with_runtimes("m-1", &[7.0])];
        assert_eq!(velocity(&history, DEFAULT_WINDOW), 8.6);
    }

    #[test]
    fn only_window_is_considered() {
        let history = vec![
            result_with_runtimes("new", &[1.0]),
            result_with_runtimes("old", &[59.0]),
        ];
        assert_eq!(velocity(&history, 1), 60.0);
        assert_eq!(velocity(&history, 2), 2.0);
    }
}
