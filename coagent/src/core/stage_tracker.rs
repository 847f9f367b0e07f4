//! Detection of backend stage transitions.

/// Result of observing the stage reported by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageChange {
    /// Same stage as last time (or no stage reported).
    Unchanged,
    /// Moved into a stage other than the start stage.
    Entered,
    /// Moved into the start stage: a new conversation flow began.
    FlowStart,
}

/// Compare the newly reported stage with the previous one.
///
/// Re-observing the same stage is always `Unchanged`, so repeated snapshots
/// from one stage never trigger a second flow start.
pub fn observe_stage(
    previous: Option<&str>,
    current: Option<&str>,
    start_stage: &str,
) -> StageChange {
    let Some(current) = current else {
        return StageChange::Unchanged;
    };
    if previous == Some(current) {
        return StageChange::Unchanged;
    }
    if current == start_stage {
        StageChange::FlowStart
    } else {
        StageChange::Entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "start_flow";

    #[test]
    fn first_start_stage_is_a_flow_start() {
        assert_eq!(
            observe_stage(None, Some(START), START),
            StageChange::FlowStart
        );
    }

    #[test]
    fn returning_to_start_stage_is_a_flow_start() {
        assert_eq!(
            observe_stage(Some("render_haiku_node"), Some(START), START),
            StageChange::FlowStart
        );
    }

    #[test]
    fn repeated_stage_is_unchanged() {
        assert_eq!(
            observe_stage(Some(START), Some(START), START),
            StageChange::Unchanged
        );
        assert_eq!(
            observe_stage(Some("search_node"), Some("search_node"), START),
            StageChange::Unchanged
        );
    }

    #[test]
    fn missing_stage_is_unchanged() {
        assert_eq!(
            observe_stage(Some("search_node"), None, START),
            StageChange::Unchanged
        );
    }

    #[test]
    fn other_stage_is_entered() {
        assert_eq!(
            observe_stage(Some(START), Some("search_node"), START),
            StageChange::Entered
        );
    }
}
