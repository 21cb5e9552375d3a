//! Confirmation guard for destructive operations.
//!
//! Batch reverts and database drops pass through a [`ConfirmPolicy`] before
//! touching anything irreversible. The interactive policy counts down
//! visibly so an operator can abort with Ctrl-C; `Force` answers yes
//! immediately; `Preset` supplies a canned answer so tests never wait.

use std::time::Duration;

use crate::logging::Logger;

/// Default countdown length for interactive confirmations.
pub const COUNTDOWN_SECONDS: u64 = 5;

/// Strategy for confirming a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Warn, then count down for `seconds` before proceeding. Only a process
    /// interrupt can stop it once started.
    Countdown {
        /// Seconds to wait before proceeding.
        seconds: u64,
    },
    /// Proceed immediately without waiting.
    Force,
    /// Answer supplied up front (test harnesses).
    Preset(bool),
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self::Countdown {
            seconds: COUNTDOWN_SECONDS,
        }
    }
}

impl ConfirmPolicy {
    /// Returns the policy matching a `--force` flag: `Force` when set,
    /// the default countdown otherwise.
    #[must_use]
    pub fn from_force_flag(force: bool) -> Self {
        if force {
            Self::Force
        } else {
            Self::default()
        }
    }

    /// Runs the confirmation for `action`, returning whether to proceed.
    pub async fn confirm(&self, logger: &Logger, action: &str) -> bool {
        match self {
            Self::Force => true,
            Self::Preset(answer) => *answer,
            Self::Countdown { seconds } => {
                logger.warn(format!("{action} - press Ctrl-C to abort"));
                for remaining in (1..=*seconds).rev() {
                    logger.info(format!("proceeding in {remaining}s"));
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogMode;

    #[tokio::test]
    async fn force_confirms_without_output() {
        let logger = Logger::new(LogMode::Buffer);
        assert!(ConfirmPolicy::Force.confirm(&logger, "drop db").await);
        assert!(logger.buffered().is_empty());
    }

    #[tokio::test]
    async fn preset_answer_is_returned() {
        let logger = Logger::new(LogMode::Buffer);
        assert!(ConfirmPolicy::Preset(true).confirm(&logger, "drop db").await);
        assert!(!ConfirmPolicy::Preset(false).confirm(&logger, "drop db").await);
    }

    #[tokio::test]
    async fn zero_second_countdown_warns_and_proceeds() {
        let logger = Logger::new(LogMode::Buffer);
        let policy = ConfirmPolicy::Countdown { seconds: 0 };
        assert!(policy.confirm(&logger, "reverting 2 migrations").await);

        let lines = logger.buffered();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("warning: reverting 2 migrations"));
    }

    #[tokio::test]
    async fn countdown_ticks_once_per_second() {
        tokio::time::pause();
        let logger = Logger::new(LogMode::Buffer);
        let policy = ConfirmPolicy::Countdown { seconds: 3 };
        assert!(policy.confirm(&logger, "drop db").await);

        let lines = logger.buffered();
        // One warning plus one tick per second, counting down.
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "proceeding in 3s");
        assert_eq!(lines[3], "proceeding in 1s");
    }

    #[test]
    fn force_flag_selects_policy() {
        assert_eq!(ConfirmPolicy::from_force_flag(true), ConfirmPolicy::Force);
        assert_eq!(
            ConfirmPolicy::from_force_flag(false),
            ConfirmPolicy::Countdown {
                seconds: COUNTDOWN_SECONDS
            }
        );
    }
}
