//! Error handling and exit codes.

use mettool_core::constants::exit_codes;
use mettool_core::{EngineError, PeriodNotFound, ValidationError};
use mettool_orchestration::ControllerError;

use crate::config::ConfigError;

/// Exit code for a controller error.
pub fn handle_error(err: &ControllerError) -> i32 {
    match err {
        ControllerError::Validation(_) | ControllerError::PeriodNotFound(_) => {
            exit_codes::ERROR_CONFIG
        }
        ControllerError::Engine(EngineError::Unavailable(_)) => {
            exit_codes::ERROR_ENGINE_UNAVAILABLE
        }
        ControllerError::Timeout { .. } => exit_codes::ERROR_TIMEOUT,
        ControllerError::Engine(_)
        | ControllerError::Export(_)
        | ControllerError::Adapter(_)
        | ControllerError::Io { .. } => exit_codes::ERROR_GENERIC,
    }
}

/// Exit code for anything `app::run` returns.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ControllerError>() {
        handle_error(e)
    } else if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<ValidationError>().is_some()
        || err.downcast_ref::<PeriodNotFound>().is_some()
    {
        exit_codes::ERROR_CONFIG
    } else if let Some(EngineError::Unavailable(_)) = err.downcast_ref::<EngineError>() {
        exit_codes::ERROR_ENGINE_UNAVAILABLE
    } else {
        exit_codes::ERROR_GENERIC
    }
}

/// Controller errors reach the user through the notifier before they are
/// returned; everything else still has to be printed.
pub fn already_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ControllerError>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn error_codes() {
        let timeout = ControllerError::Timeout {
            what: "Load",
            after: Duration::from_secs(5),
        };
        assert_eq!(handle_error(&timeout), 2);
        assert_eq!(
            handle_error(&ValidationError::NoPeriods.into()),
            exit_codes::ERROR_CONFIG
        );
        assert_eq!(
            handle_error(&EngineError::Unavailable("boom".into()).into()),
            5
        );
        assert_eq!(
            handle_error(&EngineError::Compute("Start > End".into()).into()),
            1
        );
    }

    #[test]
    fn anyhow_errors_are_mapped() {
        let config = anyhow::Error::from(ConfigError::MissingFile);
        assert_eq!(exit_code(&config), 4);
        assert!(!already_reported(&config));

        let reported = anyhow::Error::from(ControllerError::from(ValidationError::NotLoaded));
        assert_eq!(exit_code(&reported), 4);
        assert!(already_reported(&reported));

        assert_eq!(exit_code(&anyhow::anyhow!("terminal gone")), 1);
    }
}
