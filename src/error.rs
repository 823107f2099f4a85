// ABOUTME: Application-wide error type for scpu.
// ABOUTME: Aggregates module errors and maps them to process exit codes.

use crate::config::ConfigError;
use crate::session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl Error {
    /// Process exit code: the remote status for a non-zero remote exit,
    /// 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Session(SessionError::RemoteExit(status)) => match *status {
                s @ 1..=255 => s as i32,
                _ => 1,
            },
            _ => 1,
        }
    }

    /// How the remote side ended, as opposed to a failure to run it.
    /// Reported only when verbose; the exit code already says it.
    pub fn is_quiet_exit(&self) -> bool {
        matches!(
            self,
            Error::Session(
                SessionError::RemoteExit(_)
                    | SessionError::Signal { .. }
                    | SessionError::NoExitStatus
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_status_becomes_exit_code() {
        let err = Error::from(SessionError::RemoteExit(3));
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_quiet_exit());
    }

    #[test]
    fn remote_endings_are_quiet() {
        let signal = SessionError::Signal {
            signal: "KILL".to_string(),
            message: String::new(),
        };
        assert!(Error::from(signal).is_quiet_exit());
        assert!(Error::from(SessionError::NoExitStatus).is_quiet_exit());
    }

    #[test]
    fn failures_to_start_are_reported() {
        let refused = Error::from(SessionError::Start("the shell".to_string()));
        assert!(!refused.is_quiet_exit());
        assert_eq!(refused.exit_code(), 1);

        let raw_mode = Error::from(SessionError::Io(std::io::Error::other("not a tty")));
        assert!(!raw_mode.is_quiet_exit());
    }

    #[test]
    fn channel_open_failure_is_distinct() {
        let refused = crate::ssh::Error::ChannelOpen("administratively prohibited".to_string());
        let err = Error::from(refused);
        assert!(err.to_string().starts_with("could not open session channel"));
        assert_eq!(err.exit_code(), 1);
        assert!(!err.is_quiet_exit());
    }

    #[test]
    fn out_of_range_status_is_plain_failure() {
        assert_eq!(Error::from(SessionError::RemoteExit(256)).exit_code(), 1);
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = Error::from(ConfigError::MissingUser);
        assert_eq!(err.exit_code(), 1);
        assert!(!err.is_quiet_exit());
    }
}
