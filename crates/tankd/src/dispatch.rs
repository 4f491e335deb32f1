//! Turns command outcomes into what the session sends back.

use tank_services::{Outcome, TankError};

/// Next step for a session after one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Reply(String),
    Close,
}

/// Client-facing text for a refused transfer.
pub fn tank_error_reply(error: TankError) -> &'static str {
    match error {
        TankError::LoadingPumpNotActive => "loading pump not active",
        TankError::UnloadingPumpNotActive => "unloading pump not active",
        TankError::StorageTankNonWorking => "oil tank not working",
        TankError::LowLevelOfProduct => {
            "too low level of oil in the tank, it is impossible to download"
        }
        TankError::HighLevelOfProduct => {
            "too high level of oil in the tank, it is impossible to unload"
        }
    }
}

pub fn render(outcome: Outcome) -> Step {
    match outcome {
        Outcome::Reply(text) => Step::Reply(text),
        Outcome::Failed(error) => {
            tracing::warn!(%error, "transfer refused");
            Step::Reply(tank_error_reply(error).to_string())
        }
        Outcome::InvalidArgument(reason) => {
            tracing::warn!(%reason, "invalid argument");
            Step::Reply(format!("invalid argument: {reason}"))
        }
        Outcome::Unrecognized => {
            tracing::warn!("command not recognized");
            Step::Reply("unknow command".to_string())
        }
        Outcome::Disconnect => Step::Close,
    }
}
