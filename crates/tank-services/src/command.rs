//! Command interpreter.
//!
//! A command is one line of text, matched against an ordered pattern table.
//! Patterns are unanchored and the first one found anywhere in the line wins,
//! so `get download speed` also matches inside a longer line. Parsing
//! produces a `Command`; executing it against a leased tank produces an
//! `Outcome`. Domain and protocol failures are outcomes, never errors.

use std::num::NonZeroU64;

use regex::{Captures, Regex};

use crate::parcel::Parcel;
use crate::tank::{PumpState, Tank, TankError, WorkingState};

pub const HELP: &str = "\
set download speed <number>
set unloading speed <number>
set lower permissible level <number>
set upper acceptable level <number>
set level of oil products <number>
set working state <work|non-work>
set loading pump status <active|inactive>
set unloading pump status <active|inactive>
get download speed
get unloading speed
get lower permissible level
get upper acceptable level
get level of oil products
get working state
get loading pump status
get unloading pump status
download <quantity of oil products (number)>
unload <quantity of oil products (number)>
help
disconnect";

/// A read-only tank attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    DownloadSpeed,
    UnloadingSpeed,
    LowerPermissibleLevel,
    UpperAcceptableLevel,
    LevelOfProduct,
    WorkingState,
    LoadingPump,
    UnloadingPump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDownloadSpeed(NonZeroU64),
    SetUnloadingSpeed(NonZeroU64),
    SetLowerPermissibleLevel(u64),
    SetUpperAcceptableLevel(u64),
    SetLevelOfProduct(u64),
    SetWorkingState(WorkingState),
    SetLoadingPump(PumpState),
    SetUnloadingPump(PumpState),
    Get(Query),
    /// Fill an empty parcel of this capacity from the tank.
    Download(u64),
    /// Empty a full parcel of this volume into the tank.
    Unload(u64),
    Help,
    Disconnect,
}

/// What the session should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Failed(TankError),
    InvalidArgument(String),
    Unrecognized,
    Disconnect,
}

type Builder = fn(&Captures<'_>) -> Result<Command, String>;

/// Ordered (pattern, builder) pairs. Built once and shared by all sessions.
pub struct CommandTable {
    entries: Vec<(Regex, Builder)>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        use Command::*;

        let entries = vec![
            entry(r"set download speed (\d+)", |c| Ok(SetDownloadSpeed(speed(c)?))),
            entry(r"set unloading speed (\d+)", |c| Ok(SetUnloadingSpeed(speed(c)?))),
            entry(r"set lower permissible level (\d+)", |c| {
                Ok(SetLowerPermissibleLevel(number(c)?))
            }),
            entry(r"set upper acceptable level (\d+)", |c| {
                Ok(SetUpperAcceptableLevel(number(c)?))
            }),
            entry(r"set level of oil products (\d+)", |c| {
                Ok(SetLevelOfProduct(number(c)?))
            }),
            entry(r"set working state (work|non-work)", |c| {
                Ok(SetWorkingState(state(c)?))
            }),
            entry(r"set loading pump status (active|inactive)", |c| {
                Ok(SetLoadingPump(state(c)?))
            }),
            entry(r"set unloading pump status (active|inactive)", |c| {
                Ok(SetUnloadingPump(state(c)?))
            }),
            entry(r"get download speed", |_| Ok(Get(Query::DownloadSpeed))),
            entry(r"get unloading speed", |_| Ok(Get(Query::UnloadingSpeed))),
            entry(r"get lower permissible level", |_| {
                Ok(Get(Query::LowerPermissibleLevel))
            }),
            entry(r"get upper acceptable level", |_| {
                Ok(Get(Query::UpperAcceptableLevel))
            }),
            entry(r"get level of oil products", |_| Ok(Get(Query::LevelOfProduct))),
            entry(r"get working state", |_| Ok(Get(Query::WorkingState))),
            entry(r"get loading pump status", |_| Ok(Get(Query::LoadingPump))),
            entry(r"get unloading pump status", |_| Ok(Get(Query::UnloadingPump))),
            entry(r"download (\d+)", |c| Ok(Download(number(c)?))),
            entry(r"unload (\d+)", |c| Ok(Unload(number(c)?))),
            entry(r"help", |_| Ok(Help)),
            entry(r"disconnect", |_| Ok(Disconnect)),
        ];

        Self { entries }
    }

    /// First matching command, or `None` when nothing matches.
    /// `Some(Err(_))` means the line matched but its argument is unusable.
    pub fn parse(&self, line: &str) -> Option<Result<Command, String>> {
        self.entries
            .iter()
            .find_map(|(pattern, build)| pattern.captures(line).map(|caps| build(&caps)))
    }

    /// Parse and run one line against `tank`.
    pub async fn interpret(&self, line: &str, tank: &mut Tank) -> Outcome {
        match self.parse(line) {
            None => Outcome::Unrecognized,
            Some(Err(reason)) => Outcome::InvalidArgument(reason),
            Some(Ok(command)) => execute(command, tank).await,
        }
    }
}

fn entry(pattern: &str, build: Builder) -> (Regex, Builder) {
    (
        Regex::new(pattern).expect("command patterns are valid regexes"),
        build,
    )
}

fn number(caps: &Captures<'_>) -> Result<u64, String> {
    let raw = &caps[1];
    raw.parse()
        .map_err(|_| format!("{raw} does not fit an unsigned 64-bit number"))
}

fn speed(caps: &Captures<'_>) -> Result<NonZeroU64, String> {
    NonZeroU64::new(number(caps)?).ok_or_else(|| "speed must be greater than zero".to_string())
}

fn state<T>(caps: &Captures<'_>) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    caps[1].parse().map_err(|e: T::Err| e.to_string())
}

fn success() -> Outcome {
    Outcome::Reply("success".to_string())
}

/// Text reply for a query.
pub fn query(tank: &Tank, query: Query) -> String {
    match query {
        Query::DownloadSpeed => tank.download_speed().to_string(),
        Query::UnloadingSpeed => tank.unloading_speed().to_string(),
        Query::LowerPermissibleLevel => tank.lower_permissible_level().to_string(),
        Query::UpperAcceptableLevel => tank.upper_acceptable_level().to_string(),
        Query::LevelOfProduct => tank.level_of_product().to_string(),
        Query::WorkingState => tank.working_state().to_string(),
        Query::LoadingPump => tank.loading_pump().to_string(),
        Query::UnloadingPump => tank.unloading_pump().to_string(),
    }
}

/// Run one parsed command. Transfers may sleep for the simulated pump time.
pub async fn execute(command: Command, tank: &mut Tank) -> Outcome {
    match command {
        Command::SetDownloadSpeed(v) => {
            tank.set_download_speed(v);
            success()
        }
        Command::SetUnloadingSpeed(v) => {
            tank.set_unloading_speed(v);
            success()
        }
        Command::SetLowerPermissibleLevel(v) => {
            tank.set_lower_permissible_level(v);
            success()
        }
        Command::SetUpperAcceptableLevel(v) => {
            tank.set_upper_acceptable_level(v);
            success()
        }
        Command::SetLevelOfProduct(v) => {
            tank.set_level_of_product(v);
            success()
        }
        Command::SetWorkingState(s) => {
            tank.set_working_state(s);
            success()
        }
        Command::SetLoadingPump(s) => {
            tank.set_loading_pump(s);
            success()
        }
        Command::SetUnloadingPump(s) => {
            tank.set_unloading_pump(s);
            success()
        }
        Command::Get(q) => Outcome::Reply(query(tank, q)),
        Command::Download(capacity) => {
            let mut parcel = Parcel::empty(capacity);
            match tank.download(&mut parcel).await {
                Ok(_) => success(),
                Err(e) => Outcome::Failed(e),
            }
        }
        Command::Unload(volume) => {
            let mut parcel = Parcel::full(volume);
            match tank.unload(&mut parcel).await {
                Ok(_) => success(),
                Err(e) => Outcome::Failed(e),
            }
        }
        Command::Help => Outcome::Reply(HELP.to_string()),
        Command::Disconnect => Outcome::Disconnect,
    }
}
