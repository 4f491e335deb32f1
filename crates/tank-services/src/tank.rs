//! Storage tank, the bounded resource a session controls.
//!
//! State is three independent axes: working state, loading pump, unloading
//! pump. Setters are plain assignments. The only automatic transition is a
//! pump switching itself off when a transfer lands exactly on its threshold.
//!
//! Transfers take simulated time: `volume / speed` time units, slept inside
//! the call. The sleep is not tied to the client's connection, so a session
//! that starts a long transfer keeps the tank busy until it completes.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

use tank_core::config::TankDefaults;

use crate::parcel::Parcel;

// ── State axes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkingState {
    Work,
    #[default]
    NonWork,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PumpState {
    Active,
    #[default]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state: {0:?}")]
pub struct UnknownState(pub String);

impl WorkingState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkingState::Work => "work",
            WorkingState::NonWork => "non-work",
        }
    }
}

impl fmt::Display for WorkingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkingState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(WorkingState::Work),
            "non-work" => Ok(WorkingState::NonWork),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

impl PumpState {
    pub fn as_str(self) -> &'static str {
        match self {
            PumpState::Active => "active",
            PumpState::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PumpState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PumpState::Active),
            "inactive" => Ok(PumpState::Inactive),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Expected, non-fatal refusals of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TankError {
    #[error("loading pump not active")]
    LoadingPumpNotActive,
    #[error("unloading pump not active")]
    UnloadingPumpNotActive,
    #[error("storage tank not working")]
    StorageTankNonWorking,
    #[error("level of product too low to download")]
    LowLevelOfProduct,
    #[error("level of product too high to unload")]
    HighLevelOfProduct,
}

/// Which way product moves relative to the tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Tank → parcel, through the loading pump.
    Download,
    /// Parcel → tank, through the unloading pump.
    Unload,
}

impl Flow {
    fn pump_error(self) -> TankError {
        match self {
            Flow::Download => TankError::LoadingPumpNotActive,
            Flow::Unload => TankError::UnloadingPumpNotActive,
        }
    }

    fn exhausted_error(self) -> TankError {
        match self {
            Flow::Download => TankError::LowLevelOfProduct,
            Flow::Unload => TankError::HighLevelOfProduct,
        }
    }
}

// ── Tank ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Tank {
    working: WorkingState,
    loading_pump: PumpState,
    unloading_pump: PumpState,
    /// Neither threshold is checked against the other. Transfers clamp with
    /// saturating arithmetic, so an inverted pair simply allows no transfer.
    lower_permissible_level: u64,
    upper_acceptable_level: u64,
    download_speed: NonZeroU64,
    unloading_speed: NonZeroU64,
    level_of_product: u64,
    /// Wall-clock length of one transfer time unit.
    time_unit: Duration,
}

impl Default for Tank {
    fn default() -> Self {
        Self::new(&TankDefaults::default(), Duration::from_secs(1))
    }
}

impl Tank {
    /// Halted tank with both pumps off, seeded from `defaults`.
    pub fn new(defaults: &TankDefaults, time_unit: Duration) -> Self {
        Self {
            working: WorkingState::NonWork,
            loading_pump: PumpState::Inactive,
            unloading_pump: PumpState::Inactive,
            lower_permissible_level: defaults.lower_permissible_level,
            upper_acceptable_level: defaults.upper_acceptable_level,
            download_speed: NonZeroU64::new(defaults.download_speed).unwrap_or(NonZeroU64::MIN),
            unloading_speed: NonZeroU64::new(defaults.unloading_speed).unwrap_or(NonZeroU64::MIN),
            level_of_product: defaults.level_of_product,
            time_unit,
        }
    }

    pub fn set_download_speed(&mut self, speed: NonZeroU64) {
        self.download_speed = speed;
    }

    pub fn set_unloading_speed(&mut self, speed: NonZeroU64) {
        self.unloading_speed = speed;
    }

    pub fn set_lower_permissible_level(&mut self, level: u64) {
        self.lower_permissible_level = level;
    }

    pub fn set_upper_acceptable_level(&mut self, level: u64) {
        self.upper_acceptable_level = level;
    }

    /// Forces the level. May leave it outside the thresholds.
    pub fn set_level_of_product(&mut self, level: u64) {
        self.level_of_product = level;
    }

    pub fn set_working_state(&mut self, state: WorkingState) {
        self.working = state;
    }

    pub fn set_loading_pump(&mut self, state: PumpState) {
        self.loading_pump = state;
    }

    pub fn set_unloading_pump(&mut self, state: PumpState) {
        self.unloading_pump = state;
    }

    pub fn download_speed(&self) -> NonZeroU64 {
        self.download_speed
    }

    pub fn unloading_speed(&self) -> NonZeroU64 {
        self.unloading_speed
    }

    pub fn lower_permissible_level(&self) -> u64 {
        self.lower_permissible_level
    }

    pub fn upper_acceptable_level(&self) -> u64 {
        self.upper_acceptable_level
    }

    pub fn level_of_product(&self) -> u64 {
        self.level_of_product
    }

    pub fn working_state(&self) -> WorkingState {
        self.working
    }

    pub fn loading_pump(&self) -> PumpState {
        self.loading_pump
    }

    pub fn unloading_pump(&self) -> PumpState {
        self.unloading_pump
    }

    /// Move product from the tank into `parcel`. Returns the volume moved.
    pub async fn download(&mut self, parcel: &mut Parcel) -> Result<u64, TankError> {
        self.transfer(Flow::Download, parcel).await
    }

    /// Move product from `parcel` into the tank. Returns the volume moved.
    pub async fn unload(&mut self, parcel: &mut Parcel) -> Result<u64, TankError> {
        self.transfer(Flow::Unload, parcel).await
    }

    /// Volume a transfer would move right now, ignoring pump and working state.
    pub fn transferable(&self, flow: Flow, parcel: &Parcel) -> u64 {
        match flow {
            Flow::Download => parcel
                .headroom()
                .min(self.level_of_product.saturating_sub(self.lower_permissible_level)),
            Flow::Unload => parcel
                .content_volume()
                .min(self.upper_acceptable_level.saturating_sub(self.level_of_product)),
        }
    }

    /// How long moving `volume` takes in `flow`.
    pub fn transfer_time(&self, flow: Flow, volume: u64) -> Duration {
        let units = volume / self.speed(flow).get();
        self.time_unit
            .saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
    }

    fn speed(&self, flow: Flow) -> NonZeroU64 {
        match flow {
            Flow::Download => self.download_speed,
            Flow::Unload => self.unloading_speed,
        }
    }

    fn pump_mut(&mut self, flow: Flow) -> &mut PumpState {
        match flow {
            Flow::Download => &mut self.loading_pump,
            Flow::Unload => &mut self.unloading_pump,
        }
    }

    /// The threshold a transfer in `flow` moves toward.
    fn bound(&self, flow: Flow) -> u64 {
        match flow {
            Flow::Download => self.lower_permissible_level,
            Flow::Unload => self.upper_acceptable_level,
        }
    }

    async fn transfer(&mut self, flow: Flow, parcel: &mut Parcel) -> Result<u64, TankError> {
        if self.working != WorkingState::Work {
            return Err(TankError::StorageTankNonWorking);
        }
        if *self.pump_mut(flow) != PumpState::Active {
            return Err(flow.pump_error());
        }

        let requested = match flow {
            Flow::Download => parcel.headroom(),
            Flow::Unload => parcel.content_volume(),
        };
        let volume = self.transferable(flow, parcel);
        tracing::info!(?flow, requested, volume, "transfer requested");
        if volume == 0 {
            return Err(flow.exhausted_error());
        }

        let delay = self.transfer_time(flow, volume);
        tracing::info!(?flow, volume, delay_ms = delay.as_millis() as u64, "pumping");
        tokio::time::sleep(delay).await;

        match flow {
            Flow::Download => {
                self.level_of_product -= volume;
                parcel.fill(volume);
            }
            Flow::Unload => {
                self.level_of_product += volume;
                parcel.drain(volume);
            }
        }
        tracing::info!(level = self.level_of_product, "level of product");

        if self.level_of_product == self.bound(flow) {
            *self.pump_mut(flow) = PumpState::Inactive;
            tracing::info!(?flow, "threshold reached, pump switched off");
        }

        Ok(volume)
    }
}
