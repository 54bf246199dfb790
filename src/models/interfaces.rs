//! Fluid interfaces and volumetric bookkeeping
//!
//! The cavern holds, from top to bottom:
//!
//! ```text
//!   roof ──────────────────────────
//!          blanket (stored product)
//!   blanket_depth ─────────────────
//!          brine swept by injection
//!   injection_depth ───────────────
//!          native brine
//!   floor − pile_height ───────────
//!          insolubles pile
//!   floor ─────────────────────────
//! ```
//!
//! The tracker never integrates interface velocities. It keeps volumes
//! ([`FluidInventory`]) and re-derives the depths from the updated profile
//! after each step with the bounded root finder, so the balance
//!
//! ```text
//! V_blanket + V_brine + V_pile = V_cavern
//! ```
//!
//! holds to the root-finding tolerance at every accepted step.

use crate::error::{ConfigurationError, Invariant, LeachResult, SimulationError};
use crate::models::{CavernProfile, OperatingPoint, StageKind};
use crate::numerics::RootSolver;
use crate::physics::BrineProperties;
use serde::{Deserialize, Serialize};

const SALINITY_ROUNDING: f64 = 1e-9;

/// Interface depths and brine salinity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidInterfaces {
    /// Blanket/brine interface \[m\], the roof when there is no blanket
    pub blanket_depth: f64,
    /// Lower boundary of the brine swept by the injected water \[m\]
    pub injection_depth: f64,
    /// Insolubles pile height above the floor \[m\]
    pub pile_height: f64,
    /// Brine salinity (mass fraction)
    pub salinity: f64,
}

impl FluidInterfaces {
    /// Depth of the pile top \[m\]
    pub fn pile_top(&self, floor: f64) -> f64 {
        floor - self.pile_height
    }
}

/// Volumes and dissolved salt held by the cavern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidInventory {
    /// Stored product \[m³\]
    pub blanket_volume: f64,
    /// Brine, suspended insolubles included \[m³\]
    pub brine_volume: f64,
    /// Insolubles still in suspension \[m³\]
    pub suspended_volume: f64,
    /// Settled insolubles \[m³\]
    pub pile_volume: f64,
    /// Dissolved salt \[kg\]
    pub salt_mass: f64,
}

impl FluidInventory {
    /// Volume taken by blanket, brine and pile \[m³\]
    pub fn occupied_volume(&self) -> f64 {
        self.blanket_volume + self.brine_volume + self.pile_volume
    }

    /// Brine volume without the suspended solids \[m³\]
    pub fn liquid_brine_volume(&self) -> f64 {
        self.brine_volume - self.suspended_volume
    }
}

/// Interfaces and inventory, always updated together
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidState {
    pub interfaces: FluidInterfaces,
    pub inventory: FluidInventory,
}

impl FluidState {
    /// Derive the initial inventory from interface depths
    ///
    /// The interfaces must be stacked roof → blanket → injection → pile top
    /// → floor and the salinity must lie in `[0, saturation]`.
    pub fn initial(
        profile: &CavernProfile,
        interfaces: FluidInterfaces,
        brine: &BrineProperties,
    ) -> Result<Self, ConfigurationError> {
        let (roof, floor) = (profile.roof(), profile.floor());
        let pile_top = interfaces.pile_top(floor);

        let depths = [
            ("blanket interface", interfaces.blanket_depth),
            ("injection interface", interfaces.injection_depth),
            ("pile top", pile_top),
        ];
        for (name, depth) in depths {
            if !(depth >= roof && depth <= floor) {
                return Err(ConfigurationError::DepthOutOfRange {
                    name: name.to_string(),
                    depth,
                    roof,
                    floor,
                });
            }
        }
        for pair in depths.windows(2) {
            let ((upper, upper_depth), (lower, lower_depth)) = (pair[0], pair[1]);
            if upper_depth > lower_depth {
                return Err(ConfigurationError::InterfaceOrder {
                    upper,
                    upper_depth,
                    lower,
                    lower_depth,
                });
            }
        }

        if !(interfaces.salinity >= 0.0 && interfaces.salinity <= brine.saturation) {
            return Err(ConfigurationError::SalinityOutOfRange {
                field: "initial brine",
                value: interfaces.salinity,
                saturation: brine.saturation,
            });
        }

        let total = profile.total_volume();
        let out_of_range = |_| ConfigurationError::DepthOutOfRange {
            name: "initial interface".to_string(),
            depth: f64::NAN,
            roof,
            floor,
        };
        let blanket_volume = total - profile.volume_below(interfaces.blanket_depth).map_err(out_of_range)?;
        let pile_volume = profile.volume_below(pile_top).map_err(out_of_range)?;
        let brine_volume = total - blanket_volume - pile_volume;

        if brine_volume <= 0.0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "initial brine volume",
                value: brine_volume,
                reason: "the cavern must initially hold brine",
            });
        }

        Ok(Self {
            interfaces,
            inventory: FluidInventory {
                blanket_volume,
                brine_volume,
                suspended_volume: 0.0,
                pile_volume,
                salt_mass: brine_volume * brine.concentration(interfaces.salinity),
            },
        })
    }
}

/// Insoluble content of the rock salt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Insolubles {
    /// Volume fraction of insolubles in the rock
    #[serde(default = "default_insoluble_fraction")]
    pub fraction: f64,

    /// First-order settling rate, per unit of the scenario duration unit
    /// (\[1/h\] once normalized), `None` for immediate settling
    #[serde(default)]
    pub settling_rate: Option<f64>,
}

fn default_insoluble_fraction() -> f64 { 0.05 }

impl Default for Insolubles {
    fn default() -> Self {
        Self {
            fraction: default_insoluble_fraction(),
            settling_rate: None,
        }
    }
}

impl Insolubles {
    /// Share of the suspended pool settling during `dt`
    pub fn settled_share(&self, dt: f64) -> f64 {
        match self.settling_rate {
            None => 1.0,
            Some(rate) => 1.0 - (-rate * dt).exp(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.fraction >= 0.0 && self.fraction < 1.0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "insolubles.fraction",
                value: self.fraction,
                reason: "must lie in [0, 1[",
            });
        }
        if let Some(rate) = self.settling_rate
            && !(rate.is_finite() && rate >= 0.0)
        {
            return Err(ConfigurationError::InvalidSetting {
                name: "insolubles.settling_rate",
                value: rate,
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Non-fatal condition noticed during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Node increments were limited to the recession cap
    RecessionClamped { nodes: usize },
    /// Brine salinity exceeded saturation and was clamped
    SalinityClamped { computed: f64 },
    /// Inflow exceeded the cavern capacity, surplus produced
    Vented { volume: f64 },
    /// The pile reached the injection interface, settling stopped
    PileFull { pile_volume: f64, capacity: f64 },
}

/// Per-step volumes handled by the tracker \[m³\]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerReport {
    pub injected: f64,
    pub filled: f64,
    pub withdrawn: f64,
    pub vented: f64,
    pub dissolved: f64,
    pub settled: f64,
    /// Brine salinity leaving through the production string
    pub produced_salinity: f64,
    /// `V_blanket + V_brine + V_pile − V_cavern` after reconciliation
    pub volume_error: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Updates fluid volumes, salinity and interface depths over one step
#[derive(Debug, Clone, Copy)]
pub struct InterfaceTracker<'a> {
    brine: &'a BrineProperties,
    insolubles: &'a Insolubles,
    solver: RootSolver,
    /// Relative tolerance on the cavern volume balance
    volume_tolerance: f64,
    /// Largest share of the liquid brine withdrawn or vented in one step
    max_exchange_fraction: f64,
}

impl<'a> InterfaceTracker<'a> {
    pub fn new(
        brine: &'a BrineProperties,
        insolubles: &'a Insolubles,
        solver: RootSolver,
        volume_tolerance: f64,
    ) -> Self {
        Self {
            brine,
            insolubles,
            solver,
            volume_tolerance,
            max_exchange_fraction: 1.0,
        }
    }

    /// Limit the brine removed in one step to `fraction` of the liquid brine
    /// held at the start of the step
    ///
    /// Removed brine leaves at the start-of-step concentration, so a step
    /// exchanging more than the brine zone holds would remove salt that was
    /// never there. Beyond the limit `update` returns
    /// [`SimulationError::StepTooLarge`].
    pub fn with_max_exchange_fraction(mut self, fraction: f64) -> Self {
        self.max_exchange_fraction = fraction;
        self
    }

    /// Advance the fluid state over `dt`
    ///
    /// `profile` is the cavern after this step's recession and `dissolved` the
    /// rock volume it removed. The previous state is not modified; a failed
    /// update leaves nothing to roll back.
    pub fn update(
        &self,
        profile: &CavernProfile,
        previous: &FluidState,
        operating: &OperatingPoint,
        dt: f64,
        dissolved: f64,
    ) -> LeachResult<(FluidState, TrackerReport)> {
        let before = previous.inventory;
        let mut report = TrackerReport {
            injected: operating.injection_rate * dt,
            filled: operating.fill_rate * dt,
            withdrawn: operating.withdrawal_rate * dt,
            dissolved,
            produced_salinity: previous.interfaces.salinity,
            ..Default::default()
        };

        // ====== Volume balance ======

        let concentration_before = self.brine.concentration(previous.interfaces.salinity);
        let fraction = self.insolubles.fraction;

        let injection_depth = match operating.kind {
            StageKind::Leach | StageKind::LeachAndFill => previous
                .interfaces
                .injection_depth
                .max(operating.deepest_string()),
            _ => previous.interfaces.injection_depth,
        };

        let mut inventory = before;
        inventory.blanket_volume += report.filled;
        inventory.brine_volume += report.injected - report.withdrawn + dissolved;

        // The pile never buries the injection interface, solids above it stay
        // in suspension
        inventory.suspended_volume += dissolved * fraction;
        report.settled = inventory.suspended_volume * self.insolubles.settled_share(dt);
        let pile_capacity = profile.volume_below(injection_depth)?;
        if inventory.pile_volume + report.settled > pile_capacity {
            report.settled = (pile_capacity - inventory.pile_volume).max(0.0);
            log::warn!(
                "Insolubles pile ({:.3} m3) reached the injection interface at {:.3} m",
                inventory.pile_volume + report.settled,
                injection_depth
            );
            report.diagnostics.push(Diagnostic::PileFull {
                pile_volume: inventory.pile_volume + report.settled,
                capacity: pile_capacity,
            });
        }
        inventory.suspended_volume -= report.settled;
        inventory.brine_volume -= report.settled;
        inventory.pile_volume += report.settled;

        inventory.salt_mass += dissolved * (1.0 - fraction) * self.brine.salt_density
            + report.injected * self.brine.concentration(operating.injection_salinity)
            - report.withdrawn * concentration_before;

        // ====== Capacity reconciliation ======

        let cavern_volume = profile.total_volume();
        let tolerance = self.volume_tolerance * cavern_volume;
        let excess = inventory.occupied_volume() - cavern_volume;

        if excess > tolerance {
            log::warn!(
                "Stage {}: inflow exceeds cavern capacity, venting {:.3} m3 of brine",
                operating.stage,
                excess
            );
            report.vented = excess;
            inventory.brine_volume -= excess;
            inventory.salt_mass -= excess * concentration_before;
            report.diagnostics.push(Diagnostic::Vented { volume: excess });
        } else if excess < -tolerance {
            return Err(Invariant::FluidDeficit { deficit: -excess }.into());
        }

        let exchanged = report.withdrawn + report.vented;
        let exchange_limit = self.max_exchange_fraction * before.liquid_brine_volume();
        if exchanged > exchange_limit {
            return Err(SimulationError::StepTooLarge {
                ratio: exchanged / exchange_limit,
                threshold: 1.0,
            });
        }

        if inventory.liquid_brine_volume() <= 0.0 {
            return Err(Invariant::BrineExhausted {
                volume: inventory.liquid_brine_volume(),
            }
            .into());
        }

        report.volume_error = inventory.occupied_volume() - cavern_volume;

        // ====== Salinity ======

        let salinity = self.salinity(&mut inventory, &mut report)?;

        // ====== Interface depths ======

        let blanket_depth = if inventory.blanket_volume > 0.0 {
            profile.depth_for_volume_below(cavern_volume - inventory.blanket_volume, &self.solver)?
        } else {
            profile.roof()
        };

        let pile_top = profile.depth_for_volume_below(inventory.pile_volume, &self.solver)?;

        let interfaces = FluidInterfaces {
            blanket_depth,
            injection_depth,
            pile_height: profile.floor() - pile_top,
            salinity,
        };

        self.check_order(&interfaces, profile)?;
        check_finite(&interfaces, &inventory)?;

        Ok((FluidState { interfaces, inventory }, report))
    }

    /// Solve `w·ρ(w) = M / V`, clamping to saturation
    fn salinity(&self, inventory: &mut FluidInventory, report: &mut TrackerReport) -> LeachResult<f64> {
        let liquid = inventory.liquid_brine_volume();
        let concentration = inventory.salt_mass / liquid;

        if concentration > self.brine.saturated_concentration() {
            let computed = self
                .brine
                .salinity_from_concentration(concentration, &self.solver)
                .map_err(|e| SimulationError::root_finding("brine salinity", e))?;
            log::warn!(
                "Brine salinity {:.5} exceeds saturation {:.5}, clamped",
                computed,
                self.brine.saturation
            );
            report.diagnostics.push(Diagnostic::SalinityClamped { computed });
            inventory.salt_mass = liquid * self.brine.saturated_concentration();
            return Ok(self.brine.saturation);
        }

        let salinity = self
            .brine
            .salinity_from_concentration(concentration, &self.solver)
            .map_err(|e| SimulationError::root_finding("brine salinity", e))?;

        // Rounding may leave a vanishing negative salt mass after fresh water
        // displaced all the brine
        if salinity < -SALINITY_ROUNDING || !salinity.is_finite() {
            return Err(Invariant::SalinityOutOfBounds {
                value: salinity,
                saturation: self.brine.saturation,
            }
            .into());
        }

        Ok(salinity.clamp(0.0, self.brine.saturation))
    }

    fn check_order(&self, interfaces: &FluidInterfaces, profile: &CavernProfile) -> LeachResult<()> {
        let slack = 1e-9 * profile.height();
        let pile_top = interfaces.pile_top(profile.floor());

        if interfaces.blanket_depth > interfaces.injection_depth + slack {
            return Err(Invariant::InterfaceCrossing {
                upper: "blanket interface",
                upper_depth: interfaces.blanket_depth,
                lower: "injection interface",
                lower_depth: interfaces.injection_depth,
            }
            .into());
        }
        if interfaces.injection_depth > pile_top + slack {
            return Err(Invariant::InterfaceCrossing {
                upper: "injection interface",
                upper_depth: interfaces.injection_depth,
                lower: "pile top",
                lower_depth: pile_top,
            }
            .into());
        }

        Ok(())
    }
}

fn check_finite(interfaces: &FluidInterfaces, inventory: &FluidInventory) -> LeachResult<()> {
    let values = [
        ("blanket depth", interfaces.blanket_depth),
        ("injection interface depth", interfaces.injection_depth),
        ("pile height", interfaces.pile_height),
        ("salinity", interfaces.salinity),
        ("blanket volume", inventory.blanket_volume),
        ("brine volume", inventory.brine_volume),
        ("pile volume", inventory.pile_volume),
        ("salt mass", inventory.salt_mass),
    ];

    match values.iter().find(|(_, value)| !value.is_finite()) {
        Some((quantity, _)) => Err(Invariant::NonFinite { quantity: *quantity, index: 0 }.into()),
        None => Ok(()),
    }
}
