//! CRO-SL configuration.

use crate::core::Params;
use crate::error::{ConfigError, EvoResult};

/// Configuration shared by CRO-SL, PCRO-SL and DPCRO-SL.
///
/// # Reef size
///
/// The reef capacity is `round(pop_size * rho)`, where `pop_size` is the
/// initializer's population size at construction. The initial reef is
/// generated full.
///
/// # Depredation
///
/// After larval settling, the `floor(len * fd)` weakest corals are exposed
/// and each dies with probability `pd`. At least two corals always survive.
///
/// # Examples
///
/// ```
/// use u_evosearch::cro::CroConfig;
///
/// let config = CroConfig::default()
///     .with_rho(0.8)
///     .with_depredation(0.15, 0.9)
///     .with_attempts(4);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.capacity(100), 80);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CroConfig {
    /// Reef capacity as a multiple of the initializer's population size.
    pub rho: f64,

    /// Fraction of the reef exposed to depredation, in `[0, 1]`.
    pub fd: f64,

    /// Death probability of an exposed coral, in `[0, 1]`.
    pub pd: f64,

    /// Settling attempts per larva.
    pub attempts: usize,
}

impl Default for CroConfig {
    fn default() -> Self {
        Self {
            rho: 0.6,
            fd: 0.1,
            pd: 0.9,
            attempts: 3,
        }
    }
}

impl CroConfig {
    /// Reads `rho`, `Fd`, `Pd` and `attempts` from a parameter bag.
    ///
    /// Missing keys fall back to the defaults. `Fb` is accepted and ignored.
    pub fn from_params(params: &Params) -> EvoResult<Self> {
        let default = Self::default();
        let attempts = match params.get("attempts") {
            Some(_) => params.require_count("attempts")?,
            None => default.attempts,
        };
        let config = Self {
            rho: params.get_or("rho", default.rho),
            fd: params.get_or("Fd", default.fd),
            pd: params.get_or("Pd", default.pd),
            attempts,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    pub fn with_depredation(mut self, fd: f64, pd: f64) -> Self {
        self.fd = fd;
        self.pd = pd;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Reef capacity for an initializer population of `pop_size`.
    pub fn capacity(&self, pop_size: usize) -> usize {
        (pop_size as f64 * self.rho).round() as usize
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EvoResult<()> {
        if !(self.rho > 0.0 && self.rho.is_finite()) {
            return Err(ConfigError::invalid(
                "rho",
                format!("must be positive, got {}", self.rho),
            ));
        }
        if !(0.0..=1.0).contains(&self.fd) {
            return Err(ConfigError::invalid(
                "Fd",
                format!("must be in [0, 1], got {}", self.fd),
            ));
        }
        if !(0.0..=1.0).contains(&self.pd) {
            return Err(ConfigError::invalid(
                "Pd",
                format!("must be in [0, 1], got {}", self.pd),
            ));
        }
        if self.attempts == 0 {
            return Err(ConfigError::invalid("attempts", "must be at least 1"));
        }
        Ok(())
    }
}
