//! Metering of work done during queries, simulations, and transaction validation.

use super::data_types::GasLimit;

/// Counts units of gas consumed against a fixed [`GasLimit`].
#[derive(Clone, Debug)]
pub struct GasMeter {
    limit: GasLimit,
    consumed: u64,
}

impl GasMeter {
    /// Create a new `GasMeter` that has consumed nothing.
    pub fn new(limit: GasLimit) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Consume `amount` units of gas.
    ///
    /// If consuming `amount` would exceed the limit, the meter saturates at the limit and an
    /// [`OutOfGas`] is returned.
    pub fn consume(&mut self, amount: u64) -> Result<(), OutOfGas> {
        let wanted = self.consumed.saturating_add(amount);
        if wanted > self.limit.int() {
            self.consumed = self.limit.int();
            return Err(OutOfGas {
                limit: self.limit,
                wanted,
            });
        }
        self.consumed = wanted;
        Ok(())
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

/// Returned by [`GasMeter::consume`] when the gas limit would be exceeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("out of gas: limit {limit}, wanted {wanted}")]
pub struct OutOfGas {
    pub limit: GasLimit,
    pub wanted: u64,
}
