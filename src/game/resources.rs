//! Player wallets and the three-bowl energy pool.

use std::fmt;

use crate::error::{EngineError, EngineResult};

/// A cost in wallet resources plus spendable power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cost {
    /// Coins to pay.
    pub coins: u32,
    /// Workers to pay.
    pub workers: u32,
    /// Priests to pay.
    pub priests: u32,
    /// Power to spend from bowl 3.
    pub power: u32,
}

impl Cost {
    /// A cost in coins and workers only.
    #[must_use]
    pub const fn cw(coins: u32, workers: u32) -> Self {
        Self {
            coins,
            workers,
            priests: 0,
            power: 0,
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}C/{}W/{}P/{}PW",
            self.coins, self.workers, self.priests, self.power
        )
    }
}

/// An income grant; power is cycled through the bowls on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Income {
    /// Coins gained.
    pub coins: u32,
    /// Workers gained.
    pub workers: u32,
    /// Priests gained (subject to the 7-priest cap).
    pub priests: u32,
    /// Power gained (cycled through the bowls).
    pub power: u32,
}

impl Income {
    /// Component-wise sum.
    #[must_use]
    pub const fn plus(self, other: Income) -> Income {
        Income {
            coins: self.coins + other.coins,
            workers: self.workers + other.workers,
            priests: self.priests + other.priests,
            power: self.power + other.power,
        }
    }
}

/// The three-tier energy pool.
///
/// Energy flows 1 → 2 → 3 when gained, 3 → 1 when spent. Burning removes
/// one token from bowl 2 for every token promoted from bowl 2 to bowl 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerBowls {
    /// Inactive energy.
    pub bowl1: u32,
    /// Energy ready to cycle.
    pub bowl2: u32,
    /// Spendable energy.
    pub bowl3: u32,
}

impl PowerBowls {
    /// Create a pool with the given distribution.
    #[must_use]
    pub const fn new(bowl1: u32, bowl2: u32, bowl3: u32) -> Self {
        Self { bowl1, bowl2, bowl3 }
    }

    /// Total energy across all bowls.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.bowl1 + self.bowl2 + self.bowl3
    }

    /// Gain energy, draining bowl 1 before bowl 2 cycles to bowl 3.
    ///
    /// Returns the amount actually absorbed (gains beyond capacity are lost).
    pub fn gain(&mut self, amount: u32) -> u32 {
        let from1 = amount.min(self.bowl1);
        self.bowl1 -= from1;
        self.bowl2 += from1;

        let from2 = (amount - from1).min(self.bowl2);
        self.bowl2 -= from2;
        self.bowl3 += from2;

        from1 + from2
    }

    /// The most energy a further gain could absorb.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.bowl1 + self.bowl2
    }

    /// Whether `amount` can be spent from bowl 3.
    #[must_use]
    pub const fn can_spend(&self, amount: u32) -> bool {
        self.bowl3 >= amount
    }

    /// Spend energy from bowl 3; it returns to bowl 1.
    ///
    /// # Errors
    ///
    /// Returns an error if bowl 3 holds less than `amount`.
    pub fn spend(&mut self, amount: u32) -> EngineResult<()> {
        if self.bowl3 < amount {
            return Err(EngineError::InsufficientResources {
                needed: format!("{amount} power in bowl 3"),
                held: format!("{}", self.bowl3),
            });
        }
        self.bowl3 -= amount;
        self.bowl1 += amount;
        Ok(())
    }

    /// Burn: promote `amount` tokens from bowl 2 to bowl 3, destroying the
    /// same number of bowl-2 tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if bowl 2 holds less than `2 * amount`.
    pub fn burn(&mut self, amount: u32) -> EngineResult<()> {
        let cost = amount * 2;
        if self.bowl2 < cost {
            return Err(EngineError::InsufficientResources {
                needed: format!("{cost} power in bowl 2"),
                held: format!("{}", self.bowl2),
            });
        }
        self.bowl2 -= cost;
        self.bowl3 += amount;
        Ok(())
    }
}

/// A player's spendable holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    /// Coins held.
    pub coins: u32,
    /// Workers held.
    pub workers: u32,
    /// Priests held (wallet only; priests parked on cult tracks are
    /// tracked by the cult board).
    pub priests: u32,
    /// The energy pool.
    pub power: PowerBowls,
}

/// Total priests a player ever owns, across wallet and cult tracks.
pub const PRIEST_CAP: u32 = 7;

impl Wallet {
    /// Create a wallet from starting values.
    #[must_use]
    pub const fn new(coins: u32, workers: u32, priests: u32, bowl1: u32, bowl2: u32) -> Self {
        Self {
            coins,
            workers,
            priests,
            power: PowerBowls::new(bowl1, bowl2, 0),
        }
    }

    /// Whether the wallet covers a cost.
    #[must_use]
    pub const fn can_afford(&self, cost: Cost) -> bool {
        self.coins >= cost.coins
            && self.workers >= cost.workers
            && self.priests >= cost.priests
            && self.power.can_spend(cost.power)
    }

    /// Pay a cost.
    ///
    /// # Errors
    ///
    /// Returns an error naming the full cost if any part is not covered.
    pub fn spend(&mut self, cost: Cost) -> EngineResult<()> {
        if !self.can_afford(cost) {
            return Err(EngineError::InsufficientResources {
                needed: format!("{cost}"),
                held: format!(
                    "{}C/{}W/{}P/{}PW",
                    self.coins, self.workers, self.priests, self.power.bowl3
                ),
            });
        }
        self.coins -= cost.coins;
        self.workers -= cost.workers;
        self.priests -= cost.priests;
        if cost.power > 0 {
            self.power.spend(cost.power)?;
        }
        Ok(())
    }

    /// Apply an income grant. `parked_priests` is the number of priests the
    /// player has permanently placed on cult tracks; priest gains beyond the
    /// 7-priest ownership cap are forfeited.
    pub fn gain(&mut self, income: Income, parked_priests: u32) {
        self.coins += income.coins;
        self.workers += income.workers;
        let headroom = PRIEST_CAP
            .saturating_sub(parked_priests)
            .saturating_sub(self.priests);
        self.priests += income.priests.min(headroom);
        if income.power > 0 {
            self.power.gain(income.power);
        }
    }

    /// Convert energy from bowl 3 into coins, 1:1.
    ///
    /// # Errors
    ///
    /// Returns an error if bowl 3 is short.
    pub fn convert_power_to_coins(&mut self, coins: u32) -> EngineResult<()> {
        self.power.spend(coins)?;
        self.coins += coins;
        Ok(())
    }

    /// Convert energy from bowl 3 into workers, 3:1.
    ///
    /// # Errors
    ///
    /// Returns an error if bowl 3 is short.
    pub fn convert_power_to_workers(&mut self, workers: u32) -> EngineResult<()> {
        self.power.spend(workers * 3)?;
        self.workers += workers;
        Ok(())
    }

    /// Convert energy from bowl 3 into priests, 5:1, subject to the cap.
    ///
    /// # Errors
    ///
    /// Returns an error if bowl 3 is short.
    pub fn convert_power_to_priests(&mut self, priests: u32, parked_priests: u32) -> EngineResult<()> {
        self.power.spend(priests * 5)?;
        let headroom = PRIEST_CAP
            .saturating_sub(parked_priests)
            .saturating_sub(self.priests);
        self.priests += priests.min(headroom);
        Ok(())
    }

    /// Convert priests into workers, 1:1.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet holds too few priests.
    pub fn convert_priests_to_workers(&mut self, workers: u32) -> EngineResult<()> {
        if self.priests < workers {
            return Err(EngineError::InsufficientResources {
                needed: format!("{workers} priests"),
                held: format!("{}", self.priests),
            });
        }
        self.priests -= workers;
        self.workers += workers;
        Ok(())
    }

    /// Convert workers into coins, 1:1.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet holds too few workers.
    pub fn convert_workers_to_coins(&mut self, coins: u32) -> EngineResult<()> {
        if self.workers < coins {
            return Err(EngineError::InsufficientResources {
                needed: format!("{coins} workers"),
                held: format!("{}", self.workers),
            });
        }
        self.workers -= coins;
        self.coins += coins;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_drains_bowl_one_first() {
        let mut bowls = PowerBowls::new(5, 7, 0);
        assert_eq!(bowls.gain(3), 3);
        assert_eq!(bowls, PowerBowls::new(2, 10, 0));
        assert_eq!(bowls.gain(4), 4);
        assert_eq!(bowls, PowerBowls::new(0, 10, 2));
    }

    #[test]
    fn test_gain_beyond_capacity_is_lost() {
        let mut bowls = PowerBowls::new(1, 1, 0);
        assert_eq!(bowls.gain(10), 3);
        assert_eq!(bowls, PowerBowls::new(0, 0, 2));
        assert_eq!(bowls.gain(5), 0);
    }

    #[test]
    fn test_spend_returns_to_bowl_one() {
        let mut bowls = PowerBowls::new(0, 0, 6);
        bowls.spend(4).expect("spendable");
        assert_eq!(bowls, PowerBowls::new(4, 0, 2));
        assert!(bowls.spend(3).is_err());
    }

    #[test]
    fn test_burn_is_two_for_one() {
        let mut bowls = PowerBowls::new(0, 7, 0);
        bowls.burn(3).expect("burnable");
        assert_eq!(bowls, PowerBowls::new(0, 1, 3));
        assert!(bowls.burn(1).is_err());
    }

    #[test]
    fn test_wallet_spend_checks_everything() {
        let mut wallet = Wallet::new(4, 2, 0, 0, 0);
        wallet.power.bowl3 = 1;
        assert!(wallet.spend(Cost { coins: 4, workers: 2, priests: 0, power: 1 }).is_ok());
        assert_eq!(wallet.coins, 0);
        assert_eq!(wallet.workers, 0);
        assert!(wallet.spend(Cost::cw(1, 0)).is_err());
    }

    #[test]
    fn test_priest_cap_counts_parked_priests() {
        let mut wallet = Wallet::new(0, 0, 2, 0, 0);
        // 4 parked: headroom is 7 - 4 - 2 = 1.
        wallet.gain(
            Income {
                priests: 3,
                ..Income::default()
            },
            4,
        );
        assert_eq!(wallet.priests, 3);
    }

    #[test]
    fn test_conversions() {
        let mut wallet = Wallet::new(0, 4, 1, 0, 0);
        wallet.power.bowl3 = 9;
        wallet.convert_power_to_coins(1).expect("1 PW to 1 C");
        wallet.convert_power_to_workers(2).expect("6 PW to 2 W");
        assert_eq!(wallet.coins, 1);
        assert_eq!(wallet.workers, 6);
        assert_eq!(wallet.power.bowl3, 2);
        wallet.convert_priests_to_workers(1).expect("1 P to 1 W");
        assert_eq!(wallet.priests, 0);
        wallet.convert_workers_to_coins(3).expect("3 W to 3 C");
        assert_eq!(wallet.coins, 4);
        assert_eq!(wallet.workers, 4);
    }
}
