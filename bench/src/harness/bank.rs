//! A bank whose withdrawals may be declined.
//!
//! Each input value `v` is a withdrawal of `v` from account `v % accounts` into the bank's vault.
//! The account is debited before its balance is checked, so a declined withdrawal has already
//! modified the state and depends on the region discarding those effects.

use std::ops::Range;

use log::trace;
use thiserror::Error;
use tmsync::Shared;

use super::{Input, Workload};
use crate::collections::OrderedMap;

/// Why a withdrawal was declined.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Declined {
    /// No account with that number exists.
    #[error("account {0} does not exist")]
    NoAccount(u32),
    /// The withdrawal would overdraw the account.
    #[error("withdrawing {amount} would overdraw account {account}")]
    InsufficientFunds {
        /// Account number.
        account: u32,
        /// Requested amount.
        amount: i64,
    },
}

/// Shared state of [`BankTest`].
#[derive(Debug, Clone, Default)]
pub struct Bank {
    accounts: OrderedMap<u32, i64>,
    vault: i64,
    committed: usize,
    declined: usize,
}

impl Bank {
    /// Opens `accounts` accounts holding `balance` each.
    pub fn open(accounts: u32, balance: i64) -> Self {
        Self {
            accounts: (0..accounts).map(|account| (account, balance)).collect(),
            ..Self::default()
        }
    }

    /// Moves `amount` from `account` into the vault.
    pub fn withdraw(&mut self, account: u32, amount: i64) -> Result<i64, Declined> {
        let pos = self
            .accounts
            .find(&account)
            .ok_or(Declined::NoAccount(account))?;
        let balance = self
            .accounts
            .value_mut(pos)
            .map_err(|_| Declined::NoAccount(account))?;
        *balance -= amount;
        let remaining = *balance;
        self.vault += amount;
        if remaining < 0 {
            return Err(Declined::InsufficientFunds { account, amount });
        }
        self.committed += 1;
        Ok(remaining)
    }

    /// Total held by accounts and vault.
    pub fn total(&self) -> i64 {
        self.accounts.values().sum::<i64>() + self.vault
    }

    /// Amount collected in the vault.
    pub fn vault(&self) -> i64 {
        self.vault
    }

    /// Balance of `account`.
    pub fn balance(&self, account: u32) -> Option<i64> {
        let pos = self.accounts.find(&account)?;
        self.accounts.get(pos).ok().map(|(_, balance)| *balance)
    }

    /// Withdrawals that went through.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Withdrawals that were declined.
    pub fn declined(&self) -> usize {
        self.declined
    }
}

/// Concurrent withdrawals against a fixed set of accounts.
#[derive(Debug, Clone, Copy)]
pub struct BankTest {
    accounts: u32,
    opening_balance: i64,
}

impl BankTest {
    /// A bank with `accounts` accounts opened with `opening_balance` each.
    ///
    /// # Panics
    ///
    /// Panics if `accounts` is zero.
    pub fn new(accounts: u32, opening_balance: i64) -> Self {
        assert!(accounts > 0, "a bank needs at least one account");
        Self {
            accounts,
            opening_balance,
        }
    }
}

impl Default for BankTest {
    fn default() -> Self {
        Self::new(16, 5_000)
    }
}

impl Workload for BankTest {
    type State = Bank;

    fn name(&self) -> &'static str {
        "BankTest"
    }

    fn setup(&self, _input: &Input) -> Bank {
        Bank::open(self.accounts, self.opening_balance)
    }

    fn run(&self, shared: &Shared<Bank>, input: &Input, worker: usize, range: Range<usize>) {
        let mut declined = 0;
        for &amount in &input.values()[range] {
            let account = (amount as u64 % u64::from(self.accounts)) as u32;
            if let Err(reason) = shared.atomically(|bank| bank.withdraw(account, amount)) {
                trace!("worker {worker}: {reason}");
                declined += 1;
            }
        }
        shared.critical(|bank| bank.declined += declined);
    }

    fn check(&self, input: &Input, bank: &mut Bank) -> bool {
        let opened = i64::from(self.accounts) * self.opening_balance;
        bank.total() == opened
            && bank.accounts.values().all(|balance| *balance >= 0)
            && bank.committed + bank.declined == input.len()
            && bank.accounts.len() == self.accounts as usize
            && bank.accounts.validate().is_ok()
    }
}
