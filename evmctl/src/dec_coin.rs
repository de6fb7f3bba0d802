use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use cosmrs::{Coin, Denom};
use error_stack::{ensure, report, Report, Result, ResultExt};
use num_traits::cast;
use serde::Deserialize;
use serde_with::SerializeDisplay;
use thiserror::Error;

use crate::report::ResultCompatExt;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("parsing failed")]
    ParsingFailed,
    #[error("amount must be a finite, non-negative number")]
    InvalidAmount,
    #[error("fee does not fit into a coin")]
    FeeOutOfRange,
}

/// A decimal coin such as a gas price, written as `<amount><denom>` (e.g. `0.0025orai`).
#[derive(SerializeDisplay, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "String")]
pub struct DecCoin {
    pub denom: Denom,
    pub amount: f64,
}

impl DecCoin {
    pub fn new(amount: f64, denom: &str) -> Result<Self, Error> {
        ensure!(amount.is_finite() && amount >= 0.0, Error::InvalidAmount);

        Ok(DecCoin {
            amount,
            denom: ResultCompatExt::change_context(denom.parse::<Denom>(), Error::ParsingFailed)?,
        })
    }

    /// The fee for `gas` units at this price, rounded up to the next whole coin.
    pub fn fee(&self, gas: u64) -> Result<Coin, Error> {
        let amount = (self.amount * gas as f64).ceil();

        Ok(Coin {
            denom: self.denom.clone(),
            amount: cast(amount).ok_or(report!(Error::FeeOutOfRange))?,
        })
    }
}

impl FromStr for DecCoin {
    type Err = Report<Error>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        match (s.find(char::is_numeric), s.find(char::is_alphabetic)) {
            (Some(0), Some(denom_index)) => {
                let (amount, denom) = s.split_at(denom_index);
                let amount = amount
                    .parse::<f64>()
                    .change_context(Error::ParsingFailed)?;

                DecCoin::new(amount, denom)
            }
            _ => Err(report!(Error::ParsingFailed)),
        }
    }
}

impl TryFrom<String> for DecCoin {
    type Error = Report<Error>;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for DecCoin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecCoin, Error};

    #[test]
    fn correct_parse() {
        assert!(DecCoin::new(1000.00, "orai").is_ok())
    }

    #[test]
    fn invalid_amount() {
        assert!(DecCoin::new(f64::NAN, "orai").is_err());
        assert!(DecCoin::new(f64::INFINITY, "orai").is_err());
        assert!(DecCoin::new(-1.0, "orai").is_err());
    }

    #[test]
    fn invalid_denom() {
        assert!(DecCoin::new(1000.00, "").is_err());
        assert!(DecCoin::new(1000.00, "ax~7").is_err());
    }

    #[test]
    fn parse_from_string() {
        assert_eq!(
            "0.0025orai".parse::<DecCoin>().unwrap(),
            DecCoin::new(0.0025, "orai").unwrap()
        );
        assert_eq!(
            "100aorai".parse::<DecCoin>().unwrap(),
            DecCoin::new(100.0, "aorai").unwrap()
        );
        assert!("orai6".parse::<DecCoin>().is_err());
        assert!("".parse::<DecCoin>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let coin = DecCoin::new(0.0025, "orai").unwrap();

        assert_eq!(coin.to_string(), "0.0025orai");
        assert_eq!(coin.to_string().parse::<DecCoin>().unwrap(), coin);
    }

    #[test]
    fn fee_rounds_up() {
        let coin = DecCoin::new(0.0025, "orai").unwrap();

        let fee = coin.fee(200_001).unwrap();

        assert_eq!(fee.amount, 501);
        assert_eq!(fee.denom.as_ref(), "orai");
        assert_eq!(coin.fee(0).unwrap().amount, 0);
    }

    #[test]
    fn fee_out_of_range() {
        let coin = DecCoin::new(f64::MAX, "orai").unwrap();

        assert_eq!(
            coin.fee(2).unwrap_err().current_context(),
            &Error::FeeOutOfRange
        );
    }
}
