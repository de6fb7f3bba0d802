//! Runs the transaction pipelines: build the envelope, pass it through the confirmation gate
//! and broadcast it.

use std::io::Write;

use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::tendermint::chain::Id;
use cosmrs::tx::Fee;
use cosmrs::{AccountId, Denom};
use error_stack::{report, Result, ResultExt};
use tracing::info;
use typed_builder::TypedBuilder;

use crate::confirm::{self, Mode, Prompt, Verdict};
use crate::cosmos::{self, CosmosClient};
use crate::envelope::{Envelope, HostMsg};
use crate::ethereum::RawTx;
use crate::query::{self, EvmQueryClient};
use crate::report::ResultCompatExt;
use crate::{broadcaster, printer, Error, Outcome};

/// A local key together with the account it controls.
pub struct Signer {
    key: SigningKey,
    address: AccountId,
    chain_id: Id,
}

impl Signer {
    pub fn new(key: SigningKey, address_prefix: &str, chain_id: Id) -> Result<Self, Error> {
        let address = key
            .public_key()
            .account_id(address_prefix)
            .change_context(Error::Keyring)?;

        Ok(Self {
            key,
            address,
            chain_id,
        })
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }
}

#[derive(TypedBuilder)]
pub struct Bridge<Q, C, P, W> {
    query: Q,
    cosmos: C,
    prompt: P,
    /// where printed transactions and receipts go
    out: W,
}

impl<Q, C, P, W> Bridge<Q, C, P, W>
where
    Q: EvmQueryClient,
    C: CosmosClient,
    P: Prompt,
    W: Write,
{
    /// Wraps an externally signed ethereum transaction into a host transaction and, unless
    /// only generating, broadcasts it.
    ///
    /// Generate-only runs offline and charges the fee in `offline_denom`, failing when there
    /// is none. Otherwise the evm denomination is read from the node right before the
    /// envelope is built.
    pub async fn submit_raw_tx(
        &mut self,
        tx_hex: &str,
        mode: Mode,
        offline_denom: Option<Denom>,
    ) -> Result<Outcome, Error> {
        let tx = RawTx::from_hex(tx_hex)
            .change_context(Error::HexDecode)?
            .decode()
            .change_context(Error::Deserialization)?
            .validate()
            .change_context(Error::Validation)?;

        info!(
            tx_hash = ?tx.hash,
            sender = ?tx.sender,
            chain_id = ?tx.tx.chain_id(),
            "decoded ethereum tx"
        );

        let denom = match mode {
            Mode::GenerateOnly => offline_denom
                .ok_or(report!(Error::InvalidInput))
                .attach_printable("generated transactions need a fee denomination")?,
            Mode::SkipConfirmation | Mode::Interactive => query::evm_denom(&mut self.query)
                .await
                .change_context(Error::RemoteQuery)?,
        };
        let envelope = Envelope::ethereum(&tx, denom);

        match confirm::gate(mode, &envelope, &mut self.out, &mut self.prompt)? {
            Verdict::Printed => Ok(Outcome::Completed),
            Verdict::Canceled => Ok(Outcome::Canceled),
            Verdict::Proceed => {
                let tx_bytes = envelope.to_bytes()?;
                self.broadcast(tx_bytes).await
            }
        }
    }

    /// Signs `msg` with the signer's key and broadcasts it. Generate-only prints the unsigned
    /// envelope without looking up the signer's account.
    pub async fn submit_signed<M>(
        &mut self,
        msg: M,
        fee: Fee,
        signer: &Signer,
        mode: Mode,
    ) -> Result<Outcome, Error>
    where
        M: HostMsg,
    {
        let envelope = Envelope::new(msg, fee);

        if mode == Mode::GenerateOnly {
            confirm::gate(mode, &envelope, &mut self.out, &mut self.prompt)?;
            return Ok(Outcome::Completed);
        }

        let account = cosmos::account(&mut self.cosmos, &signer.address)
            .await
            .change_context(Error::RemoteQuery)?;
        info!(
            address = %signer.address,
            account_number = account.account_number,
            sequence = account.sequence,
            "fetched signer account"
        );

        let envelope = envelope.with_signer(signer.key.public_key(), account.sequence);

        match confirm::gate(mode, &envelope, &mut self.out, &mut self.prompt)? {
            Verdict::Printed => Ok(Outcome::Completed),
            Verdict::Canceled => Ok(Outcome::Canceled),
            Verdict::Proceed => {
                let tx_bytes =
                    envelope.sign(&signer.chain_id, account.account_number, &signer.key)?;
                self.broadcast(tx_bytes).await
            }
        }
    }

    async fn broadcast(&mut self, tx_bytes: Vec<u8>) -> Result<Outcome, Error> {
        let receipt = broadcaster::broadcast(&mut self.cosmos, tx_bytes)
            .await
            .change_context(Error::Broadcast)?;
        printer::print(&mut self.out, &receipt)?;

        Ok(Outcome::Completed)
    }
}
