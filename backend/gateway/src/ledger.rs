//! The boundary between the gateway and the chain.
//!
//! Everything that talks to a ledger goes through [`Ledger`]: fee conditions,
//! account sequence numbers, simulation, submission and receipt lookup. The
//! production implementation is [`crate::rpc::RpcClient`]; tests substitute an
//! in-memory double.
//!
//! Contract arguments and return values travel in the RPC's JSON rendering of
//! `ScVal` (`{"u64": "5"}`, `{"address": "G..."}`, ...) and are lowered to XDR
//! only when a transaction is built.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    DecoratedSignature, ExtensionPoint, Hash, HostFunction, InvokeContractArgs, InvokeHostFunctionOp,
    LedgerBounds, LedgerFootprint, Limits, Memo, Operation, OperationBody, Preconditions,
    PreconditionsV2, ScSymbol, SequenceNumber, Signature, SignatureHint,
    SorobanAuthorizationEntry, SorobanResources, SorobanTransactionData, Transaction,
    TransactionEnvelope as XdrEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, WriteXdr,
};

use crate::errors::{host_error_code, ContractKind, GatewayError, Result};
use crate::fees::{FeeConditions, FeeQuote};
use crate::signer::Signer;
use crate::xdr;

/// A single contract call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub contract_id: String,
    pub function: String,
    pub args: Vec<Value>,
    /// Table the contract's error codes are decoded with.
    pub codes: ContractKind,
}

impl Invocation {
    pub fn new(contract_id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            function: function.into(),
            args: Vec::new(),
            codes: ContractKind::Other,
        }
    }

    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    pub fn with_codes(mut self, codes: ContractKind) -> Self {
        self.codes = codes;
        self
    }

    pub fn host_function(&self) -> Result<HostFunction> {
        let args = self
            .args
            .iter()
            .map(xdr::to_scval)
            .collect::<Result<Vec<_>>>()?;
        Ok(HostFunction::InvokeContract(InvokeContractArgs {
            contract_address: xdr::sc_address(&self.contract_id)?,
            function_name: ScSymbol(self.function.as_str().try_into()?),
            args: args.try_into()?,
        }))
    }
}

/// Builders for `ScVal` arguments.
pub mod arg {
    use serde_json::{json, Value};

    pub fn address(address: &str) -> Value {
        json!({ "address": address })
    }

    pub fn u32(value: u32) -> Value {
        json!({ "u32": value })
    }

    pub fn u64(value: u64) -> Value {
        json!({ "u64": value.to_string() })
    }

    pub fn i128(value: i128) -> Value {
        json!({ "i128": value.to_string() })
    }

    pub fn string(value: &str) -> Value {
        json!({ "string": value })
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// Resource fee the call consumed, before headroom.
    pub min_resource_fee: u64,
    /// Contract return value, if the call returned one.
    pub result: Option<Value>,
    pub latest_ledger: u32,
    /// Footprint and resource limits the transaction must declare.
    pub resources: Option<SorobanTransactionData>,
    /// Authorization entries the call requires.
    pub auth: Vec<SorobanAuthorizationEntry>,
}

/// A confirmed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Inclusion {
    pub ledger: u32,
    /// Close time of the including ledger (unix seconds).
    pub closed_at: Option<i64>,
    pub return_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TxLookup {
    /// Not yet in a closed ledger (or unknown to the node).
    Pending,
    Success(Inclusion),
    Failed {
        ledger: u32,
        detail: String,
        /// Raw `#[contracterror]` code, when a contract raised one.
        code: Option<u32>,
    },
}

/// An unsigned single-operation Soroban transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEnvelope {
    pub source: String,
    /// Sequence number the transaction consumes.
    pub sequence: i64,
    pub invocation: Invocation,
    pub fee: FeeQuote,
    /// Last ledger in which the transaction may be included; 0 for none.
    pub max_ledger: u32,
    pub resources: Option<SorobanTransactionData>,
    pub auth: Vec<SorobanAuthorizationEntry>,
}

impl TransactionEnvelope {
    pub fn new(
        source: &str,
        sequence: i64,
        invocation: Invocation,
        fee: FeeQuote,
        max_ledger: u32,
    ) -> Self {
        Self {
            source: source.to_string(),
            sequence,
            invocation,
            fee,
            max_ledger,
            resources: None,
            auth: Vec::new(),
        }
    }

    /// Unpriced envelope used only for dry runs.
    pub fn for_simulation(source: &str, invocation: Invocation) -> Self {
        let fee = FeeQuote {
            inclusion_fee: 0,
            priority_fee: None,
            resource_limit: 0,
        };
        Self::new(source, 0, invocation, fee, 0)
    }

    /// Attach the footprint and authorization a simulation produced.
    pub fn with_simulation(mut self, simulation: &Simulation) -> Self {
        self.resources = simulation.resources.clone();
        self.auth = simulation.auth.clone();
        self
    }

    pub fn to_transaction(&self) -> Result<Transaction> {
        let total = self.fee.total();
        let fee = u32::try_from(total).map_err(|_| {
            GatewayError::Validation(format!("fee {total} exceeds the per-transaction maximum"))
        })?;
        let resource_fee = i64::try_from(self.fee.resource_limit).map_err(|_| {
            GatewayError::Validation(format!(
                "resource fee {} is out of range",
                self.fee.resource_limit
            ))
        })?;

        let ext = match &self.resources {
            None if resource_fee == 0 => TransactionExt::V0,
            resources => {
                let mut data = resources.clone().unwrap_or_else(|| SorobanTransactionData {
                    ext: ExtensionPoint::V0,
                    resources: SorobanResources {
                        footprint: LedgerFootprint {
                            read_only: Default::default(),
                            read_write: Default::default(),
                        },
                        instructions: 0,
                        read_bytes: 0,
                        write_bytes: 0,
                    },
                    resource_fee: 0,
                });
                data.resource_fee = resource_fee;
                TransactionExt::V1(data)
            }
        };

        let cond = if self.max_ledger == 0 {
            Preconditions::None
        } else {
            Preconditions::V2(PreconditionsV2 {
                time_bounds: None,
                ledger_bounds: Some(LedgerBounds {
                    min_ledger: 0,
                    max_ledger: self.max_ledger,
                }),
                min_seq_num: None,
                min_seq_age: stellar_xdr::curr::Duration(0),
                min_seq_ledger_gap: 0,
                extra_signers: Default::default(),
            })
        };

        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: self.invocation.host_function()?,
                auth: self.auth.clone().try_into()?,
            }),
        };

        Ok(Transaction {
            source_account: xdr::muxed_account(&self.source)?,
            fee,
            seq_num: SequenceNumber(self.sequence),
            cond,
            memo: Memo::None,
            operations: vec![operation].try_into()?,
            ext,
        })
    }

    /// Hash committed to by signatures: `sha256` of the transaction's
    /// signature payload, which binds it to `sha256(network_passphrase)`.
    pub fn hash(&self, network_passphrase: &str) -> Result<[u8; 32]> {
        let payload = TransactionSignaturePayload {
            network_id: Hash(Sha256::digest(network_passphrase.as_bytes()).into()),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(
                self.to_transaction()?,
            ),
        };
        Ok(Sha256::digest(payload.to_xdr(Limits::none())?).into())
    }

    pub fn sign(self, signer: &dyn Signer, network_passphrase: &str) -> Result<SignedEnvelope> {
        if signer.address() != self.source {
            return Err(GatewayError::Authorization(format!(
                "{} cannot sign for source account {}",
                signer.address(),
                self.source
            )));
        }
        let hash = self.hash(network_passphrase)?;
        let signature = signer.sign(&hash);
        Ok(SignedEnvelope {
            envelope: self,
            hash: hex::encode(hash),
            signature,
        })
    }

    /// Unsigned base64 XDR, as sent for simulation.
    pub fn to_base64(&self) -> Result<String> {
        xdr::encode(&XdrEnvelope::Tx(TransactionV1Envelope {
            tx: self.to_transaction()?,
            signatures: Default::default(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    pub envelope: TransactionEnvelope,
    /// Hex transaction hash.
    pub hash: String,
    /// Ed25519 signature over the hash by the source account.
    pub signature: [u8; 64],
}

impl SignedEnvelope {
    pub fn to_base64(&self) -> Result<String> {
        let key = xdr::account_key(&self.envelope.source)?;
        let decorated = DecoratedSignature {
            hint: SignatureHint([key[28], key[29], key[30], key[31]]),
            signature: Signature(self.signature.try_into()?),
        };
        xdr::encode(&XdrEnvelope::Tx(TransactionV1Envelope {
            tx: self.envelope.to_transaction()?,
            signatures: vec![decorated].try_into()?,
        }))
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn fee_conditions(&self) -> Result<FeeConditions>;

    async fn latest_ledger(&self) -> Result<u32>;

    /// Current sequence number of `account`. The next transaction it sources
    /// must use this plus one.
    async fn sequence(&self, account: &str) -> Result<i64>;

    /// Dry-run `invocation` as `source` (a throwaway account when `None`).
    /// A call the contract rejects surfaces as an error, never as a
    /// `Simulation`.
    async fn simulate(&self, source: Option<&str>, invocation: &Invocation) -> Result<Simulation>;

    /// Hand a signed transaction to the network. Returns its hash once
    /// accepted for inclusion.
    async fn send(&self, envelope: &SignedEnvelope) -> Result<String>;

    async fn transaction(&self, hash: &str) -> Result<TxLookup>;
}

/// Classify a failed simulation by the host error it carries, reading any
/// contract error code with the table of the contract that was called.
pub fn simulation_failure(message: &str, codes: ContractKind) -> GatewayError {
    if let Some(code) = host_error_code(message) {
        return GatewayError::Contract(codes.decode(code));
    }
    if message.contains("Error(Auth") {
        return GatewayError::Authorization(message.to_string());
    }
    GatewayError::Validation(format!("simulation failed: {message}"))
}
