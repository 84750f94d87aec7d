//! Off-ledger view of a commitment record.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::errors::{GatewayError, Result};
use crate::scval;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "address", rename_all = "snake_case")]
pub enum AssetView {
    Native,
    Token(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    PendingValidation,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    None,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitmentView {
    pub id: u64,
    pub creator: String,
    pub validator: String,
    pub charity: String,
    pub asset: AssetView,
    /// Stake in the asset's smallest unit.
    #[serde(serialize_with = "decimal")]
    pub amount: i128,
    pub deadline: u64,
    pub created_at: u64,
    pub confirmation_time: u64,
    pub validator_deadline: u64,
    pub description: String,
    pub status: Status,
    pub outcome: Outcome,
}

fn decimal<S: Serializer>(value: &i128, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl CommitmentView {
    /// Decode the vault's `Commitment` contract type.
    pub fn from_scval(value: &Value) -> Result<Self> {
        let text = |name: &str| scval::field(value, name).and_then(scval::as_address);
        let number = |name: &str| scval::field(value, name).and_then(scval::as_u64);

        Ok(Self {
            id: number("id")?,
            creator: text("creator")?,
            validator: text("validator")?,
            charity: text("charity")?,
            asset: decode_asset(scval::field(value, "asset")?)?,
            amount: scval::as_i128(scval::field(value, "amount")?)?,
            deadline: number("deadline")?,
            created_at: number("created_at")?,
            confirmation_time: number("confirmation_time")?,
            validator_deadline: number("validator_deadline")?,
            description: scval::as_string(scval::field(value, "description")?)?,
            status: decode_status(scval::field(value, "status")?)?,
            outcome: decode_outcome(scval::field(value, "outcome")?)?,
        })
    }
}

fn unknown(kind: &str, name: &str) -> GatewayError {
    GatewayError::Decode(format!("unknown {kind} variant '{name}'"))
}

fn decode_asset(value: &Value) -> Result<AssetView> {
    match scval::variant(value)? {
        ("Native", _) => Ok(AssetView::Native),
        ("Token", [address, ..]) => Ok(AssetView::Token(scval::as_address(address)?)),
        (name, _) => Err(unknown("asset", name)),
    }
}

fn decode_status(value: &Value) -> Result<Status> {
    match scval::variant(value)?.0 {
        "Active" => Ok(Status::Active),
        "PendingValidation" => Ok(Status::PendingValidation),
        "Resolved" => Ok(Status::Resolved),
        name => Err(unknown("status", name)),
    }
}

fn decode_outcome(value: &Value) -> Result<Outcome> {
    match scval::variant(value)?.0 {
        "None" => Ok(Outcome::None),
        "Success" => Ok(Outcome::Success),
        "Failed" => Ok(Outcome::Failed),
        name => Err(unknown("outcome", name)),
    }
}

#[cfg(test)]
impl CommitmentView {
    /// Render as the RPC would return the contract type.
    pub fn to_scval(&self) -> Value {
        use serde_json::json;

        let unit = |name: &str| json!({ "vec": [{ "symbol": name }] });
        let asset = match &self.asset {
            AssetView::Native => unit("Native"),
            AssetView::Token(addr) => {
                json!({ "vec": [{ "symbol": "Token" }, { "address": addr }] })
            }
        };
        let status = match self.status {
            Status::Active => "Active",
            Status::PendingValidation => "PendingValidation",
            Status::Resolved => "Resolved",
        };
        let outcome = match self.outcome {
            Outcome::None => "None",
            Outcome::Success => "Success",
            Outcome::Failed => "Failed",
        };
        let entry = |k: &str, v: Value| json!({ "key": { "symbol": k }, "val": v });

        json!({ "map": [
            entry("amount", json!({ "i128": self.amount.to_string() })),
            entry("asset", asset),
            entry("charity", json!({ "address": self.charity })),
            entry("confirmation_time", json!({ "u64": self.confirmation_time.to_string() })),
            entry("created_at", json!({ "u64": self.created_at.to_string() })),
            entry("creator", json!({ "address": self.creator })),
            entry("deadline", json!({ "u64": self.deadline.to_string() })),
            entry("description", json!({ "string": self.description })),
            entry("id", json!({ "u64": self.id.to_string() })),
            entry("outcome", unit(outcome)),
            entry("status", unit(status)),
            entry("validator", json!({ "address": self.validator })),
            entry("validator_deadline", json!({ "u64": self.validator_deadline.to_string() })),
        ] })
    }

    pub fn sample(id: u64) -> Self {
        Self {
            id,
            creator: "GCREATOR".into(),
            validator: "GVALIDATOR".into(),
            charity: "GCHARITY".into(),
            asset: AssetView::Token("CTOKEN".into()),
            amount: 100,
            deadline: 1_000,
            created_at: 500,
            confirmation_time: 0,
            validator_deadline: 0,
            description: "run a marathon".into(),
            status: Status::Active,
            outcome: Outcome::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_contract_record() {
        let mut expected = CommitmentView::sample(3);
        expected.status = Status::PendingValidation;
        expected.confirmation_time = 900;
        expected.validator_deadline = 900 + 86_400;

        assert_eq!(CommitmentView::from_scval(&expected.to_scval()).unwrap(), expected);
    }

    #[test]
    fn native_asset_and_resolution() {
        let mut record = CommitmentView::sample(1);
        record.asset = AssetView::Native;
        record.status = Status::Resolved;
        record.outcome = Outcome::Failed;

        let decoded = CommitmentView::from_scval(&record.to_scval()).unwrap();
        assert_eq!(decoded.asset, AssetView::Native);
        assert_eq!(decoded.outcome, Outcome::Failed);
    }

    #[test]
    fn serializes_amount_as_decimal_string() {
        let mut record = CommitmentView::sample(1);
        record.amount = i128::MAX;
        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body["amount"], json!(i128::MAX.to_string()));
        assert_eq!(body["status"], json!("active"));
        assert_eq!(body["asset"], json!({ "kind": "token", "address": "CTOKEN" }));
    }

    #[test]
    fn rejects_unknown_variants() {
        let mut value = CommitmentView::sample(1).to_scval();
        value["map"][10]["val"] = json!({ "vec": [{ "symbol": "Cancelled" }] });
        assert!(matches!(
            CommitmentView::from_scval(&value),
            Err(GatewayError::Decode(msg)) if msg.contains("Cancelled")
        ));
    }
}
