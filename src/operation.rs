//! Operations flowing through a submission pipeline

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, NameOrAddress, U256};
use serde::Deserialize;

/// A prepared transaction together with the chain it is meant for
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub chain: String,
    pub tx: TypedTransaction,
}

impl Operation {
    pub fn new(chain: impl Into<String>, tx: impl Into<TypedTransaction>) -> Self {
        Self {
            chain: chain.into(),
            tx: tx.into(),
        }
    }

    /// Plain contract call
    pub fn call(chain: impl Into<String>, to: Address, data: Bytes, value: U256) -> Self {
        let tx = Eip1559TransactionRequest::new().to(to).data(data).value(value);
        Self::new(chain, tx)
    }

    /// Recipient address; ENS names are not resolved
    pub fn target(&self) -> Option<Address> {
        match self.tx.to() {
            Some(NameOrAddress::Address(addr)) => Some(*addr),
            _ => None,
        }
    }

    pub fn data(&self) -> Bytes {
        self.tx.data().cloned().unwrap_or_default()
    }

    pub fn value(&self) -> U256 {
        self.tx.value().cloned().unwrap_or_default()
    }
}

/// Operation as written in a transactions file
#[derive(Debug, Clone, Deserialize)]
pub struct RawOperation {
    pub chain: String,
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub value: U256,
    pub gas: Option<U256>,
}

impl From<RawOperation> for Operation {
    fn from(raw: RawOperation) -> Self {
        let mut op = Operation::call(raw.chain, raw.to, raw.data, raw.value);
        if let Some(gas) = raw.gas {
            op.tx.set_gas(gas);
        }
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_operations() {
        let json = r#"[
            {"chain": "ethereum", "to": "0x000000000000000000000000000000000000dEaD", "data": "0x1234", "value": "0x10"},
            {"chain": "arbitrum", "to": "0x000000000000000000000000000000000000bEEF", "gas": "0x5208"}
        ]"#;

        let ops: Vec<Operation> = serde_json::from_str::<Vec<RawOperation>>(json)
            .unwrap()
            .into_iter()
            .map(Operation::from)
            .collect();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].chain, "ethereum");
        assert_eq!(ops[0].data(), Bytes::from(vec![0x12, 0x34]));
        assert_eq!(ops[0].value(), U256::from(16));
        assert_eq!(ops[1].data(), Bytes::default());
        assert_eq!(ops[1].tx.gas(), Some(&U256::from(21_000)));
        assert!(ops[1].target().is_some());
    }
}
