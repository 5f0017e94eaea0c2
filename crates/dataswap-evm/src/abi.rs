//! ABI encoding and decoding for the Dataswap contracts.
//!
//! Bridges `ParamValue` and alloy's `DynSolValue`:
//! - call arguments are encoded against the function's input types
//! - `eth_call` return data is decoded against its output types
//! - transaction calldata is decoded back into a named [`RawMessage`]

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_dyn_abi::Specifier;
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::{Address, B256, I256, U256};
use indexmap::IndexMap;
use std::str::FromStr;

use dataswap_core::error::{DecodeError, TransportError};
use dataswap_core::message::RawMessage;
use dataswap_core::types::ContractKind;
use dataswap_core::value::{ParamValue, Params};

use crate::contracts::{escrow, matching_target, proof, requirement};

/// Function table for one contract, keyed by method name.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    contract: ContractKind,
    functions: IndexMap<String, Function>,
}

impl ContractAbi {
    /// The built-in ABI of a protocol contract.
    pub fn for_contract(contract: ContractKind) -> Result<Self, TransportError> {
        let signatures = match contract {
            ContractKind::Escrow => escrow::ABI,
            ContractKind::DatasetRequirement => requirement::ABI,
            ContractKind::DatasetProof => proof::ABI,
            ContractKind::MatchingTarget => matching_target::ABI,
        };
        Self::from_signatures(contract, signatures)
    }

    /// Build from human-readable signatures,
    /// e.g. `"function getDatasetSize(uint64 datasetId, uint8 dataType) view returns (uint64)"`.
    pub fn from_signatures(contract: ContractKind, signatures: &[&str]) -> Result<Self, TransportError> {
        let mut functions = IndexMap::with_capacity(signatures.len());
        for sig in signatures {
            let func = Function::parse(sig).map_err(|e| TransportError::Abi(format!("'{sig}': {e}")))?;
            functions.insert(func.name.clone(), func);
        }
        Ok(Self { contract, functions })
    }

    /// Build from a standard Ethereum ABI JSON string. For overloaded names
    /// the first definition wins.
    pub fn from_json(contract: ContractKind, abi_json: &str) -> Result<Self, TransportError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)
            .map_err(|e| TransportError::Abi(format!("invalid ABI JSON: {e}")))?;
        let mut functions = IndexMap::new();
        for func in abi.functions() {
            functions.entry(func.name.clone()).or_insert_with(|| func.clone());
        }
        Ok(Self { contract, functions })
    }

    pub fn contract(&self) -> ContractKind {
        self.contract
    }

    /// Function names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.functions.contains_key(method)
    }

    pub fn function(&self, method: &str) -> Result<&Function, TransportError> {
        self.functions
            .get(method)
            .ok_or_else(|| TransportError::Abi(format!("{}: no ABI for function '{method}'", self.contract)))
    }

    /// `selector ++ abi_encode_params(args)`.
    pub fn encode_call(&self, method: &str, args: &[ParamValue]) -> Result<Vec<u8>, TransportError> {
        let func = self.function(method)?;
        if args.len() != func.inputs.len() {
            return Err(TransportError::Abi(format!(
                "{method}: argument count mismatch: ABI has {}, got {}",
                func.inputs.len(),
                args.len()
            )));
        }

        let mut values = Vec::with_capacity(args.len());
        for (param, arg) in func.inputs.iter().zip(args) {
            let ty = resolve(param)?;
            let value = to_dyn_value(arg, &ty)
                .map_err(|e| TransportError::Abi(format!("{method}: param '{}': {e}", param.name)))?;
            values.push(value);
        }

        let mut calldata = func.selector().to_vec();
        calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
        Ok(calldata)
    }

    /// Decode `eth_call` return data.
    ///
    /// No outputs decode to `Null`, a single output to the bare value, and
    /// several outputs to a tuple named after the ABI outputs.
    pub fn decode_output(&self, method: &str, data: &[u8]) -> Result<ParamValue, TransportError> {
        let func = self.function(method)?;
        if func.outputs.is_empty() {
            return Ok(ParamValue::Null);
        }

        let types = func.outputs.iter().map(resolve).collect::<Result<Vec<_>, _>>()?;
        let decoded = DynSolType::Tuple(types)
            .abi_decode_params(data)
            .map_err(|e| TransportError::Abi(format!("{method}: output decode: {e}")))?;

        let mut values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };
        if values.len() == 1 {
            return Ok(from_dyn_value(values.remove(0)));
        }
        Ok(ParamValue::Tuple(
            func.outputs
                .iter()
                .enumerate()
                .zip(values)
                .map(|((i, p), v)| (param_name(p, i, ""), from_dyn_value(v)))
                .collect(),
        ))
    }

    /// Decode transaction calldata into a raw message with named parameters.
    pub fn decode_calldata(&self, calldata: &[u8]) -> Result<RawMessage, DecodeError> {
        if calldata.len() < 4 {
            return Err(DecodeError::InvalidCalldata {
                reason: format!("calldata too short: {} bytes (need at least 4 for selector)", calldata.len()),
            });
        }
        let (selector, input) = calldata.split_at(4);

        let func = self
            .functions
            .values()
            .find(|f| f.selector().as_slice() == selector)
            .ok_or_else(|| DecodeError::UnsupportedMethod {
                contract: self.contract,
                method: format!("0x{}", hex::encode(selector)),
            })?;

        let types = func
            .inputs
            .iter()
            .map(|p| p.resolve())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DecodeError::InvalidCalldata { reason: e.to_string() })?;

        let values = if types.is_empty() {
            Vec::new()
        } else {
            match DynSolType::Tuple(types).abi_decode_params(input) {
                Ok(DynSolValue::Tuple(vals)) => vals,
                Ok(other) => vec![other],
                Err(e) => {
                    return Err(DecodeError::InvalidCalldata {
                        reason: format!("{}: {e}", func.name),
                    })
                }
            }
        };

        let params: Params = func
            .inputs
            .iter()
            .enumerate()
            .zip(values)
            .map(|((i, p), v)| (param_name(p, i, "arg"), from_dyn_value(v)))
            .collect();

        Ok(RawMessage::new(func.name.clone(), params))
    }
}

fn resolve(param: &Param) -> Result<DynSolType, TransportError> {
    param
        .resolve()
        .map_err(|e| TransportError::Abi(format!("type of '{}': {e}", param.name)))
}

fn param_name(param: &Param, index: usize, prefix: &str) -> String {
    if param.name.is_empty() {
        format!("{prefix}{index}")
    } else {
        param.name.clone()
    }
}

// ─── Value conversion ────────────────────────────────────────────────────────

fn mismatch(val: &ParamValue, expected: &DynSolType) -> String {
    format!("cannot convert {} to {expected:?}", val.type_name())
}

fn bytes_of(val: &ParamValue) -> Option<Vec<u8>> {
    match val {
        ParamValue::Bytes(b) => Some(b.clone()),
        ParamValue::Str(s) => s.strip_prefix("0x").and_then(|h| hex::decode(h).ok()),
        _ => None,
    }
}

/// Convert a `ParamValue` into the `DynSolValue` expected by an ABI type.
///
/// Numeric strings are accepted for integer types and `0x` hex strings for
/// byte types.
pub fn to_dyn_value(val: &ParamValue, expected: &DynSolType) -> Result<DynSolValue, String> {
    match expected {
        DynSolType::Bool => val
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| mismatch(val, expected)),

        DynSolType::Uint(bits) => {
            let u = match val {
                ParamValue::BigUint(s) => U256::from_str(s).map_err(|e| format!("uint parse: {e}"))?,
                other => other
                    .as_u128()
                    .map(U256::from)
                    .ok_or_else(|| mismatch(val, expected))?,
            };
            Ok(DynSolValue::Uint(u, *bits))
        }

        DynSolType::Int(bits) => {
            let i = match val {
                ParamValue::Int(i) => I256::try_from(*i).map_err(|e| e.to_string())?,
                ParamValue::Uint(u) => {
                    let narrow = i128::try_from(*u).map_err(|e| e.to_string())?;
                    I256::try_from(narrow).map_err(|e| e.to_string())?
                }
                ParamValue::BigInt(s) | ParamValue::Str(s) => {
                    I256::from_str(s).map_err(|e| format!("int parse: {e}"))?
                }
                _ => return Err(mismatch(val, expected)),
            };
            Ok(DynSolValue::Int(i, *bits))
        }

        DynSolType::Address => {
            let s = val.as_str().ok_or_else(|| mismatch(val, expected))?;
            let addr = Address::from_str(s).map_err(|e| format!("address parse: {e}"))?;
            Ok(DynSolValue::Address(addr))
        }

        DynSolType::Bytes => bytes_of(val)
            .map(DynSolValue::Bytes)
            .ok_or_else(|| mismatch(val, expected)),

        DynSolType::FixedBytes(n) => {
            let b = bytes_of(val).ok_or_else(|| mismatch(val, expected))?;
            if b.len() > *n {
                return Err(format!("bytes{n}: got {} bytes", b.len()));
            }
            let mut word = [0u8; 32];
            word[..b.len()].copy_from_slice(&b);
            Ok(DynSolValue::FixedBytes(B256::from(word), *n))
        }

        DynSolType::String => match val {
            ParamValue::Str(s) => Ok(DynSolValue::String(s.clone())),
            _ => Err(mismatch(val, expected)),
        },

        DynSolType::Array(inner) => {
            let elems = val.elements().ok_or_else(|| mismatch(val, expected))?;
            let values = elems
                .into_iter()
                .map(|e| to_dyn_value(e, inner))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Array(values))
        }

        DynSolType::FixedArray(inner, len) => {
            let elems = val.elements().ok_or_else(|| mismatch(val, expected))?;
            if elems.len() != *len {
                return Err(format!("fixed array length mismatch: expected {len}, got {}", elems.len()));
            }
            let values = elems
                .into_iter()
                .map(|e| to_dyn_value(e, inner))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }

        DynSolType::Tuple(types) => {
            let elems = val.elements().ok_or_else(|| mismatch(val, expected))?;
            if elems.len() != types.len() {
                return Err(format!("tuple arity mismatch: expected {}, got {}", types.len(), elems.len()));
            }
            let values = elems
                .into_iter()
                .zip(types)
                .map(|(e, t)| to_dyn_value(e, t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }

        #[allow(unreachable_patterns)]
        other => Err(format!("unsupported ABI type {other:?}")),
    }
}

/// Convert a decoded `DynSolValue` into a `ParamValue`.
pub fn from_dyn_value(val: DynSolValue) -> ParamValue {
    match val {
        DynSolValue::Bool(b) => ParamValue::Bool(b),

        DynSolValue::Uint(u, _) => match u128::try_from(u) {
            Ok(v) => ParamValue::Uint(v),
            Err(_) => ParamValue::BigUint(u.to_string()),
        },

        DynSolValue::Int(i, _) => match i128::try_from(i) {
            Ok(v) => ParamValue::Int(v),
            Err(_) => ParamValue::BigInt(i.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => ParamValue::Bytes(word[..size].to_vec()),
        DynSolValue::Bytes(b) => ParamValue::Bytes(b),
        DynSolValue::String(s) => ParamValue::Str(s),
        DynSolValue::Address(a) => ParamValue::Address(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            ParamValue::Array(vals.into_iter().map(from_dyn_value).collect())
        }

        DynSolValue::Tuple(fields) => ParamValue::Tuple(
            fields
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), from_dyn_value(v)))
                .collect(),
        ),

        DynSolValue::Function(f) => ParamValue::Bytes(f.to_vec()),

        #[allow(unreachable_patterns)]
        other => ParamValue::Str(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof_abi() -> ContractAbi {
        ContractAbi::for_contract(ContractKind::DatasetProof).unwrap()
    }

    fn word(byte: u8) -> String {
        format!("0x{}", hex::encode([byte; 32]))
    }

    #[test]
    fn builtin_abis_parse() {
        for kind in [
            ContractKind::Escrow,
            ContractKind::DatasetRequirement,
            ContractKind::DatasetProof,
            ContractKind::MatchingTarget,
        ] {
            let abi = ContractAbi::for_contract(kind).unwrap();
            assert_eq!(abi.contract(), kind);
        }
    }

    #[test]
    fn wrong_arg_count_returns_error() {
        let err = proof_abi().encode_call("getDatasetSize", &[ParamValue::Uint(1)]).unwrap_err();
        assert!(err.to_string().contains("argument count mismatch"));
    }

    #[test]
    fn unknown_function_is_an_abi_error() {
        assert!(matches!(
            proof_abi().encode_call("transfer", &[]),
            Err(TransportError::Abi(_))
        ));
    }

    #[test]
    fn simple_call_layout() {
        let calldata = proof_abi()
            .encode_call("getDatasetSize", &[ParamValue::Uint(9), ParamValue::Uint(0)])
            .unwrap();
        // selector + two static words
        assert_eq!(calldata.len(), 4 + 64);
        assert_eq!(calldata[4 + 31], 9);
    }

    #[test]
    fn submit_proof_calldata_decodes_to_named_params() {
        let abi = proof_abi();
        let calldata = abi
            .encode_call(
                "submitDatasetProof",
                &[
                    ParamValue::Uint(9),
                    ParamValue::Uint(0),
                    ParamValue::Array(vec![word(0xaa).into(), word(0xbb).into()]),
                    ParamValue::Uint(0),
                    ParamValue::Array(vec![ParamValue::Uint(1024), ParamValue::Uint(2048)]),
                    ParamValue::Bool(true),
                ],
            )
            .unwrap();

        let msg = abi.decode_calldata(&calldata).unwrap();
        assert_eq!(msg.method, "submitDatasetProof");
        assert_eq!(
            msg.params.keys().map(String::as_str).collect::<Vec<_>>(),
            ["datasetId", "dataType", "leafHashes", "leafIndex", "leafSizes", "completed"]
        );
        assert_eq!(msg.params["datasetId"].as_u64(), Some(9));
        assert_eq!(msg.params["leafHashes"].elements().unwrap()[1].to_text(), Some(word(0xbb)));
        assert_eq!(msg.params["completed"], ParamValue::Bool(true));
    }

    #[test]
    fn unknown_selector_is_unsupported() {
        let err = proof_abi().decode_calldata(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedMethod {
                contract: ContractKind::DatasetProof,
                method: "0xdeadbeef".into()
            }
        );
    }

    #[test]
    fn short_calldata_is_invalid() {
        assert!(matches!(
            proof_abi().decode_calldata(&[0x01]),
            Err(DecodeError::InvalidCalldata { .. })
        ));
    }

    #[test]
    fn multi_output_decodes_to_named_tuple() {
        let abi = ContractAbi::for_contract(ContractKind::MatchingTarget).unwrap();
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(9u64), 64),
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(101u64), 64),
                DynSolValue::Uint(U256::from(102u64), 64),
            ]),
            DynSolValue::Uint(U256::from(2048u64), 64),
            DynSolValue::Uint(U256::from(0u64), 8),
            DynSolValue::Uint(U256::from(0u64), 64),
        ])
        .abi_encode_params();

        let out = abi.decode_output("getMatchingTarget", &data).unwrap();
        assert_eq!(out.field("datasetId").and_then(ParamValue::as_u64), Some(9));
        assert_eq!(out.field("cars").and_then(ParamValue::elements).map(|c| c.len()), Some(2));
    }

    #[test]
    fn single_output_is_unwrapped() {
        let data = DynSolValue::Tuple(vec![DynSolValue::Bool(true)]).abi_encode_params();
        let out = proof_abi().decode_output("isDatasetContainsCar", &data).unwrap();
        assert_eq!(out, ParamValue::Bool(true));
    }

    #[test]
    fn lenient_numeric_arguments() {
        let ty = DynSolType::Uint(64);
        assert_eq!(
            to_dyn_value(&ParamValue::Str("0x10".into()), &ty).unwrap(),
            DynSolValue::Uint(U256::from(16u64), 64)
        );
        assert!(to_dyn_value(&ParamValue::Str("ten".into()), &ty).is_err());
    }

    #[test]
    fn oversized_fixed_bytes_rejected() {
        let ty = DynSolType::FixedBytes(4);
        assert!(to_dyn_value(&ParamValue::Bytes(vec![0; 5]), &ty).is_err());
    }

    #[test]
    fn addresses_come_back_checksummed() {
        let a = Address::from_str("0xd8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap();
        assert_eq!(
            from_dyn_value(DynSolValue::Address(a)),
            ParamValue::Address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into())
        );
    }
}
