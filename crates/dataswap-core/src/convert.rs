//! Entity converter: pure transforms from protocol aggregates to records.

use crate::error::DecodeError;
use crate::message::ProtocolEvent;
use crate::result;
use crate::types::{Car, CarReplica, DatasetProofData, MatchingTarget, ReplicaState};
use crate::value::ParamValue;

/// One [`Car`] per proof leaf, in leaf order.
///
/// The size at the same position is attached when known. Hex hashes are
/// lowercased so the unique index does not depend on how a source cased them.
pub fn proof_data_to_cars(proof: &DatasetProofData) -> Vec<Car> {
    proof
        .leaf_hashes
        .iter()
        .enumerate()
        .map(|(i, hash)| Car {
            hash: normalize_hash(hash),
            dataset_id: proof.dataset_id,
            data_type: proof.data_type,
            size: proof.leaf_sizes.get(i).copied(),
            replicas_count: proof.replicas_count,
        })
        .collect()
}

/// `0x`-prefixed hex in lowercase; anything else is passed through.
pub fn normalize_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
            format!("0x{}", digits.to_ascii_lowercase())
        }
        _ => hash.to_string(),
    }
}

/// One [`CarReplica`] per car of the target, each in the `Matched` state.
pub fn matching_target_to_car_replicas(target: &MatchingTarget) -> Vec<CarReplica> {
    target
        .cars
        .iter()
        .map(|car_id| CarReplica {
            car_id: *car_id,
            matching_id: target.matching_id,
            state: ReplicaState::Matched,
        })
        .collect()
}

/// Rebuild the proof page carried by a decoded `submitDatasetProof` event.
///
/// The replicas count is not part of the message and is left at zero.
pub fn proof_data_from_event(event: &ProtocolEvent) -> Result<DatasetProofData, DecodeError> {
    if event.method != "submitDatasetProof" {
        return Err(DecodeError::UnsupportedMethod {
            contract: event.contract,
            method: event.method.clone(),
        });
    }
    let param = |name: &str| required(event, name);

    let dataset_id = match event.dataset_id() {
        Some(id) => id,
        None => result::as_u64("datasetId", param("datasetId")?)?,
    };
    Ok(DatasetProofData {
        dataset_id,
        data_type: result::as_data_type("dataType", param("dataType")?)?,
        leaf_hashes: result::as_text_list("leafHashes", param("leafHashes")?)?,
        leaf_sizes: result::as_u64_list("leafSizes", param("leafSizes")?)?,
        replicas_count: 0,
    })
}

fn required<'a>(event: &'a ProtocolEvent, name: &str) -> Result<&'a ParamValue, DecodeError> {
    event
        .param(name)
        .ok_or_else(|| DecodeError::MissingField { field: name.into() })
}
