//! Result decoder: rebuilds value objects from raw call results.
//!
//! Chain calls return positional tuples (or, depending on the client, tuples
//! with member names). The functions here accept either shape: a named member
//! wins, otherwise the member at the declared position is used.

use crate::error::DecodeError;
use crate::types::{DataType, DatasetRequirement, Fund, MatchingTarget};
use crate::value::ParamValue;

fn member<'a>(raw: &'a ParamValue, index: usize, name: &str) -> Result<&'a ParamValue, DecodeError> {
    if let Some(v) = raw.field(name) {
        return Ok(v);
    }
    raw.elements()
        .and_then(|items| items.get(index).copied())
        .ok_or_else(|| DecodeError::MissingField { field: name.into() })
}

fn mismatch(field: &str, expected: &str, got: &ParamValue) -> DecodeError {
    DecodeError::TypeMismatch {
        field: field.into(),
        expected: expected.into(),
        got: got.type_name().into(),
    }
}

/// Decode a u64 result.
pub fn as_u64(field: &str, raw: &ParamValue) -> Result<u64, DecodeError> {
    raw.as_u64().ok_or_else(|| mismatch(field, "uint64", raw))
}

/// Decode a u128 result (token amounts).
pub fn as_u128(field: &str, raw: &ParamValue) -> Result<u128, DecodeError> {
    raw.as_u128().ok_or_else(|| mismatch(field, "uint128", raw))
}

pub fn as_bool(field: &str, raw: &ParamValue) -> Result<bool, DecodeError> {
    raw.as_bool().ok_or_else(|| mismatch(field, "bool", raw))
}

/// Decode a textual result (string, address, or bytes rendered as hex).
pub fn as_text(field: &str, raw: &ParamValue) -> Result<String, DecodeError> {
    raw.to_text().ok_or_else(|| mismatch(field, "string", raw))
}

pub fn as_text_list(field: &str, raw: &ParamValue) -> Result<Vec<String>, DecodeError> {
    let items = raw.elements().ok_or_else(|| mismatch(field, "array", raw))?;
    items.into_iter().map(|v| as_text(field, v)).collect()
}

pub fn as_u64_list(field: &str, raw: &ParamValue) -> Result<Vec<u64>, DecodeError> {
    let items = raw.elements().ok_or_else(|| mismatch(field, "array", raw))?;
    items.into_iter().map(|v| as_u64(field, v)).collect()
}

pub fn as_data_type(field: &str, raw: &ParamValue) -> Result<DataType, DecodeError> {
    raw.as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .and_then(DataType::from_u8)
        .ok_or_else(|| mismatch(field, "DataType", raw))
}

/// Decode an escrow `(available, collateral, lock)` tuple.
pub fn decode_fund(raw: &ParamValue) -> Result<Fund, DecodeError> {
    Ok(Fund {
        available: as_u128("available", member(raw, 0, "available")?)?,
        collateral: as_u128("collateral", member(raw, 1, "collateral")?)?,
        lock: as_u128("lock", member(raw, 2, "lock")?)?,
    })
}

/// Decode a matching target tuple, injecting the id it was fetched by.
pub fn decode_matching_target(matching_id: u64, raw: &ParamValue) -> Result<MatchingTarget, DecodeError> {
    Ok(MatchingTarget {
        matching_id,
        dataset_id: as_u64("datasetId", member(raw, 0, "datasetId")?)?,
        cars: as_u64_list("cars", member(raw, 1, "cars")?)?,
        size: as_u64("size", member(raw, 2, "size")?)?,
        data_type: as_data_type("dataType", member(raw, 3, "dataType")?)?,
        associated_mapping_files_matching_id: as_u64(
            "associatedMappingFilesMatchingID",
            member(raw, 4, "associatedMappingFilesMatchingID")?,
        )?,
    })
}

/// Decode one replica requirement tuple.
pub fn decode_dataset_requirement(raw: &ParamValue) -> Result<DatasetRequirement, DecodeError> {
    Ok(DatasetRequirement {
        data_preparers: as_text_list("dataPreparers", member(raw, 0, "dataPreparers")?)?,
        storage_providers: as_text_list("storageProviders", member(raw, 1, "storageProviders")?)?,
        region_code: as_u64("regionCode", member(raw, 2, "regionCode")?)?,
        country_code: as_u64("countryCode", member(raw, 3, "countryCode")?)?,
        city_codes: as_u64_list("cityCodes", member(raw, 4, "cityCodes")?)?,
    })
}
