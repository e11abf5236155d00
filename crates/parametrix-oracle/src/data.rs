//! Submitted observations

use parametrix_common::{BoundedText, Height, LedgerError, Principal};
use serde::{Deserialize, Serialize};

use crate::oracle::OracleId;

/// Maximum length of an observation payload
pub const DATA_VALUE_MAX_LEN: usize = 256;

/// Opaque observation payload (e.g. "72", "{\"mm\":41.5}")
pub type DataValue = BoundedText<DATA_VALUE_MAX_LEN>;

/// Sequential data point identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(pub u64);

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data/{}", self.0)
    }
}

/// Kind of observation an oracle may submit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Weather,
    Flight,
    Earthquake,
    Temperature,
    Rainfall,
    Custom,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::Weather,
        DataType::Flight,
        DataType::Earthquake,
        DataType::Temperature,
        DataType::Rainfall,
        DataType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Weather => "weather",
            DataType::Flight => "flight",
            DataType::Earthquake => "earthquake",
            DataType::Temperature => "temperature",
            DataType::Rainfall => "rainfall",
            DataType::Custom => "custom",
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(LedgerError::InvalidInput)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation verdict of a data point; leaves `Pending` exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Validated,
    Rejected,
}

impl ValidationStatus {
    pub fn from_verdict(is_valid: bool) -> Self {
        if is_valid {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Rejected
        }
    }
}

/// One observation submitted by an oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: DataId,
    pub oracle_id: OracleId,
    pub data_type: DataType,
    pub value: DataValue,
    /// Height of submission
    pub timestamp: Height,
    pub validation_status: ValidationStatus,
    /// Administrator that issued the verdict
    pub verified_by: Option<Principal>,
}

impl DataPoint {
    pub fn is_validated(&self) -> bool {
        self.validation_status == ValidationStatus::Validated
    }
}
