//! Data model shared by the provisioner, the workflow and the engine boundary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// File name of the multiplier proving key.
pub const MULTIPLIER2_ZKEY_NAME: &str = "multiplier2_final.zkey";

/// Pinned location of the multiplier proving key.
pub const MULTIPLIER2_ZKEY_URL: &str = "https://github.com/zkmopro/mopro/raw/ae88356e680ac4d785183267d6147167fabe071c/test-vectors/circom/multiplier2_final.zkey";

/// Anything smaller is treated as a truncated download.
pub const MULTIPLIER2_MIN_SIZE_BYTES: u64 = 6_000_000;

const FILE_SCHEME: &str = "file://";

/// A named binary blob the proof engine needs on local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingArtifact {
    /// Logical identifier (kind/version)
    pub name: String,
    /// Filesystem location, optionally with a `file://` prefix
    pub local_path: String,
    /// URL to fetch from when the local copy is missing or undersized
    pub remote_source: String,
    /// Files smaller than this are considered corrupt or incomplete
    pub minimum_valid_size_bytes: u64,
}

impl ProvingArtifact {
    pub fn new(
        name: impl Into<String>,
        local_path: impl Into<String>,
        remote_source: impl Into<String>,
        minimum_valid_size_bytes: u64,
    ) -> Self {
        ProvingArtifact {
            name: name.into(),
            local_path: local_path.into(),
            remote_source: remote_source.into(),
            minimum_valid_size_bytes,
        }
    }

    /// The multiplier proving key stored inside `dir`.
    pub fn multiplier2(dir: &Path) -> Self {
        Self::new(
            MULTIPLIER2_ZKEY_NAME,
            dir.join(MULTIPLIER2_ZKEY_NAME).to_string_lossy(),
            MULTIPLIER2_ZKEY_URL,
            MULTIPLIER2_MIN_SIZE_BYTES,
        )
    }

    /// Bare filesystem path, as expected by the engine boundary.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(strip_file_scheme(&self.local_path))
    }
}

/// Strip a leading `file://` scheme, if any.
pub fn strip_file_scheme(path: &str) -> &str {
    path.strip_prefix(FILE_SCHEME).unwrap_or(path)
}

/// Returns true for an optionally negative, non-empty run of ASCII digits.
pub fn is_decimal_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("signal name must not be empty")]
    EmptySignalName,
    #[error("value {value:?} for signal '{signal}' is not a decimal integer")]
    NotNumeric { signal: String, value: String },
}

/// Circuit inputs keyed by signal name.
///
/// Values are decimal strings so that field elements larger than any native
/// integer type reach the engine unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct CircuitInputs {
    signals: BTreeMap<String, Vec<String>>,
}

impl CircuitInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal with its ordered values.
    pub fn with_signal<I, S>(mut self, name: impl Into<String>, values: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(InputError::EmptySignalName);
        }
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if let Some(bad) = values.iter().find(|v| !is_decimal_numeric(v)) {
            return Err(InputError::NotNumeric {
                signal: name,
                value: bad.clone(),
            });
        }
        self.signals.insert(name, values);
        Ok(self)
    }

    /// Inputs for the two-signal multiplier circuit: `{"a": [a], "b": [b]}`.
    pub fn multiplier(a: impl Into<String>, b: impl Into<String>) -> Result<Self, InputError> {
        Self::new().with_signal("a", [a.into()])?.with_signal("b", [b.into()])
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    pub fn signals(&self) -> &BTreeMap<String, Vec<String>> {
        &self.signals
    }

    /// JSON form handed to the engine.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.signals)
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for CircuitInputs {
    type Error = InputError;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        map.into_iter()
            .try_fold(CircuitInputs::new(), |acc, (name, values)| acc.with_signal(name, values))
    }
}

impl From<CircuitInputs> for BTreeMap<String, Vec<String>> {
    fn from(inputs: CircuitInputs) -> Self {
        inputs.signals
    }
}

/// Proof payload plus the public inputs that accompanied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofResult {
    /// Opaque proof structure, replayed verbatim into verification
    pub proof: Value,
    /// Public inputs as decimal strings
    pub inputs: Vec<String>,
}

impl ProofResult {
    /// Validate the shape of a raw engine response.
    ///
    /// The error string describes what was wrong; it is meant for logs, not
    /// for the caller.
    pub fn from_engine_value(value: Value) -> Result<Self, String> {
        let mut object = match value {
            Value::Object(object) => object,
            Value::Null => return Err("engine returned null".to_string()),
            other => return Err(format!("engine returned {} instead of an object", kind_of(&other))),
        };

        let proof = match object.remove("proof") {
            Some(Value::Null) | None => return Err("response has no `proof` field".to_string()),
            Some(proof) => proof,
        };

        let inputs = match object.remove("inputs") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(format!("`inputs` is {} instead of an array", kind_of(&other)));
            }
            None => return Err("response has no `inputs` field".to_string()),
        };

        let inputs = inputs
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) if is_decimal_numeric(&s) => Ok(s),
                other => Err(format!("public input #{i} is not a decimal string: {other}")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProofResult { proof, inputs })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
