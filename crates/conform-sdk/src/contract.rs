//! JSON ABI parsing and contract call helpers

use bytes::Bytes;
use conform_crypto::keccak256;
use conform_primitives::H256;
use serde::Deserialize;

use crate::abi::{decode, encode, encode_function_call, function_selector, parse_type, ParamType, Token};
use crate::SdkError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    indexed: bool,
}

/// Named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parameter type
    pub kind: ParamType,
    /// Indexed (event parameters only)
    pub indexed: bool,
}

impl Param {
    fn parse(raw: RawParam) -> Result<Self, SdkError> {
        Ok(Self {
            kind: parse_type(&raw.kind)?,
            name: raw.name,
            indexed: raw.indexed,
        })
    }
}

fn parse_params(raw: Vec<RawParam>) -> Result<Vec<Param>, SdkError> {
    raw.into_iter().map(Param::parse).collect()
}

fn canonical(name: &str, params: &[Param]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.kind.to_string()).collect();
    format!("{}({})", name, types.join(","))
}

/// Contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Inputs
    pub inputs: Vec<Param>,
    /// Outputs
    pub outputs: Vec<Param>,
    /// `pure`, `view`, `nonpayable` or `payable`
    pub state_mutability: String,
}

impl Function {
    /// Canonical signature, e.g. `increment(uint256)`
    pub fn signature(&self) -> String {
        canonical(&self.name, &self.inputs)
    }

    /// 4-byte selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Whether the function can be run with `eth_call` without a transaction
    pub fn is_read_only(&self) -> bool {
        matches!(self.state_mutability.as_str(), "view" | "pure")
    }
}

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name
    pub name: String,
    /// Inputs
    pub inputs: Vec<Param>,
    /// Anonymous events carry no signature topic
    pub anonymous: bool,
}

impl Event {
    /// Canonical signature, e.g. `Increment(address,uint256)`
    pub fn signature(&self) -> String {
        canonical(&self.name, &self.inputs)
    }

    /// First log topic: keccak-256 of the signature
    pub fn topic(&self) -> H256 {
        keccak256(self.signature().as_bytes())
    }
}

/// Parsed JSON ABI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    /// Constructor inputs, if a constructor is declared
    pub constructor: Option<Vec<Param>>,
    /// Functions in declaration order
    pub functions: Vec<Function>,
    /// Events in declaration order
    pub events: Vec<Event>,
}

impl Abi {
    /// Parse the standard JSON ABI, validating every parameter type
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let entries: Vec<RawEntry> = serde_json::from_str(json)?;
        let mut abi = Abi::default();

        for entry in entries {
            match entry.kind.as_str() {
                "constructor" => abi.constructor = Some(parse_params(entry.inputs)?),
                "function" => {
                    let name = entry
                        .name
                        .ok_or_else(|| SdkError::AbiEncode("function without a name".into()))?;
                    abi.functions.push(Function {
                        name,
                        inputs: parse_params(entry.inputs)?,
                        outputs: parse_params(entry.outputs)?,
                        state_mutability: entry
                            .state_mutability
                            .unwrap_or_else(|| "nonpayable".to_string()),
                    });
                }
                "event" => {
                    let name = entry
                        .name
                        .ok_or_else(|| SdkError::AbiEncode("event without a name".into()))?;
                    abi.events.push(Event {
                        name,
                        inputs: parse_params(entry.inputs)?,
                        anonymous: entry.anonymous,
                    });
                }
                // fallback/receive/error carry nothing we call into
                "fallback" | "receive" | "error" => {}
                other => {
                    return Err(SdkError::AbiEncode(format!("unknown abi entry type {:?}", other)))
                }
            }
        }

        Ok(abi)
    }
}

fn check_args(what: &str, params: &[Param], args: &[Token]) -> Result<(), SdkError> {
    if params.len() != args.len() {
        return Err(SdkError::AbiEncode(format!(
            "{}: expected {} arguments, got {}",
            what,
            params.len(),
            args.len()
        )));
    }
    for (i, (param, arg)) in params.iter().zip(args).enumerate() {
        if !arg.matches(&param.kind) {
            return Err(SdkError::AbiEncode(format!(
                "{}: argument {} is not a valid {}",
                what, i, param.kind
            )));
        }
    }
    Ok(())
}

/// Contract helper for encoding/decoding function calls
#[derive(Debug, Clone)]
pub struct Contract {
    abi: Abi,
}

impl Contract {
    /// Wrap a parsed ABI
    pub fn from_abi(abi: Abi) -> Self {
        Self { abi }
    }

    /// The underlying ABI
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Get a function by name
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.functions.iter().find(|f| f.name == name)
    }

    /// Get an event by name
    pub fn event(&self, name: &str) -> Option<&Event> {
        self.abi.events.iter().find(|e| e.name == name)
    }

    fn require_function(&self, name: &str) -> Result<&Function, SdkError> {
        self.function(name)
            .ok_or_else(|| SdkError::AbiEncode(format!("unknown function: {}", name)))
    }

    /// Encode a function call
    pub fn encode_call(&self, name: &str, args: &[Token]) -> Result<Bytes, SdkError> {
        let function = self.require_function(name)?;
        check_args(name, &function.inputs, args)?;
        Ok(Bytes::from(encode_function_call(function.selector(), args)))
    }

    /// Decode function output
    pub fn decode_output(&self, name: &str, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        let function = self.require_function(name)?;
        let types: Vec<ParamType> = function.outputs.iter().map(|p| p.kind.clone()).collect();
        decode(&types, data)
    }

    /// Creation payload: bytecode followed by encoded constructor arguments
    pub fn encode_deploy(&self, bytecode: &[u8], args: &[Token]) -> Result<Bytes, SdkError> {
        let inputs = self.abi.constructor.as_deref().unwrap_or(&[]);
        check_args("constructor", inputs, args)?;

        let mut data = bytecode.to_vec();
        data.extend(encode(args));
        Ok(Bytes::from(data))
    }

    /// Signature topic of a non-anonymous event
    pub fn event_topic(&self, name: &str) -> Result<H256, SdkError> {
        match self.event(name) {
            Some(event) if !event.anonymous => Ok(event.topic()),
            Some(_) => Err(SdkError::AbiEncode(format!("event {} is anonymous", name))),
            None => Err(SdkError::AbiEncode(format!("unknown event: {}", name))),
        }
    }
}
