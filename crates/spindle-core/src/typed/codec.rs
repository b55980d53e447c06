//! ArgsCodec - Task と JobArgs の相互変換
//!
//! A task value is stored as the job's keyword arguments, so it has to
//! serialize to a JSON object.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::JobArgs;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json encode: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task arguments must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),
}

pub struct ArgsCodec;

impl ArgsCodec {
    pub fn encode<T: Serialize>(task: &T) -> Result<JobArgs, CodecError> {
        match serde_json::to_value(task)? {
            serde_json::Value::Object(map) => Ok(map),
            serde_json::Value::Null => Err(CodecError::NotAnObject("null")),
            serde_json::Value::Bool(_) => Err(CodecError::NotAnObject("a boolean")),
            serde_json::Value::Number(_) => Err(CodecError::NotAnObject("a number")),
            serde_json::Value::String(_) => Err(CodecError::NotAnObject("a string")),
            serde_json::Value::Array(_) => Err(CodecError::NotAnObject("an array")),
        }
    }

    pub fn decode<T: DeserializeOwned>(args: JobArgs) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(args))
    }
}
